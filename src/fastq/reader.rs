use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;

use super::chunk::{ChunkRange, Chunks};
use super::{parse_chunk, ParsedChunk, Strand};
use crate::error::{ParseError, Result};

/// A memory-mapped FASTQ file
///
/// The mapping is wrapped in an `Arc` so that cloning a `FastqFile` is cheap and
/// every chunk worker can read its own byte range of the same mapping without copying.
///
/// # Examples
///
/// ```rust,no_run
/// use pairflag::fastq::{FastqFile, Strand};
/// use pairflag::Result;
///
/// fn main() -> Result<()> {
///     let file = FastqFile::new("./data/reads_R1.fastq")?;
///     for range in file.chunks(4096) {
///         let parsed = file.parse_range(range, Strand::Forward)?;
///         println!("{} headers in {}..{}", parsed.num_ids(), range.start, range.end());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FastqFile {
    /// Path the file was opened from
    path: PathBuf,

    /// Memory mapped file contents (`None` for an empty file, which cannot be mapped)
    mmap: Option<Arc<Mmap>>,
}
impl FastqFile {
    /// Opens and memory maps a FASTQ file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be opened
    /// * The path is not a regular file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Verify input file is a file before attempting to map
        let file = File::open(path)?;
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(ParseError::IncompatibleFile(path.display().to_string()).into());
        }

        let mmap = if metadata.len() == 0 {
            None
        } else {
            // Safety: the file is open and won't be modified while mapped
            Some(Arc::new(unsafe { Mmap::map(&file)? }))
        };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The full contents of the file
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self.mmap.as_deref() {
            Some(mmap) => &mmap[..],
            None => &[],
        }
    }

    /// Size of the file in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Line-aligned chunk ranges of about `size` bytes, see [`Chunks`]
    #[must_use]
    pub fn chunks(&self, size: usize) -> Chunks<'_> {
        Chunks::new(self.bytes(), size)
    }

    /// Parses exactly the bytes of `range`
    ///
    /// # Errors
    ///
    /// Returns an error if the range reaches past the end of the file, if the bytes
    /// are not valid UTF-8, or if a reverse strand sequence cannot be complemented.
    pub fn parse_range(&self, range: ChunkRange, strand: Strand) -> Result<ParsedChunk> {
        let bytes = self.bytes();
        if range.end() > bytes.len() {
            return Err(ParseError::OutOfRange {
                start: range.start,
                end: range.end(),
                len: bytes.len(),
            }
            .into());
        }
        parse_chunk(&bytes[range.as_range()], strand)
    }
}

#[cfg(test)]
mod testing {
    use std::io::Write;

    use anyhow::Result;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_empty_file() -> Result<()> {
        let handle = NamedTempFile::new()?;
        let file = FastqFile::new(handle.path())?;
        assert!(file.is_empty());
        assert_eq!(file.chunks(16).count(), 0);
        Ok(())
    }

    #[test]
    fn test_directory_is_incompatible() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let err = FastqFile::new(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::ParseError(ParseError::IncompatibleFile(_)) | crate::Error::IoError(_)
        ));
        Ok(())
    }

    #[test]
    fn test_parse_ranges() -> Result<()> {
        let mut handle = NamedTempFile::new()?;
        write!(
            handle,
            "@HWI-ST1:8:1101:1:1#0/1\nACGT\n+\nIIII\n@HWI-ST1:8:1101:1:2#0/1\nGGCA\n+\nHHHH\n"
        )?;
        handle.flush()?;

        let file = FastqFile::new(handle.path())?;
        let mut parsed = ParsedChunk::default();
        for range in file.chunks(10) {
            parsed.extend(file.parse_range(range, Strand::Forward)?);
        }
        assert_eq!(parsed.ids, vec!["HWI-ST1:8:1101:1:1#0", "HWI-ST1:8:1101:1:2#0"]);
        assert_eq!(parsed.sequences, vec!["ACGT", "GGCA"]);
        assert_eq!(parsed.qualities, vec!["IIII", "HHHH"]);
        Ok(())
    }

    #[test]
    fn test_range_out_of_bounds() -> Result<()> {
        let mut handle = NamedTempFile::new()?;
        write!(handle, "ACGT\n")?;
        handle.flush()?;
        let file = FastqFile::new(handle.path())?;
        assert!(file.parse_range(ChunkRange::new(2, 10), Strand::Forward).is_err());
        Ok(())
    }
}
