use super::column::Column;
use super::row::{Row, Value};
use super::Table;

/// A read-only subset of the rows of a [`Table`], in table order
#[derive(Debug, Clone)]
pub struct TableView<'a> {
    table: &'a Table,
    indices: Vec<usize>,
}
impl<'a> TableView<'a> {
    pub(crate) fn new(table: &'a Table, indices: Vec<usize>) -> Self {
        Self { table, indices }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The table the view was taken from
    #[must_use]
    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Row> + '_ {
        let rows = self.table.rows();
        self.indices.iter().map(move |&i| &rows[i])
    }

    /// Read ids of the selected rows
    #[must_use]
    pub fn ids(&self) -> Vec<&'a str> {
        self.iter().map(|row| row.id.as_str()).collect()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.iter().any(|row| row.id == id)
    }
}

/// A selection of columns over every row of a table
///
/// Produced by [`Table::project`]; the id column is always carried.
#[derive(Debug, Clone)]
pub struct Projection<'a> {
    columns: Vec<Column>,
    rows: &'a [Row],
}
impl<'a> Projection<'a> {
    pub(crate) fn new(columns: Vec<Column>, rows: &'a [Row]) -> Self {
        Self { columns, rows }
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Header names, starting with `id`
    #[must_use]
    pub fn header(&self) -> Vec<&'static str> {
        std::iter::once("id")
            .chain(self.columns.iter().map(|c| c.name()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates `(id, values)` in table order
    pub fn rows(&self) -> impl Iterator<Item = (&'a str, Vec<Value<'a>>)> + '_ {
        self.rows.iter().map(|row| {
            let values = self.columns.iter().map(|&c| row.get(c)).collect();
            (row.id.as_str(), values)
        })
    }
}
