use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A row from a query result
///
/// Cells are kept in the text format the simple query protocol returns
/// them in; `None` is SQL NULL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    /// The values for this row, in field order
    pub cells: Vec<Option<String>>,
    // Column name -> index, shared by every row of one result
    #[serde(skip)]
    pub(crate) column_index_cache: Arc<HashMap<String, usize>>,
}

impl ResultRow {
    /// Create a row with its own column lookup table
    #[must_use]
    pub fn new(column_names: &[String], cells: Vec<Option<String>>) -> Self {
        Self {
            cells,
            column_index_cache: Arc::new(index_columns(column_names)),
        }
    }

    pub(crate) fn with_cache(
        cells: Vec<Option<String>>,
        column_index_cache: Arc<HashMap<String, usize>>,
    ) -> Self {
        Self {
            cells,
            column_index_cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index_cache.get(column_name).copied()
    }

    /// Get a cell by column name
    ///
    /// Returns `None` when the column doesn't exist, `Some(None)` when the
    /// value is NULL.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<Option<&str>> {
        self.get_column_index(column_name)
            .and_then(|idx| self.get_by_index(idx))
    }

    /// Get a cell by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<Option<&str>> {
        self.cells.get(index).map(Option::as_deref)
    }
}

impl PartialEq for ResultRow {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

pub(crate) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    let mut cache = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        // duplicate names (SELECT 1 AS a, 2 AS a) resolve to the first column
        cache.entry(name.clone()).or_insert(i);
    }
    cache
}
