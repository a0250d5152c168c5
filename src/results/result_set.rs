use super::row::{ResultRow, index_columns};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Field descriptor for one result column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
}

/// The outcome of a successful query
///
/// Holds what the server sent back for the last statement of the submitted
/// text: the command keyword, the row count from `CommandComplete`, the
/// field list and the rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Command keyword, e.g. `SELECT` or `INSERT`
    pub command: String,
    /// Rows returned or affected, as reported by the server
    pub row_count: u64,
    pub fields: Vec<Field>,
    pub rows: Vec<ResultRow>,
    #[serde(skip)]
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl PartialEq for QueryResult {
    fn eq(&self, other: &Self) -> bool {
        self.command == other.command
            && self.row_count == other.row_count
            && self.fields == other.fields
            && self.rows == other.rows
    }
}

impl QueryResult {
    /// Create an empty result for `command`
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Set the fields for this result (shared by all rows added afterwards)
    pub fn set_fields(&mut self, names: Vec<String>) {
        self.column_index_cache = Arc::new(index_columns(&names));
        self.fields = names.into_iter().map(|name| Field { name }).collect();
    }

    /// Field names in order
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Add a row of cells
    pub fn add_row_values(&mut self, cells: Vec<Option<String>>) {
        self.rows
            .push(ResultRow::with_cache(cells, self.column_index_cache.clone()));
    }

    /// Record the server's row count for this statement
    pub fn set_row_count(&mut self, row_count: u64) {
        self.row_count = row_count;
    }

    /// Whether the statement produced a row description
    #[must_use]
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_the_column_lookup() {
        let mut result = QueryResult::new("SELECT");
        result.set_fields(vec!["id".to_string(), "name".to_string()]);
        result.add_row_values(vec![Some("1".to_string()), None]);
        result.add_row_values(vec![Some("2".to_string()), Some("bob".to_string())]);
        result.set_row_count(2);

        assert_eq!(result.field_names(), vec!["id", "name"]);
        assert_eq!(result.rows[0].get("id"), Some(Some("1")));
        assert_eq!(result.rows[0].get("name"), Some(None));
        assert_eq!(result.rows[1].get("name"), Some(Some("bob")));
        assert_eq!(result.rows[1].get("missing"), None);
        assert!(Arc::ptr_eq(
            &result.rows[0].column_index_cache,
            &result.rows[1].column_index_cache
        ));
    }

    #[test]
    fn duplicate_column_names_resolve_to_first() {
        let row = ResultRow::new(
            &["a".to_string(), "a".to_string()],
            vec![Some("1".to_string()), Some("2".to_string())],
        );
        assert_eq!(row.get("a"), Some(Some("1")));
        assert_eq!(row.get_by_index(1), Some(Some("2")));
    }
}
