use crate::Value;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters for executing a SQL query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// The SQL statement to execute.
    pub sql: String,

    /// Maximum number of rows to fetch. Drivers stop reading once reached.
    pub limit: Option<u32>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A single row of query results.
pub type Row = Vec<Value>;

/// Metadata for a result column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name as returned by the database.
    pub name: String,

    /// Database-specific type name (e.g., "varchar", "INTEGER", "TEXT").
    pub type_name: String,

    /// Whether the column allows NULL values.
    pub nullable: bool,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
        }
    }
}

/// Result of executing a SQL query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Metadata for each column in the result set.
    pub columns: Vec<ColumnMeta>,

    /// Row data, where each row contains values matching `columns` order.
    pub rows: Vec<Row>,

    /// Wall-clock time taken to execute the query.
    pub execution_time: Duration,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            execution_time: Duration::ZERO,
        }
    }

    pub fn table(columns: Vec<ColumnMeta>, rows: Vec<Row>, execution_time: Duration) -> Self {
        Self {
            columns,
            rows,
            execution_time,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// First cell of the first row, or NULL when the result is empty.
    pub fn single_scalar(&self) -> Value {
        self.rows
            .first()
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or(Value::Null)
    }
}
