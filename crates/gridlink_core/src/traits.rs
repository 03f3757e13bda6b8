use crate::{ColumnInfo, DbError, ForeignKeyInfo, QueryRequest, QueryResult, SqlDialect};

/// Active database connection.
///
/// The grid and its editors interact exclusively through this trait, never
/// accessing driver internals. Implementations must be thread-safe
/// (`Send + Sync`) because lookup queries run on worker threads.
pub trait Connection: Send + Sync {
    /// Check if the connection is still alive.
    ///
    /// Typically sends a lightweight query like `SELECT 1`.
    fn ping(&self) -> Result<(), DbError>;

    /// Execute a SQL query synchronously.
    fn execute(&self, req: &QueryRequest) -> Result<QueryResult, DbError>;

    /// Column definitions of `table` in declaration order.
    ///
    /// Unknown tables yield an empty list rather than an error.
    fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DbError>;

    /// Foreign keys declared on `table`.
    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>, DbError>;

    /// SQL dialect used to quote identifiers and render literals.
    fn dialect(&self) -> &dyn SqlDialect;
}

/// Lists the columns of a table by name.
///
/// Lookup SQL generation only needs names and must keep going when a table
/// cannot be introspected, so failures collapse to an empty list.
pub trait SchemaResolver {
    fn column_names(&self, table: &str) -> Vec<String>;
}

impl<C: Connection + ?Sized> SchemaResolver for C {
    fn column_names(&self, table: &str) -> Vec<String> {
        match self.table_columns(table) {
            Ok(columns) => columns.into_iter().map(|c| c.name).collect(),
            Err(e) => {
                log::debug!("Could not list columns of {}: {}", table, e);
                Vec::new()
            }
        }
    }
}
