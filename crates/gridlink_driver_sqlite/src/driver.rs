use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use gridlink_core::{
    ColumnInfo, ColumnMeta, Connection, DbError, ForeignKeyInfo, QueryRequest, QueryResult, Row,
    SqlDialect, Value, format_real,
};
use rusqlite::Connection as RusqliteConnection;

/// SQLite SQL dialect implementation.
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn quote_identifier(&self, name: &str) -> String {
        sqlite_quote_ident(name)
    }

    fn value_to_literal(&self, value: &Value) -> String {
        value_to_sqlite_literal(value)
    }

    fn escape_string(&self, s: &str) -> String {
        sqlite_escape_string(s)
    }
}

static SQLITE_DIALECT: SqliteDialect = SqliteDialect;

pub struct SqliteConnection {
    conn: Mutex<RusqliteConnection>,
    path: Option<PathBuf>,
}

impl SqliteConnection {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref().to_path_buf();
        let conn = RusqliteConnection::open(&path)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        log::info!("Opened SQLite database {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path),
        })
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = RusqliteConnection::open_in_memory()
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Runs one or more statements that produce no rows.
    pub fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        self.lock()?
            .execute_batch(sql)
            .map_err(|e| format_sqlite_query_error(&e))
    }

    fn lock(&self) -> Result<MutexGuard<'_, RusqliteConnection>, DbError> {
        self.conn
            .lock()
            .map_err(|e| DbError::QueryFailed(format!("Lock error: {}", e)))
    }
}

impl Connection for SqliteConnection {
    fn ping(&self) -> Result<(), DbError> {
        self.execute_batch("SELECT 1")
    }

    fn execute(&self, req: &QueryRequest) -> Result<QueryResult, DbError> {
        let start = Instant::now();
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(&req.sql)
            .map_err(|e| format_sqlite_query_error(&e))?;

        let column_count = stmt.column_count();
        let columns: Vec<ColumnMeta> = stmt
            .column_names()
            .iter()
            .map(|name| ColumnMeta::new(*name, ""))
            .collect();

        let mut rows: Vec<Row> = Vec::new();
        let mut result_rows = stmt
            .query([])
            .map_err(|e| format_sqlite_query_error(&e))?;

        loop {
            match result_rows.next() {
                Ok(Some(row)) => {
                    let values: Row = (0..column_count)
                        .map(|i| sqlite_value_to_value(row, i))
                        .collect();
                    rows.push(values);

                    if let Some(limit) = req.limit
                        && rows.len() >= limit as usize
                    {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => return Err(format_sqlite_query_error(&e)),
            }
        }

        Ok(QueryResult::table(columns, rows, start.elapsed()))
    }

    fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
        let conn = self.lock()?;
        get_columns(&conn, table)
    }

    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>, DbError> {
        let conn = self.lock()?;
        get_foreign_keys(&conn, table)
    }

    fn dialect(&self) -> &dyn SqlDialect {
        &SQLITE_DIALECT
    }
}

fn get_columns(conn: &RusqliteConnection, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
    let mut stmt = conn
        .prepare(&format!(
            "PRAGMA table_info('{}')",
            sqlite_escape_string(table)
        ))
        .map_err(|e| format_sqlite_query_error(&e))?;

    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                type_name: row.get::<_, String>(2).unwrap_or_default(),
                nullable: row.get::<_, i32>(3).unwrap_or(0) == 0,
                is_primary_key: row.get::<_, i32>(5).unwrap_or(0) != 0,
                default_value: row.get::<_, Option<String>>(4).unwrap_or(None),
            })
        })
        .map_err(|e| format_sqlite_query_error(&e))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(columns)
}

/// Primary key columns of `table` in key order.
fn get_primary_key(conn: &RusqliteConnection, table: &str) -> Result<Vec<String>, DbError> {
    let mut stmt = conn
        .prepare(&format!(
            "PRAGMA table_info('{}')",
            sqlite_escape_string(table)
        ))
        .map_err(|e| format_sqlite_query_error(&e))?;

    let mut keyed: Vec<(i32, String)> = stmt
        .query_map([], |row| Ok((row.get::<_, i32>(5)?, row.get::<_, String>(1)?)))
        .map_err(|e| format_sqlite_query_error(&e))?
        .filter_map(|r| r.ok())
        .filter(|(position, _)| *position > 0)
        .collect();

    keyed.sort_by_key(|(position, _)| *position);
    Ok(keyed.into_iter().map(|(_, name)| name).collect())
}

fn get_foreign_keys(
    conn: &RusqliteConnection,
    table: &str,
) -> Result<Vec<ForeignKeyInfo>, DbError> {
    let mut stmt = conn
        .prepare(&format!(
            "PRAGMA foreign_key_list('{}')",
            sqlite_escape_string(table)
        ))
        .map_err(|e| format_sqlite_query_error(&e))?;

    // PRAGMA foreign_key_list returns: id, seq, table, from, to, on_update, on_delete, match
    let fk_rows: Vec<(i64, i64, String, String, Option<String>)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,                      // id
                row.get(1)?,                      // seq
                row.get::<_, String>(2)?,         // table (referenced)
                row.get::<_, String>(3)?,         // from (local column)
                row.get::<_, Option<String>>(4)?, // to (NULL when referencing the primary key)
            ))
        })
        .map_err(|e| format_sqlite_query_error(&e))?
        .filter_map(|r| r.ok())
        .collect();

    let mut keys = Vec::with_capacity(fk_rows.len());
    for (id, seq, referenced_table, column, to) in fk_rows {
        let referenced_column = match to {
            Some(to) => to,
            None => match get_primary_key(conn, &referenced_table)?
                .get(usize::try_from(seq).unwrap_or(0))
            {
                Some(pk) => pk.clone(),
                None => {
                    log::warn!(
                        "Foreign key {}.{} references {} without a resolvable key column",
                        table,
                        column,
                        referenced_table
                    );
                    continue;
                }
            },
        };

        keys.push(ForeignKeyInfo {
            id,
            column,
            referenced_table,
            referenced_column,
        });
    }

    keys.sort_by_key(|key| key.id);
    Ok(keys)
}

fn sqlite_value_to_value(row: &rusqlite::Row, idx: usize) -> Value {
    use rusqlite::types::ValueRef;

    match row.get_ref(idx) {
        Ok(ValueRef::Null) => Value::Null,
        Ok(ValueRef::Integer(i)) => Value::Int(i),
        Ok(ValueRef::Real(f)) => Value::Float(f),
        Ok(ValueRef::Text(t)) => Value::Text(String::from_utf8_lossy(t).to_string()),
        Ok(ValueRef::Blob(b)) => Value::Bytes(b.to_vec()),
        Err(_) => Value::Null,
    }
}

fn format_sqlite_query_error(e: &rusqlite::Error) -> DbError {
    let message = match e {
        rusqlite::Error::SqliteFailure(err, msg) => {
            msg.clone().unwrap_or_else(|| format!("{:?}", err.code))
        }
        _ => e.to_string(),
    };
    log::error!("SQLite query failed: {}", message);
    DbError::QueryFailed(message)
}

fn sqlite_quote_ident(ident: &str) -> String {
    debug_assert!(!ident.is_empty(), "identifier cannot be empty");
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Convert a Value to a safe SQLite literal string.
fn value_to_sqlite_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => {
            if f.is_nan() || f.is_infinite() {
                // SQLite doesn't have NaN/Infinity, store as NULL
                "NULL".to_string()
            } else {
                format_real(*f)
            }
        }
        Value::Text(s) => format!("'{}'", sqlite_escape_string(s)),
        Value::Bytes(b) => format!("X'{}'", hex::encode(b)),
    }
}

/// Escape a string for use inside a SQLite single-quoted literal.
fn sqlite_escape_string(s: &str) -> String {
    s.replace('\'', "''")
}
