use gridlink_core::{
    ColumnInfo, Connection, DbError, DefaultSqlDialect, ForeignKeyInfo, QueryRequest, QueryResult,
    SqlDialect,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
pub enum FakeQueryOutcome {
    Success(QueryResult),
    Error(String),
}

impl FakeQueryOutcome {
    fn into_result(&self) -> Result<QueryResult, DbError> {
        match self {
            Self::Success(result) => Ok(result.clone()),
            Self::Error(message) => Err(DbError::query_failed(message.clone())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeConnectionStats {
    pub executed_requests: Vec<QueryRequest>,
    pub ping_calls: usize,
}

impl FakeConnectionStats {
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed_requests
            .iter()
            .map(|req| req.sql.clone())
            .collect()
    }
}

#[derive(Default)]
struct FakeConnectionState {
    tables: RwLock<HashMap<String, Vec<ColumnInfo>>>,
    foreign_keys: RwLock<HashMap<String, Vec<ForeignKeyInfo>>>,
    query_outcomes: RwLock<HashMap<String, FakeQueryOutcome>>,
    default_outcome: RwLock<Option<FakeQueryOutcome>>,
    executed_requests: Mutex<Vec<QueryRequest>>,
    ping_calls: AtomicUsize,
    ping_error: RwLock<Option<String>>,
    held_queries: Mutex<HashSet<String>>,
    released: Condvar,
}

/// Deterministic in-memory connection.
///
/// Query outcomes are scripted per exact SQL text; anything unscripted falls
/// back to the default outcome, then to an empty result. Clones share state,
/// so a test can keep one handle while the code under test owns another.
#[derive(Clone, Default)]
pub struct FakeConnection {
    state: Arc<FakeConnectionState>,
}

impl FakeConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        rwlock_write(&self.state.tables).insert(table.into(), columns);
        self
    }

    pub fn with_foreign_keys(self, table: impl Into<String>, keys: Vec<ForeignKeyInfo>) -> Self {
        rwlock_write(&self.state.foreign_keys).insert(table.into(), keys);
        self
    }

    pub fn with_query_result(self, sql: impl Into<String>, result: QueryResult) -> Self {
        rwlock_write(&self.state.query_outcomes)
            .insert(sql.into(), FakeQueryOutcome::Success(result));
        self
    }

    pub fn with_query_error(self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        rwlock_write(&self.state.query_outcomes)
            .insert(sql.into(), FakeQueryOutcome::Error(message.into()));
        self
    }

    pub fn with_default_result(self, result: QueryResult) -> Self {
        *rwlock_write(&self.state.default_outcome) = Some(FakeQueryOutcome::Success(result));
        self
    }

    pub fn with_default_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.default_outcome) = Some(FakeQueryOutcome::Error(message.into()));
        self
    }

    pub fn with_ping_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.ping_error) = Some(message.into());
        self
    }

    pub fn set_query_outcome(&self, sql: impl Into<String>, outcome: FakeQueryOutcome) {
        rwlock_write(&self.state.query_outcomes).insert(sql.into(), outcome);
    }

    pub fn set_table(&self, table: impl Into<String>, columns: Vec<ColumnInfo>) {
        rwlock_write(&self.state.tables).insert(table.into(), columns);
    }

    /// Makes `execute` block on `sql` until `release_query` is called.
    pub fn hold_query(&self, sql: impl Into<String>) {
        mutex_lock(&self.state.held_queries).insert(sql.into());
    }

    pub fn release_query(&self, sql: &str) {
        mutex_lock(&self.state.held_queries).remove(sql);
        self.state.released.notify_all();
    }

    pub fn stats(&self) -> FakeConnectionStats {
        FakeConnectionStats {
            executed_requests: mutex_lock(&self.state.executed_requests).clone(),
            ping_calls: self.state.ping_calls.load(Ordering::Relaxed),
        }
    }

    pub fn as_connection_arc(self) -> Arc<dyn Connection> {
        Arc::new(self)
    }
}

impl Connection for FakeConnection {
    fn ping(&self) -> Result<(), DbError> {
        self.state.ping_calls.fetch_add(1, Ordering::Relaxed);

        if let Some(message) = rwlock_read(&self.state.ping_error).clone() {
            return Err(DbError::connection_failed(message));
        }

        Ok(())
    }

    fn execute(&self, req: &QueryRequest) -> Result<QueryResult, DbError> {
        mutex_lock(&self.state.executed_requests).push(req.clone());

        let mut held = mutex_lock(&self.state.held_queries);
        while held.contains(&req.sql) {
            held = match self.state.released.wait(held) {
                Ok(guard) => guard,
                Err(poison_error) => poison_error.into_inner(),
            };
        }
        drop(held);

        let outcome = rwlock_read(&self.state.query_outcomes)
            .get(&req.sql)
            .cloned()
            .or_else(|| rwlock_read(&self.state.default_outcome).clone());

        let mut result = match outcome {
            Some(outcome) => outcome.into_result()?,
            None => QueryResult::empty(),
        };

        if let Some(limit) = req.limit {
            result.rows.truncate(limit as usize);
        }

        Ok(result)
    }

    fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
        Ok(rwlock_read(&self.state.tables)
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(table))
            .map(|(_, columns)| columns.clone())
            .unwrap_or_default())
    }

    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>, DbError> {
        Ok(rwlock_read(&self.state.foreign_keys)
            .get(table)
            .cloned()
            .unwrap_or_default())
    }

    fn dialect(&self) -> &dyn SqlDialect {
        &DEFAULT_SQL_DIALECT
    }
}

fn rwlock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn rwlock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

static DEFAULT_SQL_DIALECT: DefaultSqlDialect = DefaultSqlDialect;

#[cfg(test)]
mod tests {
    use super::{FakeConnection, FakeQueryOutcome};
    use crate::fixtures;
    use gridlink_core::{Connection, DbError, QueryRequest, SchemaResolver, Value};

    #[test]
    fn execute_uses_configured_outcome_and_records_stats() {
        let connection = FakeConnection::new()
            .with_query_error("SELECT boom", "boom")
            .with_query_result("SELECT 1", fixtures::scalar_result(Value::Int(1)));

        let ok = connection
            .execute(&QueryRequest::new("SELECT 1"))
            .expect("scripted success");
        assert_eq!(ok.single_scalar(), Value::Int(1));

        let err = connection.execute(&QueryRequest::new("SELECT boom"));
        assert!(matches!(err, Err(DbError::QueryFailed(message)) if message == "boom"));

        assert_eq!(
            connection.stats().executed_sql(),
            vec!["SELECT 1".to_string(), "SELECT boom".to_string()]
        );
    }

    #[test]
    fn set_query_outcome_overrides_previous_script() {
        let connection = FakeConnection::new().with_query_result(
            "SELECT 1",
            fixtures::scalar_result(Value::Int(1)),
        );

        connection.set_query_outcome(
            "SELECT 1",
            FakeQueryOutcome::Error("database is locked".to_string()),
        );

        let err = connection
            .execute(&QueryRequest::new("SELECT 1"))
            .expect_err("overridden outcome");
        assert_eq!(err.detail(), "database is locked");
    }

    #[test]
    fn limit_truncates_scripted_rows() {
        let connection = FakeConnection::new().with_default_result(fixtures::table_result(
            &["id"],
            vec![vec![Value::Int(1)], vec![Value::Int(2)], vec![Value::Int(3)]],
        ));

        let result = connection
            .execute(&QueryRequest::new("SELECT id FROM t").with_limit(2))
            .expect("default result");
        assert_eq!(result.row_count(), 2);
    }

    #[test]
    fn held_queries_wait_for_release() {
        let connection = FakeConnection::new()
            .with_query_result("SELECT 1", fixtures::scalar_result(Value::Int(1)));
        connection.hold_query("SELECT 1");

        let worker = {
            let connection = connection.clone();
            std::thread::spawn(move || connection.execute(&QueryRequest::new("SELECT 1")))
        };

        while connection.stats().executed_requests.is_empty() {
            std::thread::yield_now();
        }
        assert!(!worker.is_finished());

        connection.release_query("SELECT 1");
        let result = worker.join().expect("worker").expect("query");
        assert_eq!(result.single_scalar(), Value::Int(1));
    }

    #[test]
    fn unknown_tables_resolve_to_no_columns() {
        let connection = FakeConnection::new().with_table(
            "departments",
            fixtures::columns(&[("id", "INTEGER"), ("name", "TEXT")]),
        );

        assert_eq!(connection.column_names("DEPARTMENTS"), vec!["id", "name"]);
        assert!(connection.column_names("missing").is_empty());
    }
}
