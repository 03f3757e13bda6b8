use gridlink_core::{Connection, QueryRequest};

/// Outcome of counting the rows a lookup statement would return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCount {
    /// Number of rows, `0` when counting failed.
    pub count: i64,
    pub errored: bool,
}

/// Keeps oversized lookups out of dropdowns.
#[derive(Debug, Clone, Copy)]
pub struct RowCountGuard {
    max_rows: u64,
}

impl RowCountGuard {
    pub fn new(max_rows: u64) -> Self {
        Self { max_rows }
    }

    pub fn max_rows(&self) -> u64 {
        self.max_rows
    }

    /// Runs `SELECT count(*)` over `lookup_sql` on the calling thread.
    pub fn count(&self, db: &dyn Connection, lookup_sql: &str) -> RowCount {
        let sql = format!("SELECT count(*) FROM ({})", lookup_sql);

        match db.execute(&QueryRequest::new(sql)) {
            Ok(result) => RowCount {
                count: result.single_scalar().as_i64().unwrap_or(0),
                errored: false,
            },
            Err(e) => {
                log::warn!("Could not count foreign key lookup rows: {}", e);
                RowCount {
                    count: 0,
                    errored: true,
                }
            }
        }
    }

    /// A lookup of exactly `max_rows` rows is still allowed.
    pub fn allows(&self, count: i64) -> bool {
        u64::try_from(count).map_or(true, |count| count <= self.max_rows)
    }
}
