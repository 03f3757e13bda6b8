mod driver;

pub use driver::{SqliteConnection, SqliteDialect};
