mod config;
mod error;
mod notify;
mod query;
mod schema;
mod sql_dialect;
mod traits;
mod value;

pub use config::{
    DEFAULT_FK_CELL_LENGTH_LIMIT, DEFAULT_HUGE_CONTENTS_WARNING_LIMIT, DEFAULT_MAX_ROWS_FOR_FK,
    EditorConfig, EditorConfigStore,
};
pub use error::DbError;
pub use notify::{LogNotifier, NotificationKind, Notifier};
pub use query::{ColumnMeta, QueryRequest, QueryResult, Row};
pub use schema::{ColumnInfo, ForeignKeyInfo};
pub use sql_dialect::{DefaultSqlDialect, SqlDialect, is_bare_identifier};
pub use traits::{Connection, SchemaResolver};
pub use value::{Value, format_real};
