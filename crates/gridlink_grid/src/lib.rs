mod delegate;
mod editor;
mod error;
mod geometry;
mod loader;
mod lookup_sql;
mod model;
mod render;
mod row_guard;
mod session;

pub use delegate::{CellEditDelegate, CommitOutcome, SkipReason, parse_numeric};
pub use editor::{EditorKind, LOOKUP_VALUE_COLUMN, LookupDropdown, TextEditor};
pub use error::EditError;
pub use geometry::{
    DEFAULT_MAX_VISIBLE_ROWS, DEFAULT_SCREEN_WIDTH, DEFAULT_SCROLLBAR_WIDTH, HeaderSection,
    PopupView, TextMetrics, fit,
};
pub use lookup_sql::{CURRENT_VALUE_ALIAS, LookupQueryBuilder, unique_name};
pub use model::{
    Cell, CellFlags, CellPos, ColumnDataType, ColumnDescriptor, DEFAULT_COLUMN_WIDTH,
    Editability, ForeignKeyConstraint, ResultGrid,
};
pub use render::{BorderColor, CellDecoration, display_text, paint};
pub use row_guard::{RowCount, RowCountGuard};
pub use session::{
    EditorId, LookupQuery, QuerySession, SessionEvent, SessionHub, SessionListener,
    SessionMessage, SessionState, SessionTicket, dispatch,
};
