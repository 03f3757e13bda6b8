use thiserror::Error;

use crate::model::CellPos;

/// Reasons an edit is refused or degraded. The display text is what the user
/// is shown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("Cannot edit this cell. Details: The cell at {0} is not loaded.")]
    CellUnavailable(CellPos),

    #[error("Cannot edit this cell. Details: The row is marked for deletion.")]
    RowDeleted,

    #[error("Cannot edit this cell. Details: {0}")]
    ColumnNotEditable(String),

    #[error(
        "Cannot edit this cell. Details: Structure of this table has changed since last data \
         was loaded. Reload the data to proceed."
    )]
    StructureOutOfDate,

    #[error(
        "Foreign key for column {column} has more than {max_rows} possible values. It's too much \
         to display in drop down list. You need to edit value manually."
    )]
    LookupTooLarge { column: String, max_rows: u64 },

    #[error("Cannot edit this cell. Details: {0}")]
    LookupFailed(String),

    #[error(
        "Editing a huge contents in an inline cell editor is not a good idea. It can become slow \
         and inconvenient. It's better to edit such big contents in a Form View, or in popup \
         editor (available under right-click menu)."
    )]
    HugeContents,
}
