use gridlink_core::{Value, format_real};

use crate::model::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderColor {
    Blue,
    Red,
}

/// Extra decoration drawn over a cell after its regular content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellDecoration {
    None,
    Border(BorderColor),
}

/// Uncommitted cells are outlined: red once a commit attempt failed, blue
/// while still pending.
pub fn paint(cell: &Cell) -> CellDecoration {
    if !cell.is_uncommitted() {
        return CellDecoration::None;
    }

    if cell.is_committing_error() {
        CellDecoration::Border(BorderColor::Red)
    } else {
        CellDecoration::Border(BorderColor::Blue)
    }
}

pub fn display_text(value: &Value) -> String {
    match value {
        Value::Float(f) => format_real(*f),
        other => other.as_display_string(),
    }
}
