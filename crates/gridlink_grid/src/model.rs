use std::ops::Range;

use bitflags::bitflags;
use gridlink_core::{ColumnMeta, QueryResult, Row, Value};

pub const DEFAULT_COLUMN_WIDTH: u32 = 100;

/// Row/column coordinates of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for CellPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.row, self.col)
    }
}

bitflags! {
    /// Edit state carried by a materialized cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u8 {
        /// Value differs from what was loaded and has not been written back.
        const UNCOMMITTED = 1 << 0;

        /// The last attempt to write this cell back failed.
        const COMMITTING_ERROR = 1 << 1;

        /// The whole row is scheduled for deletion.
        const DELETED_ROW = 1 << 2;
    }
}

/// A materialized grid cell: current value, loaded value and edit flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    value: Value,
    original: Value,
    flags: CellFlags,
}

impl Cell {
    pub fn new(value: Value) -> Self {
        Self {
            original: value.clone(),
            value,
            flags: CellFlags::empty(),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn original_value(&self) -> &Value {
        &self.original
    }

    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    pub fn is_uncommitted(&self) -> bool {
        self.flags.contains(CellFlags::UNCOMMITTED)
    }

    pub fn is_committing_error(&self) -> bool {
        self.flags.contains(CellFlags::COMMITTING_ERROR)
    }

    pub fn is_deleted_row(&self) -> bool {
        self.flags.contains(CellFlags::DELETED_ROW)
    }

    /// Replaces the value. Writing back the loaded value clears the
    /// uncommitted mark.
    pub fn set_value(&mut self, value: Value) {
        self.flags
            .set(CellFlags::UNCOMMITTED, value != self.original);
        self.flags.remove(CellFlags::COMMITTING_ERROR);
        self.value = value;
    }

    pub fn set_deleted_row(&mut self, deleted: bool) {
        self.flags.set(CellFlags::DELETED_ROW, deleted);
    }

    /// Records a successful write-back.
    pub fn mark_committed(&mut self) {
        self.original = self.value.clone();
        self.flags
            .remove(CellFlags::UNCOMMITTED | CellFlags::COMMITTING_ERROR);
    }

    /// Records a failed write-back. The value stays uncommitted.
    pub fn mark_commit_failed(&mut self) {
        self.flags.insert(CellFlags::COMMITTING_ERROR);
    }
}

/// Coarse data type used to decide how editor text is converted back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDataType {
    Numeric,
    Text,
    Other,
}

impl ColumnDataType {
    pub fn from_type_name(type_name: &str) -> Self {
        let lower = type_name.to_lowercase();

        if lower.contains("int")
            || lower.contains("real")
            || lower.contains("float")
            || lower.contains("double")
            || lower.contains("numeric")
            || lower.contains("decimal")
        {
            ColumnDataType::Numeric
        } else if lower.contains("text")
            || lower.contains("char")
            || lower.contains("clob")
            || lower.contains("string")
        {
            ColumnDataType::Text
        } else {
            ColumnDataType::Other
        }
    }

    pub fn is_numeric(self) -> bool {
        self == ColumnDataType::Numeric
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Editability {
    Editable,
    Forbidden(String),
}

/// `local_column` of the grid's table references `foreign_table.foreign_column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyConstraint {
    pub local_column: String,
    pub foreign_table: String,
    pub foreign_column: String,
}

impl ForeignKeyConstraint {
    pub fn new(
        local_column: impl Into<String>,
        foreign_table: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Self {
        Self {
            local_column: local_column.into(),
            foreign_table: foreign_table.into(),
            foreign_column: foreign_column.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub table: Option<String>,
    pub type_name: String,
    pub data_type: ColumnDataType,
    pub editability: Editability,
    pub fk_constraints: Vec<ForeignKeyConstraint>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            name: name.into(),
            table: None,
            data_type: ColumnDataType::from_type_name(&type_name),
            type_name,
            editability: Editability::Editable,
            fk_constraints: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn read_only(mut self, reason: impl Into<String>) -> Self {
        self.editability = Editability::Forbidden(reason.into());
        self
    }

    pub fn with_foreign_key(mut self, constraint: ForeignKeyConstraint) -> Self {
        self.fk_constraints.push(constraint);
        self
    }

    pub fn can_edit(&self) -> bool {
        matches!(self.editability, Editability::Editable)
    }

    pub fn edition_forbidden_reason(&self) -> Option<&str> {
        match &self.editability {
            Editability::Editable => None,
            Editability::Forbidden(reason) => Some(reason),
        }
    }

    pub fn is_foreign_key(&self) -> bool {
        !self.fk_constraints.is_empty()
    }
}

impl From<&ColumnMeta> for ColumnDescriptor {
    fn from(meta: &ColumnMeta) -> Self {
        ColumnDescriptor::new(meta.name.as_str(), meta.type_name.as_str())
    }
}

/// Tabular data behind a grid view.
///
/// Raw rows live in `storage`. Cells are materialized per row on demand and
/// from then on carry the edit state; a row that was never materialized has
/// no cell items and `item_at` returns `None` for it.
#[derive(Debug, Clone, Default)]
pub struct ResultGrid {
    columns: Vec<ColumnDescriptor>,
    storage: Vec<Row>,
    items: Vec<Option<Vec<Cell>>>,
    column_widths: Vec<u32>,
    source_table: Option<String>,
    structure_out_of_date: bool,
    execution_in_progress: bool,
    all_data_loaded: bool,
    last_edited: Option<CellPos>,
}

impl ResultGrid {
    /// Grid over `rows` with no cell materialized yet.
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Row>) -> Self {
        let column_widths = vec![DEFAULT_COLUMN_WIDTH; columns.len()];
        let items = vec![None; rows.len()];

        Self {
            columns,
            storage: rows,
            items,
            column_widths,
            source_table: None,
            structure_out_of_date: false,
            execution_in_progress: false,
            all_data_loaded: true,
            last_edited: None,
        }
    }

    /// Grid that is waiting for its first query to finish.
    pub fn pending() -> Self {
        Self {
            execution_in_progress: true,
            all_data_loaded: false,
            ..Self::default()
        }
    }

    /// Fully materialized grid holding a query result.
    pub fn from_query_result(result: &QueryResult) -> Self {
        let columns = result.columns.iter().map(ColumnDescriptor::from).collect();
        let mut grid = Self::new(columns, result.rows.clone());
        grid.materialize_all();
        grid
    }

    pub fn with_source_table(mut self, table: impl Into<String>) -> Self {
        self.source_table = Some(table.into());
        self
    }

    pub fn source_table(&self) -> Option<&str> {
        self.source_table.as_deref()
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, col: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(col)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn row_count(&self) -> usize {
        self.storage.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_width(&self, col: usize) -> u32 {
        self.column_widths
            .get(col)
            .copied()
            .unwrap_or(DEFAULT_COLUMN_WIDTH)
    }

    pub fn set_column_width(&mut self, col: usize, width: u32) {
        if let Some(slot) = self.column_widths.get_mut(col) {
            *slot = width;
        }
    }

    pub fn is_structure_out_of_date(&self) -> bool {
        self.structure_out_of_date
    }

    pub fn set_structure_out_of_date(&mut self, out_of_date: bool) {
        self.structure_out_of_date = out_of_date;
    }

    pub fn is_execution_in_progress(&self) -> bool {
        self.execution_in_progress
    }

    pub fn set_execution_in_progress(&mut self, in_progress: bool) {
        self.execution_in_progress = in_progress;
    }

    pub fn is_all_data_loaded(&self) -> bool {
        self.all_data_loaded
    }

    pub fn set_all_data_loaded(&mut self, loaded: bool) {
        self.all_data_loaded = loaded;
    }

    pub fn is_row_materialized(&self, row: usize) -> bool {
        matches!(self.items.get(row), Some(Some(_)))
    }

    /// Builds cell items for `row` from storage. Already materialized rows
    /// are left untouched.
    pub fn materialize_row(&mut self, row: usize) -> bool {
        let Some(raw) = self.storage.get(row) else {
            return false;
        };

        if let Some(slot) = self.items.get_mut(row)
            && slot.is_none()
        {
            let cells = (0..self.columns.len())
                .map(|col| Cell::new(raw.get(col).cloned().unwrap_or(Value::Null)))
                .collect();
            *slot = Some(cells);
        }

        true
    }

    pub fn materialize_all(&mut self) {
        for row in 0..self.storage.len() {
            self.materialize_row(row);
        }
    }

    pub fn item_at(&self, pos: CellPos) -> Option<&Cell> {
        self.items.get(pos.row)?.as_ref()?.get(pos.col)
    }

    pub fn item_at_mut(&mut self, pos: CellPos) -> Option<&mut Cell> {
        self.items.get_mut(pos.row)?.as_mut()?.get_mut(pos.col)
    }

    /// Current value of a cell, falling back to raw storage for rows that
    /// are not materialized.
    pub fn value_at(&self, pos: CellPos) -> Option<&Value> {
        if let Some(cell) = self.item_at(pos) {
            return Some(cell.value());
        }

        if pos.col >= self.columns.len() {
            return None;
        }

        self.storage.get(pos.row)?.get(pos.col)
    }

    /// Writes through the cell item. Returns `false` when there is no item
    /// at `pos`, in which case nothing changes.
    pub fn set_value(&mut self, pos: CellPos, value: Value) -> bool {
        match self.item_at_mut(pos) {
            Some(cell) => {
                cell.set_value(value);
                true
            }
            None => false,
        }
    }

    /// Writes straight into raw storage, bypassing cell items and their
    /// edit flags.
    pub fn write_raw(&mut self, pos: CellPos, value: Value) -> bool {
        if pos.col >= self.columns.len() {
            return false;
        }

        let Some(row) = self.storage.get_mut(pos.row) else {
            return false;
        };

        if row.len() <= pos.col {
            row.resize(pos.col + 1, Value::Null);
        }
        row[pos.col] = value;
        true
    }

    pub fn mark_row_deleted(&mut self, row: usize) -> bool {
        if !self.materialize_row(row) {
            return false;
        }

        if let Some(Some(cells)) = self.items.get_mut(row) {
            for cell in cells {
                cell.set_deleted_row(true);
            }
        }
        true
    }

    pub fn is_row_deleted(&self, row: usize) -> bool {
        matches!(self.items.get(row), Some(Some(cells)) if cells.iter().any(Cell::is_deleted_row))
    }

    /// Positions of every cell carrying an uncommitted value.
    pub fn uncommitted_cells(&self) -> Vec<CellPos> {
        let mut positions = Vec::new();
        for (row, cells) in self.items.iter().enumerate() {
            let Some(cells) = cells else { continue };
            for (col, cell) in cells.iter().enumerate() {
                if cell.is_uncommitted() {
                    positions.push(CellPos::new(row, col));
                }
            }
        }
        positions
    }

    /// Rows in `rows` whose `col` text matches `text`, at most `limit` of
    /// them (`0` means no limit).
    ///
    /// Exact matching is case-sensitive on the edit text; otherwise a
    /// case-insensitive substring match is used.
    pub fn find_rows(
        &self,
        rows: Range<usize>,
        col: usize,
        text: &str,
        limit: usize,
        exact: bool,
    ) -> Vec<usize> {
        let needle = text.to_lowercase();
        let end = rows.end.min(self.row_count());
        let mut found = Vec::new();

        for row in rows.start..end {
            let Some(value) = self.value_at(CellPos::new(row, col)) else {
                continue;
            };

            let candidate = value.edit_text();
            let matched = if exact {
                candidate == text
            } else {
                candidate.to_lowercase().contains(&needle)
            };

            if matched {
                found.push(row);
                if limit != 0 && found.len() >= limit {
                    break;
                }
            }
        }

        found
    }

    /// Called once an editor has finished writing into `pos`.
    pub fn notify_item_edition_ended(&mut self, pos: CellPos) {
        log::debug!("Edition ended at {}", pos);
        self.last_edited = Some(pos);
    }

    pub fn last_edited(&self) -> Option<CellPos> {
        self.last_edited
    }
}
