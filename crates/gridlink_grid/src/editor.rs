use gridlink_core::QueryResult;

use crate::geometry::{PopupView, TextMetrics};
use crate::model::{CellPos, ResultGrid};
use crate::render::display_text;

/// Column of the lookup result holding the foreign key value. Column 0 is
/// the hidden "is current value" flag.
pub const LOOKUP_VALUE_COLUMN: usize = 1;

#[derive(Debug, Clone)]
pub enum EditorKind {
    PlainText(TextEditor),
    ForeignKeyLookup(LookupDropdown),
}

impl EditorKind {
    /// Text the editor would submit right now.
    pub fn text(&self) -> &str {
        match self {
            EditorKind::PlainText(editor) => editor.text(),
            EditorKind::ForeignKeyLookup(dropdown) => dropdown.current_text(),
        }
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self, EditorKind::ForeignKeyLookup(_))
    }

    pub fn as_lookup(&self) -> Option<&LookupDropdown> {
        match self {
            EditorKind::ForeignKeyLookup(dropdown) => Some(dropdown),
            EditorKind::PlainText(_) => None,
        }
    }

    pub fn as_lookup_mut(&mut self) -> Option<&mut LookupDropdown> {
        match self {
            EditorKind::ForeignKeyLookup(dropdown) => Some(dropdown),
            EditorKind::PlainText(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextEditor {
    text: String,
}

impl TextEditor {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

/// Editable combo box backed by a lookup result.
///
/// The edit text is always free-form. `current_index` points at a loaded
/// row when one is selected; `None`, or an index past the loaded rows, means
/// the text is a custom value.
#[derive(Debug, Clone)]
pub struct LookupDropdown {
    model: ResultGrid,
    current_index: Option<usize>,
    edit_text: String,
    text_selected: bool,
    popup: PopupView,
    anchor_width: u32,
}

impl LookupDropdown {
    pub(crate) fn new(
        seed_text: String,
        select_text: bool,
        anchor_width: u32,
        screen_width: u32,
    ) -> Self {
        let mut popup = PopupView::new(screen_width);
        popup.set_container_width(anchor_width);

        Self {
            model: ResultGrid::pending(),
            current_index: None,
            edit_text: seed_text,
            text_selected: select_text,
            popup,
            anchor_width,
        }
    }

    pub fn model(&self) -> &ResultGrid {
        &self.model
    }

    pub fn model_column(&self) -> usize {
        LOOKUP_VALUE_COLUMN
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_text(&self) -> &str {
        &self.edit_text
    }

    pub fn is_text_selected(&self) -> bool {
        self.text_selected
    }

    pub fn is_loading(&self) -> bool {
        self.model.is_execution_in_progress()
    }

    /// Loaded successfully and not waiting for anything.
    pub fn is_ready(&self) -> bool {
        !self.model.is_execution_in_progress() && self.model.is_all_data_loaded()
    }

    pub fn popup(&self) -> &PopupView {
        &self.popup
    }

    pub fn popup_mut(&mut self) -> &mut PopupView {
        &mut self.popup
    }

    pub fn anchor_width(&self) -> u32 {
        self.anchor_width
    }

    /// Replaces the edit text as typing would. Any selection is dropped.
    pub fn set_edit_text(&mut self, text: impl Into<String>) {
        self.edit_text = text.into();
        self.current_index = None;
        self.text_selected = false;
    }

    /// Selects a loaded row and shows its value. Out of range indexes are
    /// kept as-is and leave the text untouched.
    pub fn set_current_index(&mut self, index: Option<usize>) {
        self.current_index = index;

        if let Some(row) = index
            && let Some(value) = self.model.value_at(CellPos::new(row, LOOKUP_VALUE_COLUMN))
        {
            self.edit_text = value.edit_text();
        }
    }

    /// Text of the value column for every loaded row.
    pub fn options(&self) -> Vec<String> {
        (0..self.model.row_count())
            .map(|row| {
                self.model
                    .value_at(CellPos::new(row, LOOKUP_VALUE_COLUMN))
                    .map(display_text)
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Texts of the visible popup columns for `row`.
    pub fn row_texts(&self, row: usize) -> Vec<String> {
        (0..self.model.column_count())
            .filter(|&col| !self.popup.is_section_hidden(col))
            .filter_map(|col| self.model.value_at(CellPos::new(row, col)))
            .map(display_text)
            .collect()
    }

    /// Row whose flag column says it holds the cell's current value.
    pub fn flagged_row(&self) -> Option<usize> {
        (0..self.model.row_count()).find(|&row| {
            self.model
                .value_at(CellPos::new(row, 0))
                .is_some_and(|flag| flag.is_truthy())
        })
    }

    pub(crate) fn load(&mut self, result: &QueryResult, metrics: &TextMetrics) {
        self.model = ResultGrid::from_query_result(result);
        self.popup.size_to_contents(&self.model, metrics);
        self.popup.hide_section(0);
    }

    pub(crate) fn mark_failed(&mut self) {
        self.model.set_execution_in_progress(false);
        self.model.set_all_data_loaded(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_core::Value;
    use gridlink_test_support::fixtures;

    fn loaded_dropdown() -> LookupDropdown {
        let mut dropdown = LookupDropdown::new("6".into(), true, 120, 1920);
        let result = fixtures::table_result(
            &["curr", "dept_id", "name"],
            vec![
                vec![Value::Int(0), Value::Int(5), fixtures::text_cell("Eng")],
                vec![Value::Int(1), Value::Int(6), fixtures::text_cell("Sales")],
            ],
        );
        dropdown.load(&result, &TextMetrics::default());
        dropdown
    }

    #[test]
    fn starts_pending_with_seed_text() {
        let dropdown = LookupDropdown::new("Eng".into(), true, 120, 1920);

        assert!(dropdown.is_loading());
        assert!(!dropdown.is_ready());
        assert_eq!(dropdown.current_text(), "Eng");
        assert!(dropdown.is_text_selected());
        assert_eq!(dropdown.popup().container_width(), 120);
    }

    #[test]
    fn load_hides_flag_column() {
        let dropdown = loaded_dropdown();

        assert!(dropdown.is_ready());
        assert!(dropdown.popup().is_section_hidden(0));
        assert_eq!(dropdown.options(), vec!["5", "6"]);
        assert_eq!(dropdown.row_texts(1), vec!["6", "Sales"]);
        assert_eq!(dropdown.flagged_row(), Some(1));
    }

    #[test]
    fn selecting_rows_and_typing() {
        let mut dropdown = loaded_dropdown();

        dropdown.set_current_index(Some(0));
        assert_eq!(dropdown.current_text(), "5");

        dropdown.set_edit_text("77");
        assert_eq!(dropdown.current_index(), None);
        assert_eq!(dropdown.current_text(), "77");

        dropdown.set_current_index(Some(9));
        assert_eq!(dropdown.current_index(), Some(9));
        assert_eq!(dropdown.current_text(), "77");
    }

    #[test]
    fn failed_dropdown_is_not_ready() {
        let mut dropdown = LookupDropdown::new(String::new(), false, 100, 1920);
        dropdown.mark_failed();

        assert!(!dropdown.is_loading());
        assert!(!dropdown.is_ready());
        assert!(dropdown.options().is_empty());
    }
}
