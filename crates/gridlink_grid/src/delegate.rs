use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gridlink_core::{Connection, EditorConfig, Notifier, QueryResult, SchemaResolver, Value};
use uuid::Uuid;

use crate::editor::{EditorKind, LookupDropdown, TextEditor};
use crate::error::EditError;
use crate::geometry::{DEFAULT_SCREEN_WIDTH, TextMetrics, fit};
use crate::lookup_sql::LookupQueryBuilder;
use crate::model::{CellPos, ColumnDescriptor, ResultGrid};
use crate::row_guard::RowCountGuard;
use crate::session::{
    EditorId, LookupQuery, QuerySession, SessionHub, SessionListener, SessionTicket, dispatch,
};

/// Result of writing an editor's value back into the grid.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Written through the owning cell.
    Committed(Value),

    /// The owning cell could not be resolved; the value went straight into
    /// grid storage.
    WrittenRaw(Value),

    Skipped(SkipReason),

    UnknownEditor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Empty text over a NULL cell with the keep-null policy on.
    KeepNull,

    /// The lookup is still running or has failed.
    LookupNotReady,
}

struct OpenEditor {
    pos: CellPos,
    kind: EditorKind,
}

struct LookupSession {
    session: QuerySession,
    original_text: String,
    seed: Option<String>,
}

/// Creates cell editors for one grid and writes their values back.
///
/// Foreign key columns get a dropdown fed by a lookup query that runs on a
/// worker thread. Its lifecycle events queue up until `poll_events` or
/// `wait_events` dispatches them; events for editors closed in the meantime
/// are dropped.
pub struct CellEditDelegate {
    config: EditorConfig,
    notifier: Box<dyn Notifier>,
    hub: SessionHub,
    editors: HashMap<EditorId, OpenEditor>,
    lookups: HashMap<EditorId, LookupSession>,
    next_generation: u64,
    huge_contents_warned: bool,
    screen_width: u32,
    metrics: TextMetrics,
}

impl CellEditDelegate {
    pub fn new(config: EditorConfig, notifier: impl Notifier + 'static) -> Self {
        Self {
            config,
            notifier: Box::new(notifier),
            hub: SessionHub::new(),
            editors: HashMap::new(),
            lookups: HashMap::new(),
            next_generation: 0,
            huge_contents_warned: false,
            screen_width: DEFAULT_SCREEN_WIDTH,
            metrics: TextMetrics::default(),
        }
    }

    pub fn with_screen_width(mut self, width: u32) -> Self {
        self.screen_width = width;
        self
    }

    pub fn with_text_metrics(mut self, metrics: TextMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Opens an editor for `pos`, or returns `None` after warning the user
    /// why the cell cannot be edited.
    pub fn open_editor<S: SchemaResolver + ?Sized>(
        &mut self,
        grid: &ResultGrid,
        pos: CellPos,
        schema: &S,
        db: &Arc<dyn Connection>,
    ) -> Option<EditorId> {
        match self.try_open_editor(grid, pos, schema, db) {
            Ok(id) => Some(id),
            Err(e) => {
                self.notifier.warn(&e.to_string());
                None
            }
        }
    }

    fn try_open_editor<S: SchemaResolver + ?Sized>(
        &mut self,
        grid: &ResultGrid,
        pos: CellPos,
        schema: &S,
        db: &Arc<dyn Connection>,
    ) -> Result<EditorId, EditError> {
        let cell = grid.item_at(pos).ok_or(EditError::CellUnavailable(pos))?;
        let column = grid.column(pos.col).ok_or(EditError::CellUnavailable(pos))?;

        if cell.is_deleted_row() {
            return Err(EditError::RowDeleted);
        }

        if let Some(reason) = column.edition_forbidden_reason() {
            return Err(EditError::ColumnNotEditable(reason.to_string()));
        }

        if grid.is_structure_out_of_date() {
            return Err(EditError::StructureOutOfDate);
        }

        let value = cell.value().clone();
        if !column.is_foreign_key() {
            return Ok(self.open_text_editor(pos, &value));
        }

        self.open_lookup_editor(grid, pos, column, value, schema, db)
    }

    fn open_lookup_editor<S: SchemaResolver + ?Sized>(
        &mut self,
        grid: &ResultGrid,
        pos: CellPos,
        column: &ColumnDescriptor,
        value: Value,
        schema: &S,
        db: &Arc<dyn Connection>,
    ) -> Result<EditorId, EditError> {
        let builder = LookupQueryBuilder::new(db.dialect());
        let Some(sql) = builder.build(&column.name, &column.fk_constraints, &value, schema) else {
            return Ok(self.open_text_editor(pos, &value));
        };

        let guard = RowCountGuard::new(self.config.max_rows_for_fk);
        let rows = guard.count(db.as_ref(), &sql);

        if !guard.allows(rows.count) {
            let too_large = EditError::LookupTooLarge {
                column: column.name.clone(),
                max_rows: guard.max_rows(),
            };
            self.notifier.warn(&too_large.to_string());
            return Ok(self.open_text_editor(pos, &value));
        }

        if rows.count == 0 && rows.errored && structure_changed(grid, db.as_ref()) {
            return Err(EditError::StructureOutOfDate);
        }

        let id = Uuid::new_v4();
        self.next_generation += 1;
        let ticket = SessionTicket {
            editor: id,
            generation: self.next_generation,
        };

        let original_text = value.edit_text();
        let dropdown = LookupDropdown::new(
            original_text.clone(),
            !value.is_null(),
            grid.column_width(pos.col),
            self.screen_width,
        );

        let mut session = QuerySession::new(ticket);
        session.submit(
            Arc::clone(db),
            LookupQuery {
                sql,
                row_limit: self.config.max_rows_for_fk,
                cell_length_limit: self.config.fk_cell_length_limit,
            },
            self.hub.sender(),
        );

        log::debug!("Opened lookup editor {} for cell {}", id, pos);

        self.editors.insert(
            id,
            OpenEditor {
                pos,
                kind: EditorKind::ForeignKeyLookup(dropdown),
            },
        );
        self.lookups.insert(
            id,
            LookupSession {
                session,
                original_text,
                seed: None,
            },
        );

        Ok(id)
    }

    fn open_text_editor(&mut self, pos: CellPos, value: &Value) -> EditorId {
        let id = Uuid::new_v4();
        let text = self.editor_text_for(value);
        self.editors.insert(
            id,
            OpenEditor {
                pos,
                kind: EditorKind::PlainText(TextEditor::new(text)),
            },
        );
        id
    }

    fn editor_text_for(&mut self, value: &Value) -> String {
        let text = value.edit_text();

        if !self.huge_contents_warned
            && text.chars().count() > self.config.huge_contents_warning_limit
        {
            self.huge_contents_warned = true;
            self.notifier.info(&EditError::HugeContents.to_string());
        }

        text
    }

    pub fn editor(&self, id: EditorId) -> Option<&EditorKind> {
        self.editors.get(&id).map(|e| &e.kind)
    }

    pub fn editor_position(&self, id: EditorId) -> Option<CellPos> {
        self.editors.get(&id).map(|e| e.pos)
    }

    pub fn open_editor_count(&self) -> usize {
        self.editors.len()
    }

    pub fn is_lookup_pending(&self, id: EditorId) -> bool {
        self.lookups
            .get(&id)
            .is_some_and(|l| !l.session.state().is_terminal())
    }

    /// Replaces the editor's text as if the user typed it.
    pub fn set_editor_text(&mut self, id: EditorId, text: &str) -> bool {
        let Some(editor) = self.editors.get_mut(&id) else {
            return false;
        };

        match &mut editor.kind {
            EditorKind::PlainText(text_editor) => text_editor.set_text(text),
            EditorKind::ForeignKeyLookup(dropdown) => dropdown.set_edit_text(text),
        }
        true
    }

    /// Picks a dropdown row. Returns `false` for plain text editors.
    pub fn select_lookup_row(&mut self, id: EditorId, row: Option<usize>) -> bool {
        match self
            .editors
            .get_mut(&id)
            .and_then(|e| e.kind.as_lookup_mut())
        {
            Some(dropdown) => {
                dropdown.set_current_index(row);
                true
            }
            None => false,
        }
    }

    /// Reloads a plain text editor from the grid. Dropdowns are filled by
    /// their lookup and are left alone.
    pub fn set_editor_data(&mut self, id: EditorId, grid: &ResultGrid) -> bool {
        let Some(pos) = self.editor_position(id) else {
            return false;
        };

        if self.editors.get(&id).is_some_and(|e| e.kind.is_lookup()) {
            return true;
        }

        let value = grid.value_at(pos).cloned().unwrap_or(Value::Null);
        let text = self.editor_text_for(&value);

        if let Some(OpenEditor {
            kind: EditorKind::PlainText(editor),
            ..
        }) = self.editors.get_mut(&id)
        {
            editor.set_text(text);
        }
        true
    }

    /// Writes the editor's value into its cell.
    pub fn set_model_data(&mut self, id: EditorId, grid: &mut ResultGrid) -> CommitOutcome {
        let Some(editor) = self.editors.get(&id) else {
            return CommitOutcome::UnknownEditor;
        };

        let pos = editor.pos;
        let outcome = match &editor.kind {
            EditorKind::PlainText(text_editor) => {
                self.commit_text(grid, pos, text_editor.text())
            }
            EditorKind::ForeignKeyLookup(dropdown) => self.commit_lookup(grid, pos, dropdown),
        };

        grid.notify_item_edition_ended(pos);
        outcome
    }

    fn keeps_null(&self, grid: &ResultGrid, pos: CellPos, text: &str) -> bool {
        self.config.keep_null_when_empty
            && text.is_empty()
            && grid.value_at(pos).is_none_or(Value::is_null)
    }

    fn commit_text(&self, grid: &mut ResultGrid, pos: CellPos, text: &str) -> CommitOutcome {
        if self.keeps_null(grid, pos, text) {
            return CommitOutcome::Skipped(SkipReason::KeepNull);
        }

        let numeric = grid
            .column(pos.col)
            .is_some_and(|c| c.data_type.is_numeric());
        let value = if numeric {
            parse_numeric(text)
        } else {
            Value::Text(text.to_string())
        };

        write_to_cell(grid, pos, value)
    }

    fn commit_lookup(
        &self,
        grid: &mut ResultGrid,
        pos: CellPos,
        dropdown: &LookupDropdown,
    ) -> CommitOutcome {
        if !dropdown.is_ready() {
            return CommitOutcome::Skipped(SkipReason::LookupNotReady);
        }

        let text = dropdown.current_text();
        if self.keeps_null(grid, pos, text) {
            return CommitOutcome::Skipped(SkipReason::KeepNull);
        }

        if grid.item_at(pos).is_none() {
            log::error!(
                "Confirmed foreign key edition, but there is no cell item at {}",
                pos
            );
            let value = Value::Text(text.to_string());
            grid.write_raw(pos, value.clone());
            return CommitOutcome::WrittenRaw(value);
        }

        let model = dropdown.model();
        let selected = dropdown
            .current_index()
            .filter(|&row| row < model.row_count());

        let value = match selected {
            None => Value::Text(text.to_string()),
            Some(row) => match model.value_at(CellPos::new(row, dropdown.model_column())) {
                Some(value) => value.clone(),
                None => {
                    log::error!(
                        "Lookup row {} has no value column, committing the edit text",
                        row
                    );
                    Value::Text(text.to_string())
                }
            },
        };

        write_to_cell(grid, pos, value)
    }

    /// Forgets an editor. Events still in flight for it become no-ops.
    pub fn close_editor(&mut self, id: EditorId) -> bool {
        self.lookups.remove(&id);
        self.editors.remove(&id).is_some()
    }

    /// Tears down every editor, e.g. when the grid closes.
    pub fn close_all(&mut self) {
        self.lookups.clear();
        self.editors.clear();
    }

    /// Dispatches every queued lookup event without blocking. Returns how
    /// many were handled.
    pub fn poll_events(&mut self) -> usize {
        let messages = self.hub.drain();
        let count = messages.len();
        for message in messages {
            dispatch(self, message);
        }
        count
    }

    /// Waits up to `timeout` for a lookup event, then dispatches it along
    /// with anything else already queued.
    pub fn wait_events(&mut self, timeout: Duration) -> usize {
        let Some(first) = self.hub.wait(timeout) else {
            return 0;
        };

        dispatch(self, first);
        1 + self.poll_events()
    }

    /// The user (or a data load) resized a section of a dropdown's popup.
    pub fn header_section_resized(&mut self, id: EditorId, section: usize, width: u32) {
        let Some(dropdown) = self
            .editors
            .get_mut(&id)
            .and_then(|e| e.kind.as_lookup_mut())
        else {
            return;
        };

        if !dropdown.popup_mut().resize_section(section, width) {
            return;
        }

        if dropdown.model().is_all_data_loaded() {
            let anchor = dropdown.anchor_width();
            fit(dropdown.popup_mut(), true, anchor, false);
        }
    }

    /// A dropdown's popup became visible.
    pub fn popup_shown(&mut self, id: EditorId) {
        if let Some(dropdown) = self
            .editors
            .get_mut(&id)
            .and_then(|e| e.kind.as_lookup_mut())
        {
            let anchor = dropdown.anchor_width();
            fit(dropdown.popup_mut(), true, anchor, true);
        }
    }

    fn live_lookup(
        &mut self,
        ticket: SessionTicket,
    ) -> Option<(&mut LookupSession, &mut LookupDropdown)> {
        let lookup = match self.lookups.get_mut(&ticket.editor) {
            Some(lookup) if lookup.session.ticket().generation == ticket.generation => lookup,
            _ => {
                log::debug!(
                    "Dropping lookup event for closed editor {} (generation {})",
                    ticket.editor,
                    ticket.generation
                );
                return None;
            }
        };

        let dropdown = self
            .editors
            .get_mut(&ticket.editor)
            .and_then(|e| e.kind.as_lookup_mut())?;

        Some((lookup, dropdown))
    }
}

impl SessionListener for CellEditDelegate {
    fn on_about_to_load(&mut self, ticket: SessionTicket) {
        if let Some((lookup, dropdown)) = self.live_lookup(ticket) {
            lookup.seed = Some(dropdown.current_text().to_string());
        }
    }

    fn on_succeeded(&mut self, ticket: SessionTicket, result: QueryResult) {
        let metrics = self.metrics;
        let Some((lookup, dropdown)) = self.live_lookup(ticket) else {
            return;
        };

        if !lookup.session.finish(true) {
            return;
        }

        dropdown.load(&result, &metrics);
        let anchor = dropdown.anchor_width();
        fit(dropdown.popup_mut(), true, anchor, true);

        let seed = lookup
            .seed
            .clone()
            .unwrap_or_else(|| dropdown.current_text().to_string());
        resolve_selection(dropdown, &seed, &lookup.original_text);
    }

    fn on_failed(&mut self, ticket: SessionTicket, message: String) {
        let Some((lookup, dropdown)) = self.live_lookup(ticket) else {
            return;
        };

        if !lookup.session.finish(false) {
            return;
        }

        dropdown.mark_failed();
        self.notifier
            .warn(&EditError::LookupFailed(message).to_string());
    }
}

/// Picks the dropdown row matching what the user saw when loading started.
///
/// An exact match of `seed` against the value column wins. While the seed is
/// still the untouched cell text, the row flagged as the current value is the
/// fallback. Otherwise the seed stays as free text.
fn resolve_selection(dropdown: &mut LookupDropdown, seed: &str, original_text: &str) {
    let rows = dropdown.model().row_count();
    if rows == 0 {
        dropdown.set_edit_text(seed);
        return;
    }

    let matched = dropdown
        .model()
        .find_rows(0..rows, dropdown.model_column(), seed, 1, true)
        .first()
        .copied()
        .or_else(|| {
            if seed == original_text {
                dropdown.flagged_row()
            } else {
                None
            }
        });

    match matched {
        Some(row) => dropdown.set_current_index(Some(row)),
        None => dropdown.set_edit_text(seed),
    }
}

/// Re-reads the live table definition after a failed row count.
fn structure_changed(grid: &ResultGrid, db: &dyn Connection) -> bool {
    grid.has_structure_changed(db).unwrap_or_else(|e| {
        log::warn!("Could not re-check table structure: {}", e);
        false
    })
}

/// Integer first, then a finite real, otherwise the text itself.
pub fn parse_numeric(text: &str) -> Value {
    let trimmed = text.trim();

    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::Int(int);
    }

    match trimmed.parse::<f64>() {
        Ok(real) if real.is_finite() => Value::Float(real),
        _ => Value::Text(text.to_string()),
    }
}

fn write_to_cell(grid: &mut ResultGrid, pos: CellPos, value: Value) -> CommitOutcome {
    if grid.set_value(pos, value.clone()) {
        return CommitOutcome::Committed(value);
    }

    log::error!("No cell item at {} while committing, writing to storage", pos);
    grid.write_raw(pos, value.clone());
    CommitOutcome::WrittenRaw(value)
}
