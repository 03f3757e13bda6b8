use std::sync::Arc;
use std::time::{Duration, Instant};

use gridlink_core::{Connection, EditorConfig, Value};
use gridlink_grid::{
    CellEditDelegate, CellPos, ColumnDescriptor, CommitOutcome, EditError, EditorId,
    ForeignKeyConstraint, ResultGrid, SkipReason,
};
use gridlink_test_support::{FakeConnection, RecordingNotifier, fixtures};

const LOOKUP_FOR_NULL: &str = "SELECT (departments.id IS NULL) AS curr, departments.id AS dept_id, \
                               departments.name FROM departments";
const LOOKUP_FOR_6: &str = "SELECT (departments.id = 6) AS curr, departments.id AS dept_id, \
                            departments.name FROM departments";

fn count_sql(lookup: &str) -> String {
    format!("SELECT count(*) FROM ({})", lookup)
}

fn department_rows(current: Option<i64>) -> Vec<Vec<Value>> {
    [(5, "Eng"), (6, "Sales")]
        .into_iter()
        .map(|(id, name)| {
            let flag = i64::from(current == Some(id));
            vec![Value::Int(flag), Value::Int(id), fixtures::text_cell(name)]
        })
        .collect()
}

fn departments_db(lookup: &str, current: Option<i64>, count: i64) -> FakeConnection {
    FakeConnection::new()
        .with_table(
            "departments",
            fixtures::columns(&[("id", "INTEGER"), ("name", "TEXT")]),
        )
        .with_query_result(count_sql(lookup), fixtures::scalar_result(Value::Int(count)))
        .with_query_result(
            lookup,
            fixtures::table_result(&["curr", "dept_id", "name"], department_rows(current)),
        )
}

fn employee_grid(dept: Value) -> ResultGrid {
    let columns = vec![
        ColumnDescriptor::new("id", "INTEGER").with_table("employees"),
        ColumnDescriptor::new("name", "TEXT").with_table("employees"),
        ColumnDescriptor::new("dept_id", "INTEGER")
            .with_table("employees")
            .with_foreign_key(ForeignKeyConstraint::new("dept_id", "departments", "id")),
    ];
    let mut grid = ResultGrid::new(
        columns,
        vec![vec![Value::Int(1), fixtures::text_cell("Ann"), dept]],
    )
    .with_source_table("employees");
    grid.materialize_all();
    grid
}

fn new_delegate(notifier: &RecordingNotifier) -> CellEditDelegate {
    CellEditDelegate::new(EditorConfig::default(), notifier.clone())
}

fn settle(delegate: &mut CellEditDelegate, id: EditorId) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while delegate.is_lookup_pending(id) && Instant::now() < deadline {
        delegate.wait_events(Duration::from_millis(50));
    }
}

const DEPT: CellPos = CellPos { row: 0, col: 2 };

#[test]
fn flagged_row_is_selected_for_null_cell_and_commits_the_key() {
    let db = departments_db(LOOKUP_FOR_NULL, Some(5), 2);
    let conn: Arc<dyn Connection> = Arc::new(db.clone());
    let notifier = RecordingNotifier::new();
    let mut delegate = new_delegate(&notifier);
    let mut grid = employee_grid(Value::Null);

    let id = delegate
        .open_editor(&grid, DEPT, conn.as_ref(), &conn)
        .expect("editor opens");
    settle(&mut delegate, id);

    let dropdown = delegate
        .editor(id)
        .and_then(|e| e.as_lookup())
        .expect("lookup editor");
    assert_eq!(dropdown.current_index(), Some(0));
    assert_eq!(dropdown.current_text(), "5");
    assert!(!dropdown.is_text_selected());

    let outcome = delegate.set_model_data(id, &mut grid);
    assert_eq!(outcome, CommitOutcome::Committed(Value::Int(5)));
    assert_eq!(grid.value_at(DEPT), Some(&Value::Int(5)));
    assert_eq!(grid.last_edited(), Some(DEPT));
    assert!(notifier.is_empty());

    let executed = db.stats().executed_requests;
    assert_eq!(executed[0].sql, count_sql(LOOKUP_FOR_NULL));
    assert_eq!(executed[1].sql, LOOKUP_FOR_NULL);
    assert_eq!(executed[1].limit, Some(10_000));
}

#[test]
fn seed_text_matches_exactly_before_the_flag() {
    let db = departments_db(LOOKUP_FOR_6, Some(6), 2);
    let conn: Arc<dyn Connection> = Arc::new(db);
    let notifier = RecordingNotifier::new();
    let mut delegate = new_delegate(&notifier);
    let mut grid = employee_grid(Value::Int(6));

    let id = delegate
        .open_editor(&grid, DEPT, conn.as_ref(), &conn)
        .expect("editor opens");
    assert_eq!(delegate.editor(id).map(|e| e.text()), Some("6"));
    assert!(
        delegate
            .editor(id)
            .and_then(|e| e.as_lookup())
            .is_some_and(|d| d.is_text_selected())
    );

    settle(&mut delegate, id);

    let dropdown = delegate.editor(id).and_then(|e| e.as_lookup()).expect("lookup");
    assert_eq!(dropdown.current_index(), Some(1));
    assert!(dropdown.popup().is_section_hidden(0));

    delegate.select_lookup_row(id, Some(0));
    assert_eq!(
        delegate.set_model_data(id, &mut grid),
        CommitOutcome::Committed(Value::Int(5))
    );
}

#[test]
fn text_typed_before_loading_is_kept_as_the_seed() {
    let db = departments_db(LOOKUP_FOR_6, Some(6), 2);
    db.hold_query(LOOKUP_FOR_6);
    let conn: Arc<dyn Connection> = Arc::new(db.clone());
    let notifier = RecordingNotifier::new();
    let mut delegate = new_delegate(&notifier);
    let mut grid = employee_grid(Value::Int(6));

    let id = delegate
        .open_editor(&grid, DEPT, conn.as_ref(), &conn)
        .expect("editor opens");
    delegate.set_editor_text(id, "42");
    assert_eq!(delegate.poll_events(), 1);

    db.release_query(LOOKUP_FOR_6);
    settle(&mut delegate, id);

    let dropdown = delegate.editor(id).and_then(|e| e.as_lookup()).expect("lookup");
    assert_eq!(dropdown.current_index(), None);
    assert_eq!(dropdown.current_text(), "42");
    assert_eq!(dropdown.options(), vec!["5", "6"]);

    assert_eq!(
        delegate.set_model_data(id, &mut grid),
        CommitOutcome::Committed(Value::Text("42".into()))
    );
    assert!(grid.item_at(DEPT).is_some_and(|c| c.is_uncommitted()));
}

#[test]
fn closed_editor_ignores_late_events() {
    let db = departments_db(LOOKUP_FOR_6, Some(6), 2);
    db.hold_query(LOOKUP_FOR_6);
    let conn: Arc<dyn Connection> = Arc::new(db.clone());
    let notifier = RecordingNotifier::new();
    let mut delegate = new_delegate(&notifier);
    let mut grid = employee_grid(Value::Int(6));

    let id = delegate
        .open_editor(&grid, DEPT, conn.as_ref(), &conn)
        .expect("editor opens");
    assert_eq!(delegate.poll_events(), 1);
    assert!(delegate.is_lookup_pending(id));

    assert!(delegate.close_editor(id));
    db.release_query(LOOKUP_FOR_6);

    assert_eq!(delegate.wait_events(Duration::from_secs(5)), 1);
    assert_eq!(delegate.open_editor_count(), 0);
    assert!(delegate.editor(id).is_none());
    assert_eq!(delegate.set_model_data(id, &mut grid), CommitOutcome::UnknownEditor);
    assert_eq!(grid.value_at(DEPT), Some(&Value::Int(6)));
    assert!(notifier.is_empty());
}

#[test]
fn row_cap_is_inclusive() {
    let config = EditorConfig {
        max_rows_for_fk: 2,
        ..EditorConfig::default()
    };

    let at_cap: Arc<dyn Connection> = Arc::new(departments_db(LOOKUP_FOR_6, Some(6), 2));
    let notifier = RecordingNotifier::new();
    let mut delegate = CellEditDelegate::new(config, notifier.clone());
    let grid = employee_grid(Value::Int(6));

    let id = delegate
        .open_editor(&grid, DEPT, at_cap.as_ref(), &at_cap)
        .expect("editor opens");
    assert!(delegate.editor(id).is_some_and(|e| e.is_lookup()));
    assert!(notifier.is_empty());

    let over_cap: Arc<dyn Connection> = Arc::new(departments_db(LOOKUP_FOR_6, Some(6), 3));
    let id = delegate
        .open_editor(&grid, DEPT, over_cap.as_ref(), &over_cap)
        .expect("falls back to text");
    assert!(delegate.editor(id).is_some_and(|e| !e.is_lookup()));
    assert_eq!(delegate.editor(id).map(|e| e.text()), Some("6"));
    assert_eq!(
        notifier.warnings(),
        vec![
            EditError::LookupTooLarge {
                column: "dept_id".into(),
                max_rows: 2
            }
            .to_string()
        ]
    );
}

#[test]
fn failed_lookup_warns_and_skips_commit() {
    let db = FakeConnection::new()
        .with_table("departments", fixtures::columns(&[("id", "INTEGER"), ("name", "TEXT")]))
        .with_query_result(count_sql(LOOKUP_FOR_6), fixtures::scalar_result(Value::Int(2)))
        .with_query_error(LOOKUP_FOR_6, "database is locked");
    let conn: Arc<dyn Connection> = Arc::new(db);
    let notifier = RecordingNotifier::new();
    let mut delegate = new_delegate(&notifier);
    let mut grid = employee_grid(Value::Int(6));

    let id = delegate
        .open_editor(&grid, DEPT, conn.as_ref(), &conn)
        .expect("editor opens");
    settle(&mut delegate, id);

    assert_eq!(
        notifier.warnings(),
        vec!["Cannot edit this cell. Details: database is locked".to_string()]
    );
    assert_eq!(
        delegate.set_model_data(id, &mut grid),
        CommitOutcome::Skipped(SkipReason::LookupNotReady)
    );
    assert_eq!(grid.value_at(DEPT), Some(&Value::Int(6)));
}

#[test]
fn failed_count_rechecks_the_table_structure() {
    let db = FakeConnection::new()
        .with_table("departments", fixtures::columns(&[("id", "INTEGER"), ("name", "TEXT")]))
        .with_table("employees", fixtures::columns(&[("id", "INTEGER"), ("name", "TEXT")]))
        .with_query_error(count_sql(LOOKUP_FOR_6), "no such column: departments.id");
    let conn: Arc<dyn Connection> = Arc::new(db.clone());
    let notifier = RecordingNotifier::new();
    let mut delegate = new_delegate(&notifier);
    let grid = employee_grid(Value::Int(6));

    assert!(delegate.open_editor(&grid, DEPT, conn.as_ref(), &conn).is_none());
    assert_eq!(notifier.warnings(), vec![EditError::StructureOutOfDate.to_string()]);

    db.set_table(
        "employees",
        fixtures::columns(&[("id", "INTEGER"), ("name", "TEXT"), ("dept_id", "INTEGER")]),
    );
    let id = delegate
        .open_editor(&grid, DEPT, conn.as_ref(), &conn)
        .expect("unchanged structure still opens the lookup");
    assert!(delegate.editor(id).is_some_and(|e| e.is_lookup()));
    assert_eq!(notifier.warnings().len(), 1);
    delegate.close_all();
}

#[test]
fn commit_while_loading_is_skipped() {
    let db = departments_db(LOOKUP_FOR_6, Some(6), 2);
    db.hold_query(LOOKUP_FOR_6);
    let conn: Arc<dyn Connection> = Arc::new(db.clone());
    let notifier = RecordingNotifier::new();
    let mut delegate = new_delegate(&notifier);
    let mut grid = employee_grid(Value::Int(6));

    let id = delegate
        .open_editor(&grid, DEPT, conn.as_ref(), &conn)
        .expect("editor opens");

    assert_eq!(
        delegate.set_model_data(id, &mut grid),
        CommitOutcome::Skipped(SkipReason::LookupNotReady)
    );

    db.release_query(LOOKUP_FOR_6);
    settle(&mut delegate, id);
    delegate.close_all();
    assert_eq!(delegate.open_editor_count(), 0);
}

#[test]
fn out_of_range_selection_commits_the_text() {
    let db = departments_db(LOOKUP_FOR_6, Some(6), 2);
    let conn: Arc<dyn Connection> = Arc::new(db);
    let notifier = RecordingNotifier::new();
    let mut delegate = new_delegate(&notifier);
    let mut grid = employee_grid(Value::Int(6));

    let id = delegate
        .open_editor(&grid, DEPT, conn.as_ref(), &conn)
        .expect("editor opens");
    settle(&mut delegate, id);

    delegate.select_lookup_row(id, Some(99));
    assert_eq!(
        delegate.set_model_data(id, &mut grid),
        CommitOutcome::Committed(Value::Text("6".into()))
    );
}

#[test]
fn empty_text_over_null_key_is_kept_null() {
    let db = departments_db(LOOKUP_FOR_NULL, None, 2);
    let conn: Arc<dyn Connection> = Arc::new(db);
    let notifier = RecordingNotifier::new();
    let mut delegate = new_delegate(&notifier);
    let mut grid = employee_grid(Value::Null);

    let id = delegate
        .open_editor(&grid, DEPT, conn.as_ref(), &conn)
        .expect("editor opens");
    settle(&mut delegate, id);

    let dropdown = delegate.editor(id).and_then(|e| e.as_lookup()).expect("lookup");
    assert!(dropdown.is_ready());
    assert_eq!(dropdown.current_index(), None);
    assert_eq!(dropdown.current_text(), "");

    assert_eq!(
        delegate.set_model_data(id, &mut grid),
        CommitOutcome::Skipped(SkipReason::KeepNull)
    );
    assert_eq!(grid.value_at(DEPT), Some(&Value::Null));
    assert!(grid.uncommitted_cells().is_empty());
    assert_eq!(grid.last_edited(), Some(DEPT));
}

#[test]
fn missing_cell_item_writes_the_edit_text_raw() {
    let db = departments_db(LOOKUP_FOR_6, Some(6), 2);
    let conn: Arc<dyn Connection> = Arc::new(db);
    let notifier = RecordingNotifier::new();
    let mut delegate = new_delegate(&notifier);
    let grid = employee_grid(Value::Int(6));

    let id = delegate
        .open_editor(&grid, DEPT, conn.as_ref(), &conn)
        .expect("editor opens");
    settle(&mut delegate, id);
    delegate.select_lookup_row(id, Some(0));

    let mut reloaded = ResultGrid::new(grid.columns().to_vec(), vec![vec![Value::Null; 3]]);
    assert!(reloaded.item_at(DEPT).is_none());

    assert_eq!(
        delegate.set_model_data(id, &mut reloaded),
        CommitOutcome::WrittenRaw(Value::Text("5".into()))
    );
    assert_eq!(reloaded.value_at(DEPT), Some(&Value::Text("5".into())));
    assert!(notifier.is_empty());
}

#[test]
fn empty_lookup_keeps_seed_as_free_text() {
    let db = FakeConnection::new()
        .with_query_result(count_sql(LOOKUP_FOR_6), fixtures::scalar_result(Value::Int(0)));
    db.set_table("departments", fixtures::columns(&[("id", "INTEGER"), ("name", "TEXT")]));
    let conn: Arc<dyn Connection> = Arc::new(db);
    let notifier = RecordingNotifier::new();
    let mut delegate = new_delegate(&notifier);
    let grid = employee_grid(Value::Int(6));

    let id = delegate
        .open_editor(&grid, DEPT, conn.as_ref(), &conn)
        .expect("editor opens");
    settle(&mut delegate, id);

    let dropdown = delegate.editor(id).and_then(|e| e.as_lookup()).expect("lookup");
    assert!(dropdown.is_ready());
    assert_eq!(dropdown.current_index(), None);
    assert_eq!(dropdown.current_text(), "6");
}

#[test]
fn popup_is_fitted_to_its_columns() {
    let db = departments_db(LOOKUP_FOR_6, Some(6), 2);
    let conn: Arc<dyn Connection> = Arc::new(db);
    let notifier = RecordingNotifier::new();
    let mut delegate = new_delegate(&notifier).with_screen_width(400);
    let mut grid = employee_grid(Value::Int(6));
    grid.set_column_width(2, 250);

    let id = delegate
        .open_editor(&grid, DEPT, conn.as_ref(), &conn)
        .expect("editor opens");
    settle(&mut delegate, id);

    let popup = delegate
        .editor(id)
        .and_then(|e| e.as_lookup())
        .map(|d| d.popup().clone())
        .expect("lookup");
    assert_eq!(popup.minimum_width(), 250);
    assert_eq!(popup.header_length(), 250);
    assert_eq!(popup.container_width(), 250);

    delegate.header_section_resized(id, 2, 500);
    let popup = delegate
        .editor(id)
        .and_then(|e| e.as_lookup())
        .map(|d| d.popup().clone())
        .expect("lookup");
    assert_eq!(popup.minimum_width(), 400);

    delegate.popup_shown(id);
    let again = delegate
        .editor(id)
        .and_then(|e| e.as_lookup())
        .map(|d| d.popup().clone())
        .expect("lookup");
    assert_eq!(again.minimum_width(), 400);
}
