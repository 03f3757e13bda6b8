use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use gridlink_core::{Connection, EditorConfig, EditorConfigStore, LogNotifier};
use gridlink_driver_sqlite::SqliteConnection;
use gridlink_grid::{
    CellDecoration, CellEditDelegate, CellPos, CommitOutcome, EditorId, LookupDropdown,
    ResultGrid, display_text, paint,
};

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL_MS: u64 = 50;

const USAGE: &str = "usage: gridlink <database> <table> <row> <column> [value | #row]";

/// One cell edit requested on the command line.
struct EditArgs {
    database: PathBuf,
    table: String,
    row: usize,
    column: String,
    value: Option<String>,
}

pub fn run(args: &[String]) -> i32 {
    let edit = match parse_args(args) {
        Ok(edit) => edit,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            return 2;
        }
    };

    match edit_cell(&edit) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn parse_args(args: &[String]) -> anyhow::Result<EditArgs> {
    let [_, database, table, row, column, rest @ ..] = args else {
        bail!("missing arguments");
    };

    if rest.len() > 1 {
        bail!("unexpected argument: {}", rest[1]);
    }

    Ok(EditArgs {
        database: PathBuf::from(database),
        table: table.clone(),
        row: row
            .parse()
            .with_context(|| format!("invalid row number: {}", row))?,
        column: column.clone(),
        value: rest.first().cloned(),
    })
}

fn load_config() -> EditorConfig {
    match EditorConfigStore::new().and_then(|store| store.load()) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Using default editor settings: {}", e);
            EditorConfig::default()
        }
    }
}

fn edit_cell(edit: &EditArgs) -> anyhow::Result<()> {
    let db: Arc<dyn Connection> = Arc::new(
        SqliteConnection::open(&edit.database)
            .with_context(|| format!("opening {}", edit.database.display()))?,
    );

    let mut grid = ResultGrid::load_table(db.as_ref(), &edit.table)
        .with_context(|| format!("loading table {}", edit.table))?;

    let col = match edit.column.parse::<usize>() {
        Ok(index) => index,
        Err(_) => grid
            .column_index(&edit.column)
            .with_context(|| format!("no column {} in {}", edit.column, edit.table))?,
    };
    let pos = CellPos::new(edit.row, col);

    let mut delegate = CellEditDelegate::new(load_config(), LogNotifier);
    let Some(id) = delegate.open_editor(&grid, pos, db.as_ref(), &db) else {
        bail!("cell {} cannot be edited", pos);
    };

    if delegate.editor(id).is_some_and(|e| e.is_lookup()) {
        wait_for_lookup(&mut delegate, id)?;
        delegate.popup_shown(id);
        if let Some(dropdown) = delegate.editor(id).and_then(|e| e.as_lookup()) {
            print_options(dropdown);
        }
    }

    let Some(value) = &edit.value else {
        let text = delegate.editor(id).map(|e| e.text()).unwrap_or_default();
        println!("{} = {}", pos, text);
        delegate.close_editor(id);
        return Ok(());
    };

    match value.strip_prefix('#').map(str::parse::<usize>) {
        Some(Ok(row)) => {
            delegate.select_lookup_row(id, Some(row));
        }
        Some(Err(_)) | None => {
            delegate.set_editor_text(id, value);
        }
    }

    let outcome = delegate.set_model_data(id, &mut grid);
    delegate.close_editor(id);

    match outcome {
        CommitOutcome::Committed(_) | CommitOutcome::WrittenRaw(_) => {
            let shown = grid.value_at(pos).map(display_text).unwrap_or_default();
            let marker = match grid.item_at(pos).map(paint) {
                Some(CellDecoration::Border(_)) => " (uncommitted)",
                _ => "",
            };
            println!("{} = {}{}", pos, shown, marker);
        }
        CommitOutcome::Skipped(reason) => println!("{} unchanged: {:?}", pos, reason),
        CommitOutcome::UnknownEditor => bail!("editor closed before commit"),
    }

    Ok(())
}

fn wait_for_lookup(delegate: &mut CellEditDelegate, id: EditorId) -> anyhow::Result<()> {
    let deadline = Instant::now() + LOOKUP_TIMEOUT;

    while delegate.is_lookup_pending(id) {
        if Instant::now() >= deadline {
            bail!("lookup did not finish within {:?}", LOOKUP_TIMEOUT);
        }
        delegate.wait_events(Duration::from_millis(POLL_INTERVAL_MS));
    }

    Ok(())
}

fn print_options(dropdown: &LookupDropdown) {
    for row in 0..dropdown.model().row_count() {
        let marker = if dropdown.current_index() == Some(row) {
            '*'
        } else {
            ' '
        };
        println!("{} #{} {}", marker, row, dropdown.row_texts(row).join(" | "));
    }
}
