use gridlink_core::{DbError, EditorConfig, EditorConfigStore};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("gridlink_config_test_{}.json", Uuid::new_v4()))
}

#[test]
fn missing_file_yields_defaults() {
    let store = EditorConfigStore::from_path(temp_path());
    let config = store.load().expect("load defaults");

    assert_eq!(config, EditorConfig::default());
    assert_eq!(config.max_rows_for_fk, 10_000);
    assert!(config.keep_null_when_empty);
}

#[test]
fn saves_and_loads_config() {
    let path = temp_path();
    let store = EditorConfigStore::from_path(path.clone());

    let config = EditorConfig {
        max_rows_for_fk: 50,
        keep_null_when_empty: false,
        ..EditorConfig::default()
    };
    store.save(&config).expect("save");

    let loaded = EditorConfigStore::from_path(path.clone())
        .load()
        .expect("reload");
    assert_eq!(loaded, config);

    let _ = fs::remove_file(path);
}

#[test]
fn partial_file_fills_in_defaults() {
    let path = temp_path();
    fs::write(&path, r#"{ "fk_cell_length_limit": 64 }"#).expect("write");

    let config = EditorConfigStore::from_path(path.clone())
        .load()
        .expect("load");
    assert_eq!(config.fk_cell_length_limit, 64);
    assert_eq!(config.max_rows_for_fk, 10_000);
    assert!(config.keep_null_when_empty);

    let _ = fs::remove_file(path);
}

#[test]
fn malformed_file_is_invalid_config() {
    let path = temp_path();
    fs::write(&path, "{ not json").expect("write");

    let result = EditorConfigStore::from_path(path.clone()).load();
    assert!(matches!(result, Err(DbError::InvalidConfig(_))));

    let _ = fs::remove_file(path);
}
