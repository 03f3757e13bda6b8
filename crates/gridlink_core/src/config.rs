use crate::DbError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_MAX_ROWS_FOR_FK: u64 = 10_000;
pub const DEFAULT_FK_CELL_LENGTH_LIMIT: usize = 10_000;
pub const DEFAULT_HUGE_CONTENTS_WARNING_LIMIT: usize = 500_000;

/// Tunables for inline cell editing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Largest lookup result that is still offered as a dropdown.
    #[serde(default = "default_max_rows_for_fk")]
    pub max_rows_for_fk: u64,

    /// Text cells loaded into a lookup dropdown are cut to this many characters.
    #[serde(default = "default_fk_cell_length_limit")]
    pub fk_cell_length_limit: usize,

    /// Text longer than this triggers a one-time advisory in the inline editor.
    #[serde(default = "default_huge_contents_warning_limit")]
    pub huge_contents_warning_limit: usize,

    /// Submitting an empty editor over a NULL cell leaves it NULL.
    #[serde(default = "default_keep_null_when_empty")]
    pub keep_null_when_empty: bool,
}

fn default_max_rows_for_fk() -> u64 {
    DEFAULT_MAX_ROWS_FOR_FK
}

fn default_fk_cell_length_limit() -> usize {
    DEFAULT_FK_CELL_LENGTH_LIMIT
}

fn default_huge_contents_warning_limit() -> usize {
    DEFAULT_HUGE_CONTENTS_WARNING_LIMIT
}

fn default_keep_null_when_empty() -> bool {
    true
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_rows_for_fk: DEFAULT_MAX_ROWS_FOR_FK,
            fk_cell_length_limit: DEFAULT_FK_CELL_LENGTH_LIMIT,
            huge_contents_warning_limit: DEFAULT_HUGE_CONTENTS_WARNING_LIMIT,
            keep_null_when_empty: true,
        }
    }
}

pub struct EditorConfigStore {
    path: PathBuf,
}

impl EditorConfigStore {
    pub fn new() -> Result<Self, DbError> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            DbError::IoError(std::io::Error::other("Could not find config directory"))
        })?;

        let app_dir = config_dir.join("gridlink");
        fs::create_dir_all(&app_dir).map_err(DbError::IoError)?;

        Ok(Self {
            path: app_dir.join("config.json"),
        })
    }

    pub fn from_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<EditorConfig, DbError> {
        if !self.path.exists() {
            return Ok(EditorConfig::default());
        }

        let content = fs::read_to_string(&self.path).map_err(DbError::IoError)?;
        let config: EditorConfig =
            serde_json::from_str(&content).map_err(|e| DbError::InvalidConfig(e.to_string()))?;

        Ok(config)
    }

    pub fn save(&self, config: &EditorConfig) -> Result<(), DbError> {
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| DbError::InvalidConfig(e.to_string()))?;

        fs::write(&self.path, content).map_err(DbError::IoError)?;

        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
