use crate::error::EditorError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Editor options read from `config.toml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Columns added or removed by `>` and `<`
    pub shift_width: usize,
    /// Insert spaces instead of a tab character for `<Tab>` and shifts
    pub expand_tab: bool,
    pub tab_stop: usize,
    pub undo_levels: usize,
    /// Searches continue from the other end of the buffer
    pub wrap_scan: bool,
    pub ignore_case: bool,
    /// Lines of context kept around the cursor when scrolling
    pub scroll_off: usize,
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub log_level: Option<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            shift_width: 4,
            expand_tab: true,
            tab_stop: 4,
            undo_levels: crate::history::DEFAULT_UNDO_LEVELS,
            wrap_scan: true,
            ignore_case: false,
            scroll_off: 0,
            log_level: None,
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, EditorError> {
        toml::from_str(content).map_err(|e| EditorError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, EditorError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EditorError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// `<config dir>/kestrel/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kestrel").join("config.toml"))
    }

    /// Load the default config file; a missing file means defaults.
    pub fn load_default() -> Result<Self, EditorError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Text inserted for one indentation level
    pub fn indent_unit(&self) -> String {
        if self.expand_tab {
            " ".repeat(self.shift_width.max(1))
        } else {
            "\t".to_string()
        }
    }

    /// Text inserted by `<Tab>` in Insert mode
    pub fn tab_text(&self) -> String {
        if self.expand_tab {
            " ".repeat(self.tab_stop.max(1))
        } else {
            "\t".to_string()
        }
    }
}
