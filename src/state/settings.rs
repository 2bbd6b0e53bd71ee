//! Persisted user settings and the shared enabled flag.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::state::BackdropResult;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Settings {
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".cover_backdrop.json")
    }

    /// Unreadable or corrupt files fall back to the defaults.
    pub fn load(path: &Path) -> Self {
        if let Ok(data) = fs::read_to_string(path) {
            match serde_json::from_str(&data) {
                Ok(settings) => return settings,
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring corrupt settings file"),
            }
        }
        Self::default()
    }

    pub fn save(&self, path: &Path) -> BackdropResult<()> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}

/// Shared view of the "enabled" setting.
///
/// Clones observe the same flag. When backed by a file, every change is
/// written through.
#[derive(Debug, Clone)]
pub struct Toggle {
    enabled: Rc<Cell<bool>>,
    path: Option<PathBuf>,
}

impl Toggle {
    /// An in-memory toggle that is never persisted.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Rc::new(Cell::new(enabled)),
            path: None,
        }
    }

    pub fn persisted(path: PathBuf) -> Self {
        let settings = Settings::load(&path);
        Self {
            enabled: Rc::new(Cell::new(settings.enabled)),
            path: Some(path),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
        if let Some(path) = &self.path {
            if let Err(e) = (Settings { enabled }).save(path) {
                warn!(path = %path.display(), error = %e, "failed to persist settings");
            }
        }
    }

    /// Flips the flag and returns the new state.
    pub fn flip(&self) -> bool {
        let enabled = !self.is_enabled();
        self.set_enabled(enabled);
        enabled
    }
}
