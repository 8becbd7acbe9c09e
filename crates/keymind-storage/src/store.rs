use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::models::{Settings, SettingsSnapshot};

const SETTINGS_FILE_NAME: &str = "settings.json";
const API_KEY_ENV: &str = "KEYMIND_API_KEY";

/// Source of user settings for the enforcement core
///
/// The core only ever calls [`SettingsProvider::load`]; writing is reserved
/// for the configuration surface (the CLI).
pub trait SettingsProvider: Send + Sync {
    /// Current settings, falling back to defaults on any read failure
    fn settings(&self) -> Settings;

    /// Current settings, failing when the stored settings cannot be read
    ///
    /// Use this before [`SettingsProvider::save`] so unreadable settings are
    /// never overwritten with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if stored settings exist but cannot be read or parsed
    fn try_settings(&self) -> Result<Settings> {
        Ok(self.settings())
    }

    /// Persist settings
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be written
    fn save(&self, settings: &Settings) -> Result<()>;

    /// Snapshot consumed on each enforcement decision
    fn load(&self) -> SettingsSnapshot {
        self.settings().snapshot()
    }
}

/// Get the local data directory for keymind.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push("keymind");
    Ok(path)
}

/// Settings stored as pretty-printed JSON on disk
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at `<data_dir>/settings.json`
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(get_data_dir()?.join(SETTINGS_FILE_NAME)))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<Settings>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let settings = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(Some(settings))
    }
}

impl SettingsProvider for JsonSettingsStore {
    fn settings(&self) -> Settings {
        match self.read() {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                log::debug!(
                    "Settings file not found at {}, using defaults",
                    self.path.display()
                );
                Settings::default()
            }
            Err(e) => {
                log::warn!("{e:#}. Using default settings.");
                Settings::default()
            }
        }
    }

    fn try_settings(&self) -> Result<Settings> {
        Ok(self.read()?.unwrap_or_default())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        log::info!("Settings saved to {}", self.path.display());
        Ok(())
    }

    fn load(&self) -> SettingsSnapshot {
        let mut snapshot = self.settings().snapshot();
        if snapshot.api_key.is_none() {
            snapshot.api_key = std::env::var(API_KEY_ENV)
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty());
        }
        snapshot
    }
}

/// In-memory settings, never written to disk
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: RwLock<Settings>,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

impl SettingsProvider for MemorySettingsStore {
    fn settings(&self) -> Settings {
        self.settings
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let mut guard = self
            .settings
            .write()
            .map_err(|e| anyhow::anyhow!("Settings lock poisoned: {e}"))?;
        *guard = settings.clone();
        Ok(())
    }
}
