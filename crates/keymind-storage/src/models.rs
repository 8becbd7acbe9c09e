use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Browsers offered out of the box, all enabled on a fresh install
pub const DEFAULT_BROWSERS: [&str; 3] = ["chrome", "opera", "firefox"];

/// User settings as stored on disk
///
/// Every field falls back to its default when missing, so older settings
/// files (which only carried `api_key` and `web_browsers`) still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: String,
    pub web_browsers: BTreeMap<String, bool>,
    pub allowed: Vec<String>,
    pub banned: Vec<String>,
}

/// Which user-curated list an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Allowed,
    Banned,
}

impl ListKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Banned => "banned",
        }
    }
}

/// Read-only view of the settings consumed by the enforcement core
///
/// All entries are trimmed and lowercased; blank entries are dropped so an
/// empty string can never match every activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsSnapshot {
    pub api_key: Option<String>,
    pub browsers: BTreeSet<String>,
    pub allowed: BTreeSet<String>,
    pub banned: BTreeSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            web_browsers: DEFAULT_BROWSERS
                .iter()
                .map(|name| ((*name).to_string(), true))
                .collect(),
            allowed: Vec::new(),
            banned: Vec::new(),
        }
    }
}

impl Settings {
    /// Build the snapshot handed to the enforcement core
    #[must_use]
    pub fn snapshot(&self) -> SettingsSnapshot {
        let api_key = Some(self.api_key.trim())
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        SettingsSnapshot {
            api_key,
            browsers: normalize(
                self.web_browsers
                    .iter()
                    .filter(|(_, enabled)| **enabled)
                    .map(|(name, _)| name.as_str()),
            ),
            allowed: normalize(self.allowed.iter().map(String::as_str)),
            banned: normalize(self.banned.iter().map(String::as_str)),
        }
    }

    #[must_use]
    pub fn list(&self, kind: ListKind) -> &[String] {
        match kind {
            ListKind::Allowed => &self.allowed,
            ListKind::Banned => &self.banned,
        }
    }

    /// Add an entry to a list. Returns `false` if it was blank or already present.
    pub fn add_entry(&mut self, kind: ListKind, entry: &str) -> bool {
        let entry = entry.trim();
        if entry.is_empty() {
            return false;
        }
        let list = self.list_mut(kind);
        if list.iter().any(|existing| existing.eq_ignore_ascii_case(entry)) {
            return false;
        }
        list.push(entry.to_string());
        true
    }

    /// Remove an entry (case-insensitive). Returns `false` if nothing matched.
    pub fn remove_entry(&mut self, kind: ListKind, entry: &str) -> bool {
        let entry = entry.trim();
        let list = self.list_mut(kind);
        let before = list.len();
        list.retain(|existing| !existing.eq_ignore_ascii_case(entry));
        list.len() != before
    }

    pub fn set_browser(&mut self, name: &str, enabled: bool) {
        self.web_browsers
            .insert(name.trim().to_lowercase(), enabled);
    }

    fn list_mut(&mut self, kind: ListKind) -> &mut Vec<String> {
        match kind {
            ListKind::Allowed => &mut self.allowed,
            ListKind::Banned => &mut self.banned,
        }
    }
}

impl SettingsSnapshot {
    /// The credential, if one is configured and not blank
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

fn normalize<'a>(entries: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    entries
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_lowercase)
        .collect()
}
