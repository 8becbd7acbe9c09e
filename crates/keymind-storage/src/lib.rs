pub mod models;
pub mod store;

pub use models::{ListKind, Settings, SettingsSnapshot, DEFAULT_BROWSERS};
pub use store::{get_data_dir, JsonSettingsStore, MemorySettingsStore, SettingsProvider};
