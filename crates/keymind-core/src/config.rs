use anyhow::Result;
use keymind_ai::AiConfig;
use std::path::PathBuf;
use std::time::Duration;

pub use keymind_storage::get_data_dir;

const DEFAULT_POLL_INTERVAL_MS: u64 = 200;
const DEFAULT_DEBOUNCE_SECS: u64 = 5;
const DEFAULT_CACHE_SIZE: usize = 128;

/// Timing and AI settings for the enforcement loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcementConfig {
    /// How often the foreground window is sampled
    pub poll_interval: Duration,
    /// Minimum time between two classification attempts
    pub debounce: Duration,
    /// Provider settings; `ai.timeout` also bounds each classification call
    pub ai: AiConfig,
    /// Number of AI verdicts kept per (task, activity)
    pub cache_size: usize,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            debounce: Duration::from_secs(DEFAULT_DEBOUNCE_SECS),
            ai: AiConfig::default(),
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

/// IPC socket of the running daemon
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn socket_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("keymind.sock"))
}

/// PID file of the background daemon
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn pid_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("keymind.pid"))
}

/// Log file written by the background daemon
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn log_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("keymind.log"))
}
