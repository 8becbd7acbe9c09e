/// Foreground focus session and one-shot window inspection
use anyhow::Result;
use keymind_core::{monitor::create_observer, Daemon, DisplaySink, EnforcementConfig};
use keymind_storage::{JsonSettingsStore, SettingsProvider};
use std::{sync::Arc, time::Duration};

/// Command-line overrides for [`EnforcementConfig`]
#[derive(Debug, Default)]
pub struct Overrides {
    pub poll_ms: Option<u64>,
    pub debounce_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub model: Option<String>,
}

impl Overrides {
    pub fn apply(&self, mut config: EnforcementConfig) -> EnforcementConfig {
        if let Some(ms) = self.poll_ms {
            config.poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(secs) = self.debounce_secs {
            config.debounce = Duration::from_secs(secs);
        }
        if let Some(secs) = self.timeout_secs {
            config.ai.timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(model) = &self.model {
            config.ai.model.clone_from(model);
        }
        config
    }
}

/// Prints the active window to stdout whenever it changes
struct ConsoleDisplay;

impl DisplaySink for ConsoleDisplay {
    fn show(&mut self, label: &str) {
        println!("Active window: {label}");
    }
}

pub async fn run_focus(task: String, overrides: &Overrides) -> Result<()> {
    if task.trim().is_empty() {
        anyhow::bail!("Task description must not be empty");
    }

    #[cfg(unix)]
    if let Some(pid) = super::daemon::running_pid()? {
        anyhow::bail!(
            "A background daemon is already running (PID: {pid}). Use `keymind focus` instead."
        );
    }

    let config = overrides.apply(EnforcementConfig::default());
    let store = JsonSettingsStore::open_default()?;
    if store.load().api_key().is_none() {
        log::warn!(
            "No API key configured; only the allow and ban lists will be applied. \
             Set one with `keymind config set api_key <KEY>`."
        );
    }

    let daemon = Daemon::new(&config, Arc::new(store), Box::new(ConsoleDisplay))?;
    daemon.handle().start(task.trim())?;
    println!("Focus session started. Press Ctrl-C to stop.");
    daemon.run_with_signals().await
}

pub async fn whoami() -> Result<()> {
    let sample = create_observer().sample().await;
    match sample.label() {
        Some(label) => println!("{label}"),
        None => println!("No foreground window detected"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_only_given_values() {
        let overrides = Overrides {
            debounce_secs: Some(10),
            model: Some(String::from("gemini-1.5-pro")),
            ..Overrides::default()
        };

        let config = overrides.apply(EnforcementConfig::default());

        assert_eq!(config.debounce, Duration::from_secs(10));
        assert_eq!(config.ai.model, "gemini-1.5-pro");
        assert_eq!(config.poll_interval, Duration::from_millis(200));
        assert_eq!(config.ai.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let overrides = Overrides {
            poll_ms: Some(0),
            ..Overrides::default()
        };
        let config = overrides.apply(EnforcementConfig::default());
        assert_eq!(config.poll_interval, Duration::from_millis(1));
    }
}
