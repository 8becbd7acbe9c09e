use async_trait::async_trait;
use keymind_storage::SettingsSnapshot;
use serde::{Deserialize, Serialize};

use crate::classifier::first_match;
use crate::input::{InputInjector, Key, KeyChord, Modifier, Platform};

/// Corrective action for an irrelevant activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnforcementAction {
    /// Close the current browser tab and open a fresh one
    CloseBrowserTab { activity: String },
    /// Close the foreground application
    CloseApplication { activity: String },
}

impl EnforcementAction {
    /// Pick the action for an activity: browser-owned activities only lose
    /// their tab, anything else is closed outright
    #[must_use]
    pub fn resolve(activity_label: &str, settings: &SettingsSnapshot) -> Self {
        let activity = activity_label.to_string();
        if first_match(activity_label, &settings.browsers).is_some() {
            Self::CloseBrowserTab { activity }
        } else {
            Self::CloseApplication { activity }
        }
    }

    #[must_use]
    pub fn activity(&self) -> &str {
        match self {
            Self::CloseBrowserTab { activity } | Self::CloseApplication { activity } => activity,
        }
    }
}

/// Carries out enforcement actions
///
/// Execution is best effort and never fails: the target may already be gone
/// by the time the action lands, in which case nothing happens.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: &EnforcementAction);
}

/// Executor that turns actions into keyboard shortcuts
pub struct KeystrokeExecutor {
    injector: Box<dyn InputInjector>,
    platform: Platform,
}

impl KeystrokeExecutor {
    #[must_use]
    pub fn new(injector: Box<dyn InputInjector>, platform: Platform) -> Self {
        Self { injector, platform }
    }

    /// Shortcuts sent for an action on this executor's platform
    #[must_use]
    pub fn chords_for(&self, action: &EnforcementAction) -> Vec<KeyChord> {
        let primary = if self.platform == Platform::MacOs {
            Modifier::Command
        } else {
            Modifier::Control
        };

        match action {
            EnforcementAction::CloseBrowserTab { .. } => vec![
                KeyChord::new(&[primary], Key::Char('w')),
                KeyChord::new(&[primary], Key::Char('t')),
            ],
            EnforcementAction::CloseApplication { .. } => {
                if self.platform == Platform::MacOs {
                    vec![KeyChord::new(&[Modifier::Command], Key::Char('q'))]
                } else {
                    vec![KeyChord::new(&[Modifier::Alt], Key::F4)]
                }
            }
        }
    }
}

#[async_trait]
impl ActionExecutor for KeystrokeExecutor {
    async fn execute(&self, action: &EnforcementAction) {
        let chords = self.chords_for(action);
        if let Err(e) = self.injector.send(&chords).await {
            log::debug!("Action for '{}' had no effect: {e:#}", action.activity());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingInjector {
        sent: Arc<Mutex<Vec<KeyChord>>>,
        fail: bool,
    }

    #[async_trait]
    impl InputInjector for RecordingInjector {
        async fn send(&self, chords: &[KeyChord]) -> Result<()> {
            if self.fail {
                anyhow::bail!("no foreground window");
            }
            self.sent.lock().unwrap().extend_from_slice(chords);
            Ok(())
        }
    }

    fn browsers(names: &[&str]) -> SettingsSnapshot {
        SettingsSnapshot {
            browsers: names.iter().map(ToString::to_string).collect(),
            ..SettingsSnapshot::default()
        }
    }

    #[test]
    fn test_browser_owned_activity_closes_tab() {
        let action = EnforcementAction::resolve("YouTube - Mozilla Firefox", &browsers(&["firefox"]));
        assert_eq!(
            action,
            EnforcementAction::CloseBrowserTab {
                activity: String::from("YouTube - Mozilla Firefox")
            }
        );
    }

    #[test]
    fn test_browser_names_match_in_any_case() {
        let action = EnforcementAction::resolve("YouTube - Mozilla Firefox", &browsers(&["Firefox"]));
        assert!(matches!(action, EnforcementAction::CloseBrowserTab { .. }));
    }

    #[test]
    fn test_other_activity_closes_application() {
        let action = EnforcementAction::resolve("Steam", &browsers(&["chrome", "firefox"]));
        assert!(matches!(action, EnforcementAction::CloseApplication { .. }));
        assert_eq!(action.activity(), "Steam");
    }

    #[test]
    fn test_no_browsers_configured_closes_application() {
        let action = EnforcementAction::resolve("Reddit - Chrome", &SettingsSnapshot::default());
        assert!(matches!(action, EnforcementAction::CloseApplication { .. }));
    }

    #[test]
    fn test_chords_per_platform() {
        let tab = EnforcementAction::CloseBrowserTab {
            activity: String::from("x"),
        };
        let app = EnforcementAction::CloseApplication {
            activity: String::from("x"),
        };

        let linux = KeystrokeExecutor::new(Box::new(RecordingInjector::default()), Platform::Linux);
        let names: Vec<String> = linux.chords_for(&tab).iter().map(ToString::to_string).collect();
        assert_eq!(names, ["Ctrl+W", "Ctrl+T"]);
        assert_eq!(linux.chords_for(&app)[0].to_string(), "Alt+F4");

        let mac = KeystrokeExecutor::new(Box::new(RecordingInjector::default()), Platform::MacOs);
        let names: Vec<String> = mac.chords_for(&tab).iter().map(ToString::to_string).collect();
        assert_eq!(names, ["Cmd+W", "Cmd+T"]);
        assert_eq!(mac.chords_for(&app)[0].to_string(), "Cmd+Q");
    }

    #[tokio::test]
    async fn test_execute_sends_two_events_for_tab_close() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let injector = RecordingInjector {
            sent: sent.clone(),
            fail: false,
        };
        let executor = KeystrokeExecutor::new(Box::new(injector), Platform::Windows);

        executor
            .execute(&EnforcementAction::CloseBrowserTab {
                activity: String::from("Reddit - Chrome"),
            })
            .await;

        assert_eq!(sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_execute_swallows_injector_failure() {
        let injector = RecordingInjector {
            sent: Arc::default(),
            fail: true,
        };
        let executor = KeystrokeExecutor::new(Box::new(injector), Platform::Linux);

        // Must not panic or propagate
        executor
            .execute(&EnforcementAction::CloseApplication {
                activity: String::from("Steam"),
            })
            .await;
    }
}
