
use anyhow::Result;
use chrono::{DateTime, Utc};
use keymind_storage::SettingsProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::classifier::{RelevanceClassifier, RelevanceVerdict};
use crate::executor::{ActionExecutor, EnforcementAction};
use crate::monitor::WindowObserver;

/// The task the user declared for the current session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub description: String,
    pub started_at: DateTime<Utc>,
}

impl Task {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            started_at: Utc::now(),
        }
    }
}

/// State of a running focus session
#[derive(Debug, Clone)]
pub struct Session {
    pub task: Task,
    /// Last label that was classified
    pub last_seen_activity: Option<String>,
    /// When the last classification ran; `None` until the first one
    pub last_check_time: Option<Instant>,
}

impl Session {
    #[must_use]
    pub fn new(task: Task) -> Self {
        Self {
            task,
            last_seen_activity: None,
            last_check_time: None,
        }
    }

    /// Whether `label` is due for classification at `now`
    #[must_use]
    pub fn should_check(&self, label: &str, now: Instant, debounce: Duration) -> bool {
        if self.last_seen_activity.as_deref() == Some(label) {
            return false;
        }
        self.last_check_time
            .map_or(true, |last| now.saturating_duration_since(last) >= debounce)
    }

    /// Record a classification, whatever its verdict
    pub fn record_check(&mut self, label: &str, now: Instant) {
        self.last_seen_activity = Some(label.to_string());
        self.last_check_time = Some(now);
    }
}

#[derive(Debug)]
enum LoopState {
    Stopped,
    Running(Session),
}

/// Receives the activity label whenever it changes
pub trait DisplaySink: Send {
    fn show(&mut self, label: &str);
}

/// Display sink that writes label changes to the log
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn show(&mut self, label: &str) {
        log::info!("Active window: {label}");
    }
}

/// Session commands, applied between ticks
#[derive(Debug)]
pub enum Control {
    Start(Task),
    Stop,
    Shutdown,
}

/// Externally visible loop state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopStatus {
    pub running: bool,
    pub task: Option<String>,
    pub session_started: Option<DateTime<Utc>>,
    pub current_activity: Option<String>,
    pub actions_taken: u64,
}

impl LoopStatus {
    /// Seconds since the session started, zero when stopped
    #[must_use]
    pub fn session_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.session_started
            .map(|start| u64::try_from(now.signed_duration_since(start).num_seconds()).unwrap_or(0))
            .unwrap_or(0)
    }
}

/// What one tick observed and did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Composed label, `None` for an empty sample
    pub label: Option<String>,
    /// Set when the label differed from the one displayed before
    pub display_changed: bool,
    /// Set when a classification ran
    pub verdict: Option<RelevanceVerdict>,
    /// Set when an action was dispatched
    pub action: Option<EnforcementAction>,
}

/// Cloneable handle for controlling a running [`EnforcementLoop`]
#[derive(Debug, Clone)]
pub struct LoopHandle {
    controls: mpsc::UnboundedSender<Control>,
    status: watch::Receiver<LoopStatus>,
}

impl LoopHandle {
    /// Start a focus session for `description`, replacing any current one
    ///
    /// # Errors
    ///
    /// Returns an error if the loop has already shut down
    pub fn start(&self, description: impl Into<String>) -> Result<()> {
        self.send(Control::Start(Task::new(description)))
    }

    /// Stop the current session
    ///
    /// # Errors
    ///
    /// Returns an error if the loop has already shut down
    pub fn stop(&self) -> Result<()> {
        self.send(Control::Stop)
    }

    /// End the loop after the current tick
    ///
    /// # Errors
    ///
    /// Returns an error if the loop has already shut down
    pub fn shutdown(&self) -> Result<()> {
        self.send(Control::Shutdown)
    }

    #[must_use]
    pub fn status(&self) -> LoopStatus {
        self.status.borrow().clone()
    }

    fn send(&self, control: Control) -> Result<()> {
        self.controls
            .send(control)
            .map_err(|_| anyhow::anyhow!("Enforcement loop is not running"))
    }
}

/// Collaborators injected into the loop
pub struct LoopParts {
    pub observer: Box<dyn WindowObserver>,
    pub classifier: RelevanceClassifier,
    pub executor: Arc<dyn ActionExecutor>,
    pub settings: Arc<dyn SettingsProvider>,
    pub display: Box<dyn DisplaySink>,
}

/// Polling state machine: observe, debounce, classify, act
pub struct EnforcementLoop {
    observer: Box<dyn WindowObserver>,
    classifier: RelevanceClassifier,
    executor: Arc<dyn ActionExecutor>,
    settings: Arc<dyn SettingsProvider>,
    display: Box<dyn DisplaySink>,
    debounce: Duration,
    state: LoopState,
    displayed: Option<String>,
    actions_taken: u64,
    controls: mpsc::UnboundedReceiver<Control>,
    status: watch::Sender<LoopStatus>,
}

impl EnforcementLoop {
    /// Create a stopped loop and the handle controlling it
    #[must_use]
    pub fn new(parts: LoopParts, debounce: Duration) -> (Self, LoopHandle) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(LoopStatus::default());

        let enforcement = Self {
            observer: parts.observer,
            classifier: parts.classifier,
            executor: parts.executor,
            settings: parts.settings,
            display: parts.display,
            debounce,
            state: LoopState::Stopped,
            displayed: None,
            actions_taken: 0,
            controls: control_rx,
            status: status_tx,
        };
        let handle = LoopHandle {
            controls: control_tx,
            status: status_rx,
        };
        (enforcement, handle)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running(_))
    }

    pub fn start(&mut self, task: Task) {
        log::info!("Focus session started: {}", task.description);
        self.state = LoopState::Running(Session::new(task));
        self.publish_status();
    }

    pub fn stop(&mut self) {
        if let LoopState::Running(session) = &self.state {
            log::info!("Focus session stopped: {}", session.task.description);
        }
        self.state = LoopState::Stopped;
        self.publish_status();
    }

    /// Apply one control. Returns `false` when the loop should exit.
    fn apply(&mut self, control: Control) -> bool {
        match control {
            Control::Start(task) => self.start(task),
            Control::Stop => self.stop(),
            Control::Shutdown => return false,
        }
        true
    }

    /// Apply every queued control. Returns `false` when the loop should exit.
    pub fn apply_pending_controls(&mut self) -> bool {
        while let Ok(control) = self.controls.try_recv() {
            if !self.apply(control) {
                return false;
            }
        }
        true
    }

    /// Run the tick handler for `now`
    pub async fn tick(&mut self, now: Instant) -> TickReport {
        let sample = self.observer.sample().await;
        let Some(label) = sample.label() else {
            // Nothing observed is not the same as the activity closing
            return TickReport::default();
        };

        let mut report = TickReport {
            label: Some(label.clone()),
            ..TickReport::default()
        };

        if self.displayed.as_deref() != Some(label.as_str()) {
            self.display.show(&label);
            self.displayed = Some(label.clone());
            report.display_changed = true;
        }

        if let LoopState::Running(session) = &mut self.state {
            if session.should_check(&label, now, self.debounce) {
                let settings = self.settings.load();
                let verdict = self
                    .classifier
                    .classify(&session.task, &label, &settings)
                    .await;
                session.record_check(&label, now);

                if verdict.triggers_action() {
                    let action = EnforcementAction::resolve(&label, &settings);
                    log::info!("'{label}' is not relevant to '{}': {action:?}", session.task.description);
                    self.executor.execute(&action).await;
                    self.actions_taken += 1;
                    report.action = Some(action);
                }
                report.verdict = Some(verdict);
            }
        }

        if report.display_changed || report.action.is_some() {
            self.publish_status();
        }
        report
    }

    /// Apply queued controls, then tick. Returns `None` once shut down.
    pub async fn step(&mut self, now: Instant) -> Option<TickReport> {
        if !self.apply_pending_controls() {
            return None;
        }
        Some(self.tick(now).await)
    }

    /// Drive the loop every `poll_interval` until shut down
    ///
    /// Ticks never overlap: the interval only rearms after a tick, including
    /// any classification call, has finished. Controls that arrive meanwhile
    /// are applied before the next tick.
    pub async fn run(mut self, poll_interval: Duration) {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!("Enforcement loop started (poll every {poll_interval:?})");

        loop {
            tokio::select! {
                biased;
                control = self.controls.recv() => {
                    let keep_running = control.is_some_and(|control| self.apply(control));
                    if !keep_running {
                        break;
                    }
                }
                instant = interval.tick() => {
                    self.tick(instant.into_std()).await;
                }
            }
        }

        self.stop();
        log::info!("Enforcement loop shut down");
    }

    fn publish_status(&self) {
        let (task, session_started) = match &self.state {
            LoopState::Running(session) => (
                Some(session.task.description.clone()),
                Some(session.task.started_at),
            ),
            LoopState::Stopped => (None, None),
        };
        self.status.send_replace(LoopStatus {
            running: self.is_running(),
            task,
            session_started,
            current_activity: self.displayed.clone(),
            actions_taken: self.actions_taken,
        });
    }
}
