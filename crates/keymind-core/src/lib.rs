pub mod ai_classifier;
pub mod classifier;
pub mod config;
pub mod daemon;
pub mod enforcement;
pub mod executor;
pub mod input;
#[cfg(unix)]
pub mod ipc;
pub mod monitor;

pub use classifier::{RelevanceClassifier, RelevanceVerdict, UnknownReason};
pub use config::EnforcementConfig;
pub use daemon::Daemon;
pub use enforcement::{DisplaySink, EnforcementLoop, LoopHandle, LoopStatus, Task};
pub use executor::{ActionExecutor, EnforcementAction, KeystrokeExecutor};
pub use monitor::{compose_label, ActivitySample, WindowObserver};
