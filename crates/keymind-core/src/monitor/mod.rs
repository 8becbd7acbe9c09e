use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "windows")]
pub mod windows;

/// Foreground window observed on one poll tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySample {
    pub application_name: Option<String>,
    pub window_title: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl ActivitySample {
    #[must_use]
    pub fn new(application_name: Option<String>, window_title: Option<String>) -> Self {
        Self {
            application_name,
            window_title,
            observed_at: Utc::now(),
        }
    }

    /// Sample used whenever the platform could not be queried
    #[must_use]
    pub fn empty() -> Self {
        Self::new(None, None)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.label().is_none()
    }

    /// Activity label shown to the user and classified
    #[must_use]
    pub fn label(&self) -> Option<String> {
        compose_label(self.window_title.as_deref(), self.application_name.as_deref())
    }
}

/// Combine a window title with its owning process name
///
/// The process name is appended as `"<title> - <process>"` unless the title
/// already mentions it (case-insensitive). Without a title the process name
/// is used on its own.
#[must_use]
pub fn compose_label(title: Option<&str>, process: Option<&str>) -> Option<String> {
    let title = title.map(str::trim).filter(|t| !t.is_empty());
    let process = process.map(str::trim).filter(|p| !p.is_empty());

    match (title, process) {
        (None, None) => None,
        (None, Some(process)) => Some(process.to_string()),
        (Some(title), None) => Some(title.to_string()),
        (Some(title), Some(process)) => {
            if title.to_lowercase().contains(&process.to_lowercase()) {
                Some(title.to_string())
            } else {
                Some(format!("{title} - {process}"))
            }
        }
    }
}

/// Source of foreground window samples
///
/// Implementations never fail: any platform error is logged and reported as
/// an empty sample, which the loop treats as "no change".
#[async_trait]
pub trait WindowObserver: Send + Sync {
    async fn sample(&self) -> ActivitySample;
}

/// Observer for platforms without window inspection support
pub struct NullObserver;

#[async_trait]
impl WindowObserver for NullObserver {
    async fn sample(&self) -> ActivitySample {
        ActivitySample::empty()
    }
}

/// Create platform-specific observer
#[must_use]
pub fn create_observer() -> Box<dyn WindowObserver> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::MacOSObserver::new())
    }

    #[cfg(target_os = "linux")]
    {
        Box::new(linux::X11Observer::new())
    }

    #[cfg(target_os = "windows")]
    {
        Box::new(windows::WindowsObserver::new())
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        log::warn!("Window observation is not supported on this platform");
        Box::new(NullObserver)
    }
}

/// Resolve a process id to its executable name
#[cfg(any(target_os = "linux", target_os = "windows"))]
fn process_name(pid: u32) -> Option<String> {
    let pid = sysinfo::Pid::from_u32(pid);
    let mut sys = sysinfo::System::new();
    if !sys.refresh_process(pid) {
        return None;
    }
    sys.process(pid).map(|process| process.name().to_string())
}
