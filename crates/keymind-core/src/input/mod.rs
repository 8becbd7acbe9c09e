use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "windows")]
pub mod windows;

/// Desktop platform, which decides the shortcuts used for corrective actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
    Other,
}

impl Platform {
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Control,
    Alt,
    /// Command on macOS, the Super/Windows key elsewhere
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A letter key, always given in lowercase
    Char(char),
    F4,
}

/// Modifiers held down while one key is pressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub modifiers: Vec<Modifier>,
    pub key: Key,
}

impl KeyChord {
    #[must_use]
    pub fn new(modifiers: &[Modifier], key: Key) -> Self {
        Self {
            modifiers: modifiers.to_vec(),
            key,
        }
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            let name = match modifier {
                Modifier::Control => "Ctrl",
                Modifier::Alt => "Alt",
                Modifier::Command => "Cmd",
            };
            write!(f, "{name}+")?;
        }
        match self.key {
            Key::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Key::F4 => write!(f, "F4"),
        }
    }
}

/// Sink for synthetic keyboard input
///
/// Delivery is best effort: a successful return only means the events were
/// handed to the OS, not that the target window reacted.
#[async_trait]
pub trait InputInjector: Send + Sync {
    /// Send the chords in order
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refused the events
    async fn send(&self, chords: &[KeyChord]) -> Result<()>;
}

/// Injector for platforms without input injection support
pub struct NullInjector;

#[async_trait]
impl InputInjector for NullInjector {
    async fn send(&self, chords: &[KeyChord]) -> Result<()> {
        log::debug!("Input injection unsupported, dropping {} chord(s)", chords.len());
        Ok(())
    }
}

/// Create platform-specific injector
#[must_use]
pub fn create_injector() -> Box<dyn InputInjector> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::AppleScriptInjector)
    }

    #[cfg(target_os = "linux")]
    {
        Box::new(linux::XTestInjector)
    }

    #[cfg(target_os = "windows")]
    {
        Box::new(windows::SendInputInjector)
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        log::warn!("Input injection is not supported on this platform");
        Box::new(NullInjector)
    }
}
