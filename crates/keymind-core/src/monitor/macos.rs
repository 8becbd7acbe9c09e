use async_trait::async_trait;
use cocoa::base::{id, nil};
use cocoa::foundation::NSAutoreleasePool;
use objc::{class, msg_send, sel, sel_impl};
use tokio::process::Command;

use super::{ActivitySample, WindowObserver};

const FRONT_WINDOW_SCRIPT: &str = r#"
    tell application "System Events"
        set frontProc to first application process whose frontmost is true
        set appName to name of frontProc
        try
            set winTitle to name of first window of frontProc
        on error
            set winTitle to ""
        end try
        return appName & "|" & winTitle
    end tell
"#;

pub struct MacOSObserver;

impl MacOSObserver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse the `appName|winTitle` line printed by the AppleScript query
    fn parse_script_output(output: &str) -> Option<ActivitySample> {
        let (app_name, title) = output.trim().split_once('|')?;
        let non_empty = |s: &str| Some(s.to_string()).filter(|s| !s.is_empty());
        Some(ActivitySample::new(non_empty(app_name), non_empty(title)))
    }

    /// Frontmost application name from `NSWorkspace`
    fn frontmost_app_name() -> Option<String> {
        unsafe {
            let _pool = NSAutoreleasePool::new(nil);

            let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
            let frontmost_app: id = msg_send![workspace, frontmostApplication];
            if frontmost_app == nil {
                return None;
            }

            let app_name: id = msg_send![frontmost_app, localizedName];
            if app_name.is_null() {
                return None;
            }
            let bytes: *const u8 = msg_send![app_name, UTF8String];
            let len: usize = msg_send![app_name, lengthOfBytesUsingEncoding: 4usize];
            utf8_buffer_to_string(bytes, len)
        }
    }
}

/// Copy `len` bytes of an `NSString`'s UTF-8 buffer; a null buffer yields `None`
fn utf8_buffer_to_string(bytes: *const u8, len: usize) -> Option<String> {
    if bytes.is_null() {
        return None;
    }
    let slice = unsafe { std::slice::from_raw_parts(bytes, len) };
    Some(String::from_utf8_lossy(slice).into_owned())
}

impl Default for MacOSObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowObserver for MacOSObserver {
    async fn sample(&self) -> ActivitySample {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(FRONT_WINDOW_SCRIPT)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let text = String::from_utf8_lossy(&output.stdout);
                if let Some(sample) = Self::parse_script_output(&text) {
                    return sample;
                }
            }
            Ok(output) => log::debug!(
                "osascript exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => log::debug!("Failed to run osascript: {e}"),
        }

        // Fallback to Cocoa API if AppleScript fails (no window title available)
        ActivitySample::new(Self::frontmost_app_name(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_utf8_buffer_is_no_name() {
        assert_eq!(utf8_buffer_to_string(std::ptr::null(), 12), None);

        let name = "Safari";
        assert_eq!(
            utf8_buffer_to_string(name.as_ptr(), name.len()).as_deref(),
            Some("Safari")
        );
    }

    #[test]
    fn test_parse_script_output_with_title() {
        let sample = MacOSObserver::parse_script_output("Safari|Rust Docs\n").unwrap();
        assert_eq!(sample.application_name.as_deref(), Some("Safari"));
        assert_eq!(sample.window_title.as_deref(), Some("Rust Docs"));
        assert_eq!(sample.label().as_deref(), Some("Rust Docs - Safari"));
    }

    #[test]
    fn test_parse_script_output_without_title() {
        let sample = MacOSObserver::parse_script_output("Finder|").unwrap();
        assert_eq!(sample.window_title, None);
        assert_eq!(sample.label().as_deref(), Some("Finder"));
    }

    #[test]
    fn test_parse_script_output_rejects_garbage() {
        assert!(MacOSObserver::parse_script_output("no separator").is_none());
    }
}
