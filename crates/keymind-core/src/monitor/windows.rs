use async_trait::async_trait;
use ::windows::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
};

use super::{process_name, ActivitySample, WindowObserver};

pub struct WindowsObserver;

impl WindowsObserver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn query() -> Option<ActivitySample> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.0 == 0 {
            return None;
        }

        let len = unsafe { GetWindowTextLengthW(hwnd) };
        let title = if len > 0 {
            let mut buffer = vec![0u16; usize::try_from(len).ok()? + 1];
            let copied = unsafe { GetWindowTextW(hwnd, &mut buffer) };
            let copied = usize::try_from(copied).unwrap_or(0);
            Some(String::from_utf16_lossy(&buffer[..copied]))
        } else {
            None
        };

        let mut pid = 0u32;
        unsafe {
            GetWindowThreadProcessId(hwnd, Some(&mut pid));
        }
        let process = (pid != 0).then(|| process_name(pid)).flatten();

        Some(ActivitySample::new(process, title))
    }
}

impl Default for WindowsObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowObserver for WindowsObserver {
    async fn sample(&self) -> ActivitySample {
        Self::query().unwrap_or_else(|| {
            log::debug!("No foreground window");
            ActivitySample::empty()
        })
    }
}
