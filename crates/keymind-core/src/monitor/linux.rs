use async_trait::async_trait;
use std::ffi::CString;
use std::os::raw::{c_int, c_uchar, c_ulong, c_void};
use std::ptr;
use std::sync::Once;
use x11::xlib;

use super::{process_name, ActivitySample, WindowObserver};

/// Longest property value read, in 32-bit units
const MAX_PROPERTY_LONGS: i64 = 1024;

static INSTALL_ERROR_HANDLER: Once = Once::new();

/// X errors (e.g. a window closed between two queries) must not abort the process
unsafe extern "C" fn ignore_x_error(
    _display: *mut xlib::Display,
    _event: *mut xlib::XErrorEvent,
) -> c_int {
    0
}

/// Owned connection to the X server, closed on drop
pub(crate) struct XDisplay(*mut xlib::Display);

impl XDisplay {
    pub(crate) fn open() -> Option<Self> {
        INSTALL_ERROR_HANDLER.call_once(|| unsafe {
            xlib::XSetErrorHandler(Some(ignore_x_error));
        });
        let display = unsafe { xlib::XOpenDisplay(ptr::null()) };
        if display.is_null() {
            None
        } else {
            Some(Self(display))
        }
    }

    pub(crate) fn raw(&self) -> *mut xlib::Display {
        self.0
    }

    fn atom(&self, name: &str) -> Option<xlib::Atom> {
        let name = CString::new(name).ok()?;
        let atom = unsafe { xlib::XInternAtom(self.0, name.as_ptr(), xlib::True) };
        (atom != 0).then_some(atom)
    }

    /// Read a window property and hand its raw value to `read`
    fn with_property<T>(
        &self,
        window: xlib::Window,
        property: xlib::Atom,
        read: impl FnOnce(c_int, usize, *const c_uchar) -> Option<T>,
    ) -> Option<T> {
        let mut actual_type: xlib::Atom = 0;
        let mut actual_format: c_int = 0;
        let mut nitems: c_ulong = 0;
        let mut bytes_after: c_ulong = 0;
        let mut value: *mut c_uchar = ptr::null_mut();

        let status = unsafe {
            xlib::XGetWindowProperty(
                self.0,
                window,
                property,
                0,
                MAX_PROPERTY_LONGS,
                xlib::False,
                xlib::AnyPropertyType as xlib::Atom,
                &mut actual_type,
                &mut actual_format,
                &mut nitems,
                &mut bytes_after,
                &mut value,
            )
        };
        if status != 0 || value.is_null() {
            return None;
        }

        let result = usize::try_from(nitems)
            .ok()
            .filter(|n| *n > 0)
            .and_then(|n| read(actual_format, n, value));
        unsafe {
            xlib::XFree(value.cast::<c_void>());
        }
        result
    }

    fn window_property(&self, window: xlib::Window, name: &str) -> Option<c_ulong> {
        let atom = self.atom(name)?;
        // Format-32 properties are returned as an array of C longs
        self.with_property(window, atom, |format, _, value| {
            (format == 32).then(|| unsafe { *value.cast::<c_ulong>() })
        })
    }

    fn text_property(&self, window: xlib::Window, name: &str) -> Option<String> {
        let atom = self.atom(name)?;
        self.with_property(window, atom, |format, len, value| {
            if format != 8 {
                return None;
            }
            let bytes = unsafe { std::slice::from_raw_parts(value, len) };
            Some(String::from_utf8_lossy(bytes).into_owned())
        })
    }
}

impl Drop for XDisplay {
    fn drop(&mut self) {
        unsafe {
            xlib::XCloseDisplay(self.0);
        }
    }
}

/// Observer for X11 sessions using the EWMH `_NET_ACTIVE_WINDOW` hint
pub struct X11Observer;

impl X11Observer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn query() -> Option<ActivitySample> {
        let display = XDisplay::open()?;
        let root = unsafe { xlib::XDefaultRootWindow(display.raw()) };

        let window = display.window_property(root, "_NET_ACTIVE_WINDOW")?;
        if window == 0 {
            return None;
        }

        let title = display
            .text_property(window, "_NET_WM_NAME")
            .or_else(|| display.text_property(window, "WM_NAME"));
        let process = display
            .window_property(window, "_NET_WM_PID")
            .and_then(|pid| u32::try_from(pid).ok())
            .and_then(process_name);

        Some(ActivitySample::new(process, title))
    }
}

impl Default for X11Observer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowObserver for X11Observer {
    async fn sample(&self) -> ActivitySample {
        Self::query().unwrap_or_else(|| {
            log::debug!("No active X11 window (no display or no EWMH support)");
            ActivitySample::empty()
        })
    }
}
