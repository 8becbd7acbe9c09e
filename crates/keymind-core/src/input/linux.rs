use anyhow::Result;
use async_trait::async_trait;
use x11::{keysym, xlib, xtest};

use super::{InputInjector, Key, KeyChord, Modifier};
use crate::monitor::linux::XDisplay;

/// Sends fake key events through the XTest extension
pub struct XTestInjector;

fn keysym_for_modifier(modifier: Modifier) -> xlib::KeySym {
    let sym = match modifier {
        Modifier::Control => keysym::XK_Control_L,
        Modifier::Alt => keysym::XK_Alt_L,
        Modifier::Command => keysym::XK_Super_L,
    };
    xlib::KeySym::from(sym)
}

fn keysym_for_key(key: Key) -> xlib::KeySym {
    match key {
        // Latin-1 keysyms equal their code point
        Key::Char(c) => xlib::KeySym::from(u32::from(c.to_ascii_lowercase())),
        Key::F4 => xlib::KeySym::from(keysym::XK_F4),
    }
}

impl XTestInjector {
    fn press(display: &XDisplay, sym: xlib::KeySym, down: bool) -> Result<()> {
        let code = unsafe { xlib::XKeysymToKeycode(display.raw(), sym) };
        if code == 0 {
            anyhow::bail!("No keycode mapped for keysym {sym:#x}");
        }
        let is_press = if down { xlib::True } else { xlib::False };
        let ok = unsafe { xtest::XTestFakeKeyEvent(display.raw(), u32::from(code), is_press, 0) };
        if ok == 0 {
            anyhow::bail!("XTest rejected key event for keysym {sym:#x}");
        }
        Ok(())
    }

    fn send_chord(display: &XDisplay, chord: &KeyChord) -> Result<()> {
        for modifier in &chord.modifiers {
            Self::press(display, keysym_for_modifier(*modifier), true)?;
        }
        let key = keysym_for_key(chord.key);
        Self::press(display, key, true)?;
        Self::press(display, key, false)?;
        for modifier in chord.modifiers.iter().rev() {
            Self::press(display, keysym_for_modifier(*modifier), false)?;
        }
        Ok(())
    }

    fn send_all(chords: &[KeyChord]) -> Result<()> {
        let display = XDisplay::open().ok_or_else(|| anyhow::anyhow!("Cannot open X display"))?;
        let result = chords
            .iter()
            .try_for_each(|chord| Self::send_chord(&display, chord));
        unsafe {
            xlib::XFlush(display.raw());
        }
        result
    }
}

#[async_trait]
impl InputInjector for XTestInjector {
    async fn send(&self, chords: &[KeyChord]) -> Result<()> {
        Self::send_all(chords)
    }
}
