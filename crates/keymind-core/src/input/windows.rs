use anyhow::Result;
use async_trait::async_trait;
use ::windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    VIRTUAL_KEY, VK_CONTROL, VK_F4, VK_LWIN, VK_MENU,
};

use super::{InputInjector, Key, KeyChord, Modifier};

/// Sends keystrokes with `SendInput`
pub struct SendInputInjector;

fn virtual_key_for_modifier(modifier: Modifier) -> VIRTUAL_KEY {
    match modifier {
        Modifier::Control => VK_CONTROL,
        Modifier::Alt => VK_MENU,
        Modifier::Command => VK_LWIN,
    }
}

fn virtual_key_for_key(key: Key) -> VIRTUAL_KEY {
    match key {
        // Letter virtual-key codes equal the uppercase ASCII code
        Key::Char(c) => VIRTUAL_KEY(u16::try_from(u32::from(c.to_ascii_uppercase())).unwrap_or(0)),
        Key::F4 => VK_F4,
    }
}

fn key_event(key: VIRTUAL_KEY, up: bool) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: key,
                wScan: 0,
                dwFlags: if up { KEYEVENTF_KEYUP } else { KEYBD_EVENT_FLAGS(0) },
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn chord_events(chord: &KeyChord) -> Vec<INPUT> {
    let mut events = Vec::with_capacity(chord.modifiers.len() * 2 + 2);
    events.extend(
        chord
            .modifiers
            .iter()
            .map(|m| key_event(virtual_key_for_modifier(*m), false)),
    );
    let key = virtual_key_for_key(chord.key);
    events.push(key_event(key, false));
    events.push(key_event(key, true));
    events.extend(
        chord
            .modifiers
            .iter()
            .rev()
            .map(|m| key_event(virtual_key_for_modifier(*m), true)),
    );
    events
}

#[async_trait]
impl InputInjector for SendInputInjector {
    async fn send(&self, chords: &[KeyChord]) -> Result<()> {
        let size = i32::try_from(std::mem::size_of::<INPUT>())?;
        for chord in chords {
            let events = chord_events(chord);
            let sent = unsafe { SendInput(&events, size) };
            if usize::try_from(sent).unwrap_or(0) != events.len() {
                anyhow::bail!("SendInput delivered {sent} of {} events for {chord}", events.len());
            }
        }
        Ok(())
    }
}
