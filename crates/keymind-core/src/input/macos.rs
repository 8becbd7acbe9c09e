use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt::Write;
use tokio::process::Command;

use super::{InputInjector, Key, KeyChord, Modifier};

/// macOS virtual key code for F4
const KEY_CODE_F4: u16 = 118;

/// Sends keystrokes through System Events (requires Accessibility permission)
pub struct AppleScriptInjector;

/// Render chords as a System Events script
fn build_script(chords: &[KeyChord]) -> String {
    let mut script = String::from("tell application \"System Events\"\n");
    for (i, chord) in chords.iter().enumerate() {
        if i > 0 {
            script.push_str("    delay 0.1\n");
        }
        let modifiers: Vec<&str> = chord
            .modifiers
            .iter()
            .map(|m| match m {
                Modifier::Control => "control down",
                Modifier::Alt => "option down",
                Modifier::Command => "command down",
            })
            .collect();
        let using = if modifiers.is_empty() {
            String::new()
        } else {
            format!(" using {{{}}}", modifiers.join(", "))
        };
        let _ = match chord.key {
            Key::Char(c) => writeln!(script, "    keystroke \"{c}\"{using}"),
            Key::F4 => writeln!(script, "    key code {KEY_CODE_F4}{using}"),
        };
    }
    script.push_str("end tell\n");
    script
}

#[async_trait]
impl InputInjector for AppleScriptInjector {
    async fn send(&self, chords: &[KeyChord]) -> Result<()> {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(build_script(chords))
            .output()
            .await
            .context("Failed to run osascript")?;

        if !output.status.success() {
            anyhow::bail!(
                "osascript failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_for_tab_close() {
        let script = build_script(&[
            KeyChord::new(&[Modifier::Command], Key::Char('w')),
            KeyChord::new(&[Modifier::Command], Key::Char('t')),
        ]);
        assert!(script.contains("keystroke \"w\" using {command down}"));
        assert!(script.contains("delay 0.1"));
        assert!(script.ends_with("end tell\n"));
    }

    #[test]
    fn test_script_for_function_key() {
        let script = build_script(&[KeyChord::new(&[Modifier::Alt], Key::F4)]);
        assert!(script.contains("key code 118 using {option down}"));
    }
}
