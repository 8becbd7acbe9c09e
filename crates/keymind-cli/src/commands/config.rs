/// Configuration management command handlers
use anyhow::Result;
use keymind_storage::{ListKind, Settings, SettingsProvider};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct BrowserRow {
    browser: String,
    enabled: bool,
}

#[derive(Tabled)]
struct EntryRow {
    list: &'static str,
    entry: String,
}

pub fn handle_config_get(store: &dyn SettingsProvider, key: &str) -> Result<()> {
    let value = get_config_value(&store.settings(), key)?;
    match value {
        Some(v) => println!("{key} = {v}"),
        None => println!("{key} is not set"),
    }
    Ok(())
}

pub fn handle_config_set(store: &dyn SettingsProvider, key: &str, value: &str) -> Result<()> {
    let mut settings = store.try_settings()?;
    set_config_value(&mut settings, key, value)?;
    store.save(&settings)?;
    println!("Set {key} = {}", display_value(key, value));
    Ok(())
}

pub fn handle_config_list(store: &dyn SettingsProvider, json: bool) -> Result<()> {
    let settings = store.settings();

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    println!("Configuration:");
    println!("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}");
    println!(
        "\n  api_key = {}",
        if settings.api_key.trim().is_empty() {
            String::from("(not set)")
        } else {
            mask(&settings.api_key)
        }
    );

    let browsers: Vec<BrowserRow> = settings
        .web_browsers
        .iter()
        .map(|(browser, enabled)| BrowserRow {
            browser: browser.clone(),
            enabled: *enabled,
        })
        .collect();
    println!("\n{}", Table::new(browsers));

    let entries: Vec<EntryRow> = [ListKind::Allowed, ListKind::Banned]
        .into_iter()
        .flat_map(|kind| {
            settings.list(kind).iter().map(move |entry| EntryRow {
                list: kind.as_str(),
                entry: entry.clone(),
            })
        })
        .collect();
    if entries.is_empty() {
        println!("\nNo allowed or banned entries. Add some with `keymind allow add` / `keymind ban add`.");
    } else {
        println!("\n{}", Table::new(entries));
    }

    Ok(())
}

pub fn handle_list_add(store: &dyn SettingsProvider, kind: ListKind, entry: &str) -> Result<()> {
    let mut settings = store.try_settings()?;
    if settings.add_entry(kind, entry) {
        store.save(&settings)?;
        println!("Added '{}' to {}", entry.trim(), kind.as_str());
    } else {
        println!("'{}' is blank or already {}", entry.trim(), kind.as_str());
    }
    Ok(())
}

pub fn handle_list_remove(store: &dyn SettingsProvider, kind: ListKind, entry: &str) -> Result<()> {
    let mut settings = store.try_settings()?;
    if settings.remove_entry(kind, entry) {
        store.save(&settings)?;
        println!("Removed '{}' from {}", entry.trim(), kind.as_str());
    } else {
        println!("'{}' is not {}", entry.trim(), kind.as_str());
    }
    Ok(())
}

pub fn handle_browser(store: &dyn SettingsProvider, name: &str, enabled: bool) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Browser name must not be empty");
    }
    let mut settings = store.try_settings()?;
    settings.set_browser(name, enabled);
    store.save(&settings)?;
    println!(
        "{} browser '{}'",
        if enabled { "Enabled" } else { "Disabled" },
        name.to_lowercase()
    );
    Ok(())
}

fn get_config_value(settings: &Settings, key: &str) -> Result<Option<String>> {
    match key.split_once('.') {
        None if key == "api_key" => Ok(Some(settings.api_key.clone())
            .filter(|v| !v.trim().is_empty())
            .map(|v| mask(&v))),
        Some(("browser", name)) => Ok(settings
            .web_browsers
            .get(&name.trim().to_lowercase())
            .map(ToString::to_string)),
        _ => anyhow::bail!("Unknown key '{key}'. Use: api_key or browser.<name>"),
    }
}

fn set_config_value(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    match key.split_once('.') {
        None if key == "api_key" => settings.api_key = value.trim().to_string(),
        Some(("browser", name)) if !name.trim().is_empty() => {
            let enabled = value
                .trim()
                .parse::<bool>()
                .map_err(|_| anyhow::anyhow!("Expected true or false, got '{value}'"))?;
            settings.set_browser(name, enabled);
        }
        _ => anyhow::bail!("Unknown key '{key}'. Use: api_key or browser.<name>"),
    }
    Ok(())
}

fn display_value(key: &str, value: &str) -> String {
    if key == "api_key" {
        mask(value)
    } else {
        value.to_string()
    }
}

fn mask(secret: &str) -> String {
    format!("{}***", secret.trim().chars().take(8).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keymind_storage::{JsonSettingsStore, MemorySettingsStore};

    #[test]
    fn test_set_and_get_api_key_is_masked() {
        let mut settings = Settings::default();
        set_config_value(&mut settings, "api_key", "  AIzaSyExampleKey  ").unwrap();

        assert_eq!(settings.api_key, "AIzaSyExampleKey");
        assert_eq!(
            get_config_value(&settings, "api_key").unwrap().as_deref(),
            Some("AIzaSyEx***")
        );
    }

    #[test]
    fn test_blank_api_key_reads_as_unset() {
        let settings = Settings::default();
        assert_eq!(get_config_value(&settings, "api_key").unwrap(), None);
    }

    #[test]
    fn test_browser_keys() {
        let mut settings = Settings::default();
        set_config_value(&mut settings, "browser.Opera", "false").unwrap();
        set_config_value(&mut settings, "browser.edge", "true").unwrap();

        assert_eq!(
            get_config_value(&settings, "browser.opera").unwrap().as_deref(),
            Some("false")
        );
        assert_eq!(
            get_config_value(&settings, "browser.edge").unwrap().as_deref(),
            Some("true")
        );
        assert!(!settings.snapshot().browsers.contains("opera"));
    }

    #[test]
    fn test_invalid_keys_and_values_are_rejected() {
        let mut settings = Settings::default();
        assert!(set_config_value(&mut settings, "browser.chrome", "maybe").is_err());
        assert!(set_config_value(&mut settings, "browser.", "true").is_err());
        assert!(set_config_value(&mut settings, "idle_threshold", "5").is_err());
        assert!(get_config_value(&settings, "plane.api_key").is_err());
    }

    #[test]
    fn test_list_handlers_persist_through_provider() {
        let store = MemorySettingsStore::default();

        handle_list_add(&store, ListKind::Banned, " YouTube ").unwrap();
        handle_list_add(&store, ListKind::Banned, "youtube").unwrap();
        assert_eq!(store.settings().banned, ["YouTube"]);

        handle_list_remove(&store, ListKind::Banned, "YOUTUBE").unwrap();
        assert!(store.settings().banned.is_empty());
    }

    #[test]
    fn test_browser_handler_rejects_blank_name() {
        let store = MemorySettingsStore::default();
        assert!(handle_browser(&store, "  ", true).is_err());

        handle_browser(&store, "Brave", true).unwrap();
        assert_eq!(store.settings().web_browsers.get("brave"), Some(&true));
    }

    #[test]
    fn test_write_commands_leave_unreadable_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"banned": "youtube"}"#).unwrap();
        let store = JsonSettingsStore::new(path.clone());

        assert!(handle_list_add(&store, ListKind::Allowed, "docs").is_err());
        assert!(handle_list_remove(&store, ListKind::Banned, "youtube").is_err());
        assert!(handle_browser(&store, "edge", true).is_err());
        assert!(handle_config_set(&store, "api_key", "key").is_err());

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"banned": "youtube"}"#
        );
    }
}
