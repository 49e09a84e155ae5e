//! Settings file helpers for the chat client

use directories::ProjectDirs;
use shared::settings::ClientSettings;
use std::path::{Path, PathBuf};

pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("com.local", "Naaj", "NaajChat").map(|dirs| dirs.config_dir().join("settings.json"))
}

/// Load settings from disk or return defaults.
///
/// The flag says whether a readable settings file was found.
pub fn load_settings_or_default() -> (ClientSettings, bool) {
    match config_path() {
        Some(path) => load_settings_from(&path),
        None => (ClientSettings::default(), false),
    }
}

fn load_settings_from(path: &Path) -> (ClientSettings, bool) {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return (ClientSettings::default(), false);
    };
    match serde_json::from_str::<ClientSettings>(&contents) {
        Ok(settings) => (settings, true),
        Err(e) => {
            tracing::warn!("ignoring unreadable settings at {}: {}", path.display(), e);
            (ClientSettings::default(), false)
        }
    }
}

pub fn save_settings(settings: &ClientSettings) {
    if let Some(path) = config_path() {
        if let Err(e) = save_settings_to(&path, settings) {
            tracing::warn!("could not write settings to {}: {:#}", path.display(), e);
        }
    }
}

fn save_settings_to(path: &Path, settings: &ClientSettings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(settings)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, found) = load_settings_from(&dir.path().join("settings.json"));
        assert!(!found);
        assert_eq!(settings.backend.base_url, ClientSettings::default().backend.base_url);
    }

    #[test]
    fn test_saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = ClientSettings::default();
        settings.backend.base_url = "http://10.0.0.5:3000".into();
        settings.transcript.persist_across_restarts = true;

        save_settings_to(&path, &settings).unwrap();
        let (loaded, found) = load_settings_from(&path);
        assert!(found);
        assert_eq!(loaded.backend.base_url, "http://10.0.0.5:3000");
        assert!(loaded.transcript.persist_across_restarts);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"geolocation": {"enabled": false}}"#).unwrap();

        let (loaded, found) = load_settings_from(&path);
        assert!(found);
        assert!(!loaded.geolocation.enabled);
        assert_eq!(loaded.phrases.greeting, ClientSettings::default().phrases.greeting);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(!load_settings_from(&path).1);
    }
}
