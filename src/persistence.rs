use std::path::PathBuf;

use crate::state::Settings;

const SETTINGS_FILE: &str = "settings.json";

fn settings_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("ZotpotTts").join(SETTINGS_FILE))
}

pub fn load_settings() -> Settings {
    let Some(path) = settings_path() else {
        tracing::warn!("No platform data directory. Using default settings.");
        return Settings::default();
    };
    if !path.exists() {
        tracing::info!("No stored settings found. Using defaults.");
        return Settings::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to deserialize stored settings: {}. Using defaults.", e);
                Settings::default()
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read settings file: {}. Using defaults.", e);
            Settings::default()
        }
    }
}

pub fn save_settings(settings: &Settings) {
    let Some(path) = settings_path() else {
        tracing::error!("No platform data directory; settings not saved");
        return;
    };
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!("Failed to create settings directory: {}", e);
            return;
        }
    }
    match serde_json::to_string_pretty(settings) {
        Ok(data) => {
            if let Err(e) = std::fs::write(&path, data) {
                tracing::error!("Failed to save settings to disk: {}", e);
            }
        }
        Err(e) => {
            tracing::error!("Failed to serialize settings: {}", e);
        }
    }
}
