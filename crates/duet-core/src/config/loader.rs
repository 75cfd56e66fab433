//! Settings loader: reads `~/.duet/settings.json`, applies legacy
//! migrations, and merges env var overrides.
//!
//! # Loading precedence
//! 1. Defaults (from `Settings::default()`)
//! 2. JSON file at `~/.duet/settings.json`, migrated to the current schema
//! 3. Environment variables `DUET_<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::migrate::settings_from_raw;
use super::schema::Settings;
use crate::error::SettingsLoadError;

/// Default settings file path.
pub fn get_settings_path() -> PathBuf {
    crate::utils::get_settings_path()
}

/// Load settings from the given path (or the default one) + env vars.
///
/// Falls back to `Settings::default()` if the file doesn't exist or can't be parsed.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let settings_path = path.map(PathBuf::from).unwrap_or_else(get_settings_path);
    apply_env_overrides(load_settings_from_path(&settings_path))
}

/// Load settings from a specific file path, without env overrides.
///
/// A missing, unreadable or malformed file yields `Settings::default()`.
/// Code that writes the result back should use
/// [`try_load_settings_from_path`] instead.
pub fn load_settings_from_path(path: &Path) -> Settings {
    match try_load_settings_from_path(path) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("{e}");
            Settings::default()
        }
    }
}

/// Load settings from a specific file path, without env overrides.
///
/// A missing file is `Ok(Settings::default())`. A file that exists but
/// cannot be read or parsed is an error, so callers never save defaults
/// over it.
pub fn try_load_settings_from_path(path: &Path) -> Result<Settings, SettingsLoadError> {
    if !path.exists() {
        info!("No settings file found at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    debug!("Loading settings from {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|source| SettingsLoadError::Read {
        path: path.display().to_string(),
        source,
    })?;

    // Parse JSON → Value first so legacy shapes survive until migration
    let raw: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| SettingsLoadError::Parse {
            path: path.display().to_string(),
            source,
        })?;

    Ok(settings_from_raw(Some(&raw)))
}

/// Save settings to disk (pretty-printed JSON with camelCase keys).
///
/// Always writes the current schema, whatever shape was loaded.
pub fn save_settings(settings: &Settings, path: Option<&Path>) -> std::io::Result<()> {
    let settings_path = path.map(PathBuf::from).unwrap_or_else(get_settings_path);

    if let Some(parent) = settings_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;

    std::fs::write(&settings_path, json)?;
    debug!("Settings saved to {}", settings_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of loaded settings.
///
/// Supported overrides:
/// - `DUET_API_KEY1`, `DUET_API_KEY2`
/// - `DUET_API_BASE_URL1`, `DUET_API_BASE_URL2`
/// - `DUET_MODEL_NAME`, `DUET_SPEECH_MODEL_NAME`
/// - `DUET_MAX_TOKENS` (ignored unless it parses as a non-negative integer)
fn apply_env_overrides(mut settings: Settings) -> Settings {
    let overrides: &[(&str, &str)] = &[
        ("DUET_API_KEY1", "apiKey1"),
        ("DUET_API_KEY2", "apiKey2"),
        ("DUET_API_BASE_URL1", "apiBaseUrl1"),
        ("DUET_API_BASE_URL2", "apiBaseUrl2"),
        ("DUET_MODEL_NAME", "modelName"),
        ("DUET_SPEECH_MODEL_NAME", "speechModelName"),
        ("DUET_MAX_TOKENS", "maxTokens"),
    ];

    for (var, key) in overrides {
        if let Ok(val) = std::env::var(var) {
            if let Err(e) = settings.set_field(key, &val) {
                warn!(var = *var, error = %e, "ignoring invalid env override");
            }
        }
    }

    settings
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
