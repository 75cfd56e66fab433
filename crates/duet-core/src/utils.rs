//! Utility helpers: path resolution, timestamps, string manipulation.

use std::path::PathBuf;

/// Get the Duet data directory (e.g. `~/.duet/`).
pub fn get_data_path() -> PathBuf {
    let home = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".duet")
}

/// Get the settings file path (e.g. `~/.duet/settings.json`).
pub fn get_settings_path() -> PathBuf {
    get_data_path().join("settings.json")
}

/// Directory where synthesized speech is written (e.g. `~/.duet/audio/`).
pub fn get_audio_path() -> PathBuf {
    get_data_path().join("audio")
}

/// Compact local timestamp usable in file names, e.g. `20261017-142501`.
pub fn timestamp_slug() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Show only the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return String::new();
    }
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}
