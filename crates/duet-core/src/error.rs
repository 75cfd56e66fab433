//! Error types for settings validation.

use thiserror::Error;

/// Rejected settings mutation. The stored value is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Unknown setting: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl SettingsError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        SettingsError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// A settings file exists but could not be turned into [`Settings`].
///
/// [`Settings`]: crate::config::Settings
#[derive(Error, Debug)]
pub enum SettingsLoadError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings file {path} is not valid JSON: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
