//! Settings: schema, legacy migration, loading and env var overrides.
//!
//! # Usage
//! ```no_run
//! use duet_core::config;
//!
//! let settings = config::load_settings(None);
//! println!("Model: {}", settings.model());
//! ```

pub mod loader;
pub mod migrate;
pub mod schema;

// Re-export key types
pub use loader::{
    get_settings_path, load_settings, load_settings_from_path, save_settings,
    try_load_settings_from_path,
};
pub use migrate::{apply_patch, migrate, settings_from_raw};
pub use schema::{normalize_slot, Settings, Slot, SETTING_KEYS};
