//! Core building blocks for Duet.
//!
//! - [`types`]: chat messages and the [`types::Capability`] enum
//! - [`config`]: settings schema, legacy migration, load/save
//! - [`notice`]: the user-visible notice sink
//! - [`error`]: settings validation errors

pub mod config;
pub mod error;
pub mod notice;
pub mod types;
pub mod utils;

pub use error::{SettingsError, SettingsLoadError};
pub use notice::{LogNotifier, Notifier};
pub use types::Capability;
