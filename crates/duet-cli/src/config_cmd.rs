//! `duet config`: inspect and edit settings.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use duet_core::config::{
    get_settings_path, load_settings, save_settings, try_load_settings_from_path, Settings,
    SETTING_KEYS,
};
use duet_core::notice::Notifier;
use duet_core::utils::mask_secret;
use duet_core::{SettingsError, SettingsLoadError};

use crate::helpers::Session;
use crate::terminal::TerminalNotifier;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective settings (API keys masked)
    Show,

    /// Change one setting, e.g. `duet config set maxTokens 800`
    Set {
        /// Setting name (camelCase)
        key: String,
        /// New value
        value: String,
    },

    /// List the setting names `set` accepts
    Keys,
}

pub fn dispatch(action: ConfigCommands) -> Result<()> {
    let path = get_settings_path();
    match action {
        ConfigCommands::Show => show(&load_settings(Some(&path))),
        ConfigCommands::Keys => {
            for key in SETTING_KEYS {
                println!("{key}");
            }
            Ok(())
        }
        ConfigCommands::Set { key, value } => {
            match set_in_file(&path, &key, &value) {
                Ok(()) => {}
                Err(e) => {
                    if let Some(rejected) = e.downcast_ref::<SettingsError>() {
                        TerminalNotifier.notify(&rejected.to_string());
                        return Ok(());
                    }
                    if let Some(unreadable) = e.downcast_ref::<SettingsLoadError>() {
                        TerminalNotifier
                            .notify(&format!("{unreadable}. Fix or remove it, then retry."));
                        return Ok(());
                    }
                    return Err(e);
                }
            }
            println!("{} {key} updated", "✓".green());

            // Show where each capability now routes.
            let session = Session::from_settings(load_settings(Some(&path)));
            for route in session.router.routes() {
                let backend = route
                    .family
                    .map(|f| f.display_name())
                    .unwrap_or("not configured");
                println!(
                    "  {:<8} → provider {} ({backend})",
                    route.capability.as_str(),
                    route.slot
                );
            }
            Ok(())
        }
    }
}

/// Apply one edit to the stored settings (without env overrides) and save.
///
/// A rejected value, or a file that cannot be parsed, leaves the file
/// untouched.
fn set_in_file(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut settings = try_load_settings_from_path(path)?;
    settings.set_field(key, value)?;
    save_settings(&settings, Some(path))
        .with_context(|| format!("failed to save {}", path.display()))?;
    Ok(())
}

fn show(settings: &Settings) -> Result<()> {
    let mut masked = settings.clone();
    masked.api_key1 = mask_secret(masked.api_key1.trim());
    masked.api_key2 = mask_secret(masked.api_key2.trim());
    println!("{}", serde_json::to_string_pretty(&masked)?);
    Ok(())
}
