//! `duet onboard`: create the settings file, or rewrite a legacy one in
//! the current schema.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use duet_core::config::{get_settings_path, save_settings, try_load_settings_from_path};
use duet_core::notice::Notifier;
use duet_core::utils::get_audio_path;
use duet_core::SettingsLoadError;

use crate::terminal::TerminalNotifier;

/// What onboarding did to the settings file.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Created,
    Migrated,
}

/// Run the onboard command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "Duet setup".cyan().bold());
    println!();

    let settings_path = get_settings_path();
    let outcome = match write_settings(&settings_path) {
        Ok(outcome) => outcome,
        Err(e) => match e.downcast_ref::<SettingsLoadError>() {
            Some(unreadable) => {
                TerminalNotifier.notify(&format!(
                    "{unreadable}. Fix or remove it, then run `duet onboard` again."
                ));
                return Ok(());
            }
            None => return Err(e),
        },
    };
    match outcome {
        Outcome::Created => println!(
            "  {} created settings at {}",
            "✓".green(),
            settings_path.display()
        ),
        Outcome::Migrated => println!(
            "  {} settings at {} rewritten in the current format",
            "✓".green(),
            settings_path.display()
        ),
    }

    let audio_dir = get_audio_path();
    std::fs::create_dir_all(&audio_dir)
        .with_context(|| format!("failed to create {}", audio_dir.display()))?;
    println!("  {} audio dir at {}", "✓".green(), audio_dir.display());

    println!();
    println!(
        "{}",
        "  Setup complete! Add a key with `duet config set apiKey1 <KEY>`, then run `duet chat`."
            .green()
    );
    println!();

    Ok(())
}

/// Write defaults, or load + migrate + save an existing file.
///
/// An existing file that cannot be parsed is left as it is.
fn write_settings(path: &Path) -> Result<Outcome> {
    let existed = path.exists();
    let settings = try_load_settings_from_path(path)?;
    save_settings(&settings, Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(if existed {
        Outcome::Migrated
    } else {
        Outcome::Created
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
