//! `duet status`: show settings and provider routing.

use anyhow::Result;
use colored::Colorize;

use duet_core::config::{get_settings_path, Settings, Slot};
use duet_core::utils::mask_secret;
use duet_providers::classify_base_url;

use crate::helpers::Session;

/// Run the status command.
pub fn run() -> Result<()> {
    let session = Session::load();
    let settings = &session.settings;
    let settings_path = get_settings_path();

    println!();
    println!("{}", "Duet Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Settings:".bold(),
        settings_path.display(),
        if settings_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );
    println!("  {:<18} {}", "Model:".bold(), settings.model());
    println!("  {:<18} {}", "Speech model:".bold(), settings.speech_model());
    println!(
        "  {:<18} {} | replaceSelection: {} | language: {}",
        "Parameters:".bold(),
        format!("maxTokens: {}", settings.max_tokens).dimmed(),
        settings.replace_selection.to_string().dimmed(),
        settings.language_hint().unwrap_or("auto").dimmed(),
    );

    println!();
    println!("  {}", "Providers:".bold());
    for slot in [Slot::One, Slot::Two] {
        println!("    {}", slot_summary(settings, slot));
    }

    println!();
    println!("  {}", "Routing:".bold());
    for route in session.router.routes() {
        let backend = match route.family {
            Some(family) => format!("{} {}", "✓".green(), family.display_name()),
            None => format!("{}", "· not configured".dimmed()),
        };
        println!(
            "    {:<10} → provider {}  {}",
            route.capability.as_str(),
            route.slot.number(),
            backend
        );
    }
    println!();

    Ok(())
}

/// One line describing a provider slot.
fn slot_summary(settings: &Settings, slot: Slot) -> String {
    let key = settings.api_key(slot);
    if key.is_empty() {
        return format!("{:<12} {}", format!("provider {slot}"), "· no API key");
    }
    let url = settings.api_base_url(slot);
    let family = classify_base_url(url);
    format!(
        "{:<12} key {}  {}  ({})",
        format!("provider {slot}"),
        mask_secret(key),
        if url.is_empty() { "(default URL)" } else { url },
        family.display_name()
    )
}
