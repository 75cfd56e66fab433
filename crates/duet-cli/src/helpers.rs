//! Shared CLI helpers: path expansion, session setup, progress output.

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;

use duet_core::config::Settings;
use duet_core::utils::get_audio_path;
use duet_providers::{CapabilityRouter, HttpAssistantFactory};

use crate::audio::SpeechOutput;
use crate::terminal::TerminalNotifier;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Everything a command needs to reach the providers.
pub struct Session {
    pub settings: Settings,
    pub router: CapabilityRouter,
    pub audio: Arc<SpeechOutput>,
}

impl Session {
    /// Load settings (file + env) and build the capability map.
    pub fn load() -> Self {
        Self::from_settings(duet_core::config::load_settings(None))
    }

    /// Like [`Session::load`], saving speech to disk instead of playing it
    /// when `save_speech` is set.
    pub fn load_for_speech(save_speech: bool) -> Self {
        Self::with_output(
            duet_core::config::load_settings(None),
            SpeechOutput::select(save_speech, get_audio_path()),
        )
    }

    pub fn from_settings(settings: Settings) -> Self {
        Self::with_output(settings, SpeechOutput::select(false, get_audio_path()))
    }

    fn with_output(settings: Settings, output: SpeechOutput) -> Self {
        let notifier = Arc::new(TerminalNotifier);
        let audio = Arc::new(output);
        let factory = Arc::new(HttpAssistantFactory::new(notifier.clone(), audio.clone()));
        let router = CapabilityRouter::from_settings(&settings, factory, notifier);
        Self {
            settings,
            router,
            audio,
        }
    }

    /// Swap in new settings and rebuild the capability map.
    pub fn update(&mut self, settings: Settings) {
        self.router.rebuild(&settings);
        self.settings = settings;
    }
}

/// Print the banner shown at REPL start.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "Duet".cyan().bold(), version.dimmed());
    println!(
        "{}",
        "Type a message, /help for commands, or \"exit\" to quit.".dimmed()
    );
    println!();
}

/// Print a "thinking" placeholder (for non-log mode).
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
