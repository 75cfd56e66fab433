//! Duet CLI: entry point.
//!
//! # Commands
//!
//! - `duet chat [-m MESSAGE]`: chat (single-shot or interactive REPL)
//! - `duet prompt INSTRUCTION [--file PATH]`: rewrite or extend a selection
//! - `duet transcribe AUDIO [--language xx]`: speech-to-text
//! - `duet speak TEXT [--save]`: text-to-speech, played or saved
//! - `duet status`: show settings and provider routing
//! - `duet config show | set KEY VALUE`: inspect or edit settings
//! - `duet onboard`: create (or migrate) the settings file

mod audio;
mod config_cmd;
mod helpers;
mod onboard;
mod prompt;
mod repl;
mod speech;
mod status;
mod terminal;

use anyhow::Result;
use clap::{Parser, Subcommand};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Duet: two configurable AI providers behind one command line
#[derive(Parser)]
#[command(name = "duet", version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true, default_value_t = false)]
    logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the text provider (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Image URL (or data URI) to attach to the single message
        #[arg(long, requires = "message")]
        image: Option<String>,
    },

    /// Run an instruction on a selection (file contents or stdin)
    Prompt {
        /// What to do with the selection
        instruction: String,

        /// File holding the selection; stdin when omitted
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Transcribe an audio file with the speech provider
    Transcribe {
        /// Path to the audio file
        audio: String,

        /// Language hint (ISO-639-1), overrides the `language` setting
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Synthesize speech with the text provider
    Speak {
        /// Text to read out
        text: String,

        /// Save the clip under ~/.duet/audio instead of playing it
        #[arg(long)]
        save: bool,
    },

    /// Show settings and provider routing
    Status,

    /// Inspect or edit settings
    Config {
        #[command(subcommand)]
        action: config_cmd::ConfigCommands,
    },

    /// Create or migrate the settings file
    Onboard,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.logs);

    match cli.command {
        Commands::Chat { message, image } => match message {
            Some(message) => repl::run_once(&message, image.as_deref()).await,
            None => repl::run().await,
        },
        Commands::Prompt { instruction, file } => prompt::run(&instruction, file.as_deref()).await,
        Commands::Transcribe { audio, language } => {
            speech::transcribe(&audio, language.as_deref()).await
        }
        Commands::Speak { text, save } => speech::speak(&text, save).await,
        Commands::Status => status::run(),
        Commands::Config { action } => config_cmd::dispatch(action),
        Commands::Onboard => onboard::run(),
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("duet=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
