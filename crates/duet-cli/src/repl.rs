//! `duet chat`: single-shot message or interactive REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history.
//! The conversation lives in memory for the length of the session.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use duet_core::config::{get_settings_path, save_settings, try_load_settings_from_path};
use duet_core::notice::Notifier;
use duet_core::types::{Capability, ContentPart, Message};
use duet_core::utils::truncate_string;

use crate::helpers::{self, Session};
use crate::terminal::{TerminalNotifier, TerminalRenderTarget};

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Exit,
    Help,
    Reset,
    /// `/set` without a key.
    SetUsage,
    Set(&'a str, &'a str),
    Chat(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    if EXIT_COMMANDS.contains(&trimmed.to_lowercase().as_str()) {
        return Input::Exit;
    }
    match trimmed.split_once(char::is_whitespace) {
        Some(("/set", rest)) => {
            let (key, value) = rest
                .trim()
                .split_once(char::is_whitespace)
                .unwrap_or((rest.trim(), ""));
            Input::Set(key, value.trim())
        }
        _ => match trimmed {
            "/set" => Input::SetUsage,
            "/help" => Input::Help,
            "/reset" => Input::Reset,
            _ => Input::Chat(trimmed),
        },
    }
}

/// Send one message and print the streamed answer.
pub async fn run_once(message: &str, image: Option<&str>) -> Result<()> {
    let session = Session::load();
    let Some(assistant) = session.router.require(Capability::Text) else {
        return Ok(());
    };

    let message = match image {
        Some(url) => Message::user_parts(vec![
            ContentPart::text(message),
            ContentPart::image_url(url),
        ]),
        None => Message::user(message),
    };

    let target = TerminalRenderTarget::stdout();
    if assistant.text_call(&[message], Some(&target)).await.is_some() {
        println!();
    }
    Ok(())
}

/// Run the interactive REPL loop.
pub async fn run() -> Result<()> {
    let mut session = Session::load();
    let mut history: Vec<Message> = Vec::new();

    helpers::print_banner();
    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => break,
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        if input.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(&input);

        match parse_input(&input) {
            Input::Exit => {
                println!("\nGoodbye!");
                break;
            }
            Input::Help => print_help(),
            Input::Reset => {
                history.clear();
                println!("{}", "Conversation cleared.".dimmed());
            }
            Input::SetUsage => {
                TerminalNotifier.notify("Usage: /set <key> <value>. `duet config keys` lists the keys.")
            }
            Input::Set(key, value) => {
                set_and_rebuild(&mut session, &get_settings_path(), key, value)
            }
            Input::Chat(text) => {
                debug!(
                    turns = history.len(),
                    input = %truncate_string(text, 80),
                    "sending chat message"
                );
                history.push(Message::user(text));
                match chat_turn(&session, &history).await {
                    Some(answer) => history.push(Message::assistant(answer)),
                    // Already reported; drop the unanswered turn.
                    None => {
                        history.pop();
                    }
                }
            }
        }
    }

    save_history(&mut editor);
    Ok(())
}

async fn chat_turn(session: &Session, history: &[Message]) -> Option<String> {
    let assistant = session.router.require(Capability::Text)?;

    println!();
    print!("{} ", "Duet:".cyan().bold());
    let target = TerminalRenderTarget::stdout();
    let answer = assistant.text_call(history, Some(&target)).await;
    println!("\n");
    answer
}

/// Persist a settings edit and swap in the rebuilt capability map.
fn set_and_rebuild(session: &mut Session, path: &Path, key: &str, value: &str) {
    let mut stored = match try_load_settings_from_path(path) {
        Ok(stored) => stored,
        Err(e) => {
            TerminalNotifier.notify(&format!("{e}. Fix or remove it, then retry."));
            return;
        }
    };
    if let Err(e) = stored.set_field(key, value) {
        TerminalNotifier.notify(&e.to_string());
        return;
    }
    if let Err(e) = save_settings(&stored, Some(path)) {
        TerminalNotifier.notify(&format!("Failed to save settings: {e}"));
        return;
    }

    // The live session also carries env overrides; apply the edit on top.
    let mut live = session.settings.clone();
    if live.set_field(key, value).is_ok() {
        session.update(live);
    }
    println!("{} {key} updated", "✓".green());
}

fn print_help() {
    println!();
    println!("  {:<22} {}", "/set <key> <value>", "change a setting".dimmed());
    println!("  {:<22} {}", "/reset", "forget the conversation".dimmed());
    println!("  {:<22} {}", "exit", "quit".dimmed());
    println!();
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> std::path::PathBuf {
    duet_core::utils::get_data_path()
        .join("history")
        .join("cli_history")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
