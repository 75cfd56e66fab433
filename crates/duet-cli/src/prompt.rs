//! `duet prompt`: run an instruction on a selection.
//!
//! The selection is a file's contents or stdin. With `replaceSelection`
//! the answer replaces it; otherwise the answer is appended below it.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::debug;

use duet_core::types::{Capability, Message};

use crate::helpers::{self, expand_tilde, Session};

const SYSTEM_PROMPT: &str = "You edit text for the user. Apply the instruction to the \
selected text and reply with the resulting text only, without commentary.";

/// Conversation sent for one instruction.
fn build_messages(instruction: &str, selection: &str) -> Vec<Message> {
    let user = if selection.trim().is_empty() {
        instruction.to_string()
    } else {
        format!("{instruction}\n\n---\n{selection}")
    };
    vec![Message::system(SYSTEM_PROMPT), Message::user(user)]
}

/// Text that takes the selection's place.
fn apply_answer(selection: &str, answer: &str, replace: bool) -> String {
    if replace {
        return answer.to_string();
    }
    if selection.is_empty() {
        return answer.to_string();
    }
    let separator = if selection.ends_with('\n') { "\n" } else { "\n\n" };
    format!("{selection}{separator}{answer}")
}

pub async fn run(instruction: &str, file: Option<&str>) -> Result<()> {
    let session = Session::load();
    let Some(assistant) = session.router.require(Capability::Text) else {
        return Ok(());
    };

    let path = file.map(expand_tilde);
    let selection = match &path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    debug!(chars = selection.len(), "running prompt on selection");

    helpers::print_thinking();
    let answer = assistant
        .text_call(&build_messages(instruction, &selection), None)
        .await;
    helpers::clear_thinking();

    let Some(answer) = answer else {
        return Ok(());
    };
    let replace = session.settings.replace_selection;
    let result = apply_answer(&selection, &answer, replace);

    match path {
        Some(path) => write_back(&path, &result, replace),
        None => {
            println!("{result}");
            Ok(())
        }
    }
}

fn write_back(path: &Path, result: &str, replaced: bool) -> Result<()> {
    std::fs::write(path, result).with_context(|| format!("failed to write {}", path.display()))?;
    let verb = if replaced { "replaced" } else { "appended to" };
    println!("{} {verb} {}", "✓".green(), path.display());
    Ok(())
}
