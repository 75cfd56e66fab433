//! `duet transcribe` and `duet speak`.

use anyhow::{Context, Result};
use colored::Colorize;

use duet_core::notice::Notifier;
use duet_core::types::Capability;
use duet_providers::transcription::is_audio_file;
use duet_providers::AudioFile;

use crate::helpers::{self, expand_tilde, Session};
use crate::terminal::TerminalNotifier;

/// Transcribe an audio file with the speech provider and print the text.
pub async fn transcribe(audio: &str, language: Option<&str>) -> Result<()> {
    let session = Session::load();
    let Some(assistant) = session.router.require(Capability::Speech) else {
        return Ok(());
    };

    let path = expand_tilde(audio);
    if !is_audio_file(audio) {
        TerminalNotifier.notify(&format!(
            "{} does not look like an audio file; sending it anyway",
            path.display()
        ));
    }
    let file = AudioFile::from_path(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let language = language.or(session.settings.language_hint());

    helpers::print_thinking();
    let text = assistant.transcribe_call(&file, language).await;
    helpers::clear_thinking();

    if let Some(text) = text {
        println!("{text}");
    }
    Ok(())
}

/// Synthesize speech with the text provider; play it, or save it with
/// `save`.
pub async fn speak(text: &str, save: bool) -> Result<()> {
    let session = Session::load_for_speech(save);
    let Some(assistant) = session.router.require(Capability::Text) else {
        return Ok(());
    };

    helpers::print_thinking();
    assistant.speak_call(text).await;
    helpers::clear_thinking();

    if let Some(path) = session.audio.saved_path() {
        println!("{} saved speech to {}", "✓".green(), path.display());
    }
    Ok(())
}
