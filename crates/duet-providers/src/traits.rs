//! Assistant trait: the capability surface shared by both provider families.
//!
//! Callers hold an `Arc<dyn Assistant>` and never branch on which family
//! backs it. Every call reports its own failures through the assistant's
//! notifier and resolves to `None` (or nothing), so an empty result means
//! "already reported to the user".

use async_trait::async_trait;
use duet_core::config::Settings;
use duet_core::types::Message;

use crate::transcription::AudioFile;

/// Wire-protocol flavor an assistant speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderFamily {
    OpenAiCompatible,
    Anthropic,
}

impl ProviderFamily {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderFamily::OpenAiCompatible => "OpenAI-compatible",
            ProviderFamily::Anthropic => "Anthropic",
        }
    }
}

/// Where a streamed answer is shown.
///
/// Every update carries the full text so far; implementations replace what
/// they showed before.
pub trait RenderTarget: Send + Sync {
    fn clear(&self);
    fn render(&self, text: &str);
}

/// Host audio output for synthesized speech.
pub trait AudioSink: Send + Sync {
    fn play(&self, audio: &[u8]) -> anyhow::Result<()>;
}

/// Model and token settings an assistant is built with.
///
/// Copied out of [`Settings`] at construction; later settings edits only
/// reach new assistants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssistantOptions {
    pub model_name: String,
    pub speech_model_name: String,
    /// 0 = omit the token-limit parameter.
    pub max_tokens: u32,
}

impl AssistantOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model_name: settings.model().to_string(),
            speech_model_name: settings.speech_model().to_string(),
            max_tokens: settings.max_tokens,
        }
    }
}

/// Parameters of an image generation request.
#[derive(Clone, Debug, Default)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    /// e.g. `"1024x1024"`; blank = server default.
    pub size: String,
    pub count: u32,
    pub hd: bool,
}

#[async_trait]
pub trait Assistant: Send + Sync {
    fn family(&self) -> ProviderFamily;

    /// Chat completion. Streams into `target` when one is given.
    async fn text_call(
        &self,
        messages: &[Message],
        target: Option<&dyn RenderTarget>,
    ) -> Option<String>;

    /// Image generation; resolves to the result URLs.
    async fn image_call(&self, request: &ImageRequest) -> Option<Vec<String>>;

    /// Speech-to-text.
    async fn transcribe_call(&self, audio: &AudioFile, language: Option<&str>) -> Option<String>;

    /// Text-to-speech, played through the host's audio output.
    async fn speak_call(&self, text: &str);
}
