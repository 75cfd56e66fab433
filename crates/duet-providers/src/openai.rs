//! Assistant for OpenAI-compatible HTTP APIs.
//!
//! Talks directly to the `/chat/completions`, `/images/generations`,
//! `/audio/transcriptions` and `/audio/speech` routes of the configured base
//! URL with bearer auth. Works with OpenAI itself and any server that copies
//! its REST shape (OpenRouter, Groq, vLLM, Ollama, LM Studio, ...).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use duet_core::config::schema::{DEFAULT_MODEL, DEFAULT_SPEECH_MODEL};
use duet_core::notice::Notifier;
use duet_core::types::Message;
use duet_core::utils::truncate_string;

use crate::error::{is_token_limit_rejection, ProviderError};
use crate::stream::aggregate_stream;
use crate::traits::{
    Assistant, AssistantOptions, AudioSink, ImageRequest, ProviderFamily, RenderTarget,
};
use crate::transcription::AudioFile;

/// Chat models known to accept image content parts.
pub const IMAGE_CAPABLE_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "chatgpt-4o-latest",
    "gpt-4-turbo",
    "gpt-4-vision-preview",
    "gpt-4.1",
    "gpt-4.1-mini",
    "gpt-4.1-nano",
    "gpt-4.5-preview",
];

/// The one image model that takes `quality: "hd"`.
pub const HD_IMAGE_MODEL: &str = "dall-e-3";

const TTS_MODEL: &str = "tts-1";
const TTS_VOICE: &str = "alloy";

// ─────────────────────────────────────────────
// Token-limit parameter
// ─────────────────────────────────────────────

/// Name under which the token limit is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenParam {
    MaxTokens,
    MaxCompletionTokens,
}

/// Reasoning models (`o1`, `o3-mini`, `o4-mini`, ...) only accept
/// `max_completion_tokens`.
pub fn is_reasoning_model(model: &str) -> bool {
    let name = model.rsplit('/').next().unwrap_or(model).to_ascii_lowercase();
    let mut chars = name.chars();
    chars.next() == Some('o') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

/// Which token-limit parameter to send, if any. A limit of 0 omits it.
pub fn token_limit_param(model: &str, max_tokens: u32) -> Option<(TokenParam, u32)> {
    if max_tokens == 0 {
        return None;
    }
    let param = if is_reasoning_model(model) {
        TokenParam::MaxCompletionTokens
    } else {
        TokenParam::MaxTokens
    };
    Some((param, max_tokens))
}

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

impl<'a> ChatRequest<'a> {
    fn new(
        model: &'a str,
        messages: &'a [Message],
        stream: bool,
        limit: Option<(TokenParam, u32)>,
    ) -> Self {
        let (max_tokens, max_completion_tokens) = match limit {
            Some((TokenParam::MaxTokens, n)) => (Some(n), None),
            Some((TokenParam::MaxCompletionTokens, n)) => (None, Some(n)),
            None => (None, None),
        };
        Self {
            model,
            messages,
            stream,
            max_tokens,
            max_completion_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<&'static str>,
}

impl<'a> ImageGenerationRequest<'a> {
    fn from_request(request: &'a ImageRequest) -> Self {
        let size = request.size.trim();
        Self {
            model: &request.model,
            prompt: &request.prompt,
            size: (!size.is_empty()).then_some(size),
            n: (request.count > 1).then_some(request.count),
            quality: (request.hd && request.model == HD_IMAGE_MODEL).then_some("hd"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
}

// ─────────────────────────────────────────────
// OpenAiAssistant
// ─────────────────────────────────────────────

/// Assistant that speaks the OpenAI REST dialect.
pub struct OpenAiAssistant {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// Trimmed, without trailing slash (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// API key for Bearer authentication.
    api_key: String,
    options: AssistantOptions,
    notifier: Arc<dyn Notifier>,
    audio_sink: Arc<dyn AudioSink>,
}

impl std::fmt::Debug for OpenAiAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAssistant")
            .field("api_base", &self.api_base)
            .field("options", &self.options)
            .finish()
    }
}

impl OpenAiAssistant {
    pub fn new(
        client: reqwest::Client,
        api_key: &str,
        api_base: &str,
        options: AssistantOptions,
        notifier: Arc<dyn Notifier>,
        audio_sink: Arc<dyn AudioSink>,
    ) -> Self {
        OpenAiAssistant {
            client,
            api_base: normalize_base_url(api_base),
            api_key: api_key.to_string(),
            options,
            notifier,
            audio_sink,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn options(&self) -> &AssistantOptions {
        &self.options
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.api_base, route)
    }

    /// Model for this call: multipart content on a non-vision model falls
    /// back to the default model. The stored options are left untouched.
    fn effective_model(&self, messages: &[Message]) -> &str {
        let configured = self.options.model_name.as_str();
        if messages.iter().any(Message::is_multipart)
            && !IMAGE_CAPABLE_MODELS.contains(&configured)
        {
            debug!(
                configured,
                fallback = DEFAULT_MODEL,
                "model cannot read images, using fallback for this call"
            );
            DEFAULT_MODEL
        } else {
            configured
        }
    }

    async fn post_json(
        &self,
        route: &str,
        body: &impl Serialize,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(self.url(route))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    /// One chat completion attempt.
    async fn chat_once(
        &self,
        model: &str,
        messages: &[Message],
        limit: Option<(TokenParam, u32)>,
        target: Option<&dyn RenderTarget>,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest::new(model, messages, target.is_some(), limit);

        debug!(
            model,
            messages = messages.len(),
            stream = request.stream,
            token_param = ?limit.map(|(p, _)| p),
            "calling chat completions"
        );

        let response = self.post_json("chat/completions", &request).await?;

        match target {
            Some(target) => aggregate_stream(Box::pin(response.bytes_stream()), target).await,
            None => {
                let chat: ChatResponse = response
                    .json()
                    .await
                    .map_err(|e| ProviderError::Decode(e.to_string()))?;
                chat.choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content.unwrap_or_default())
                    .ok_or_else(|| ProviderError::Decode("No choices in response".to_string()))
            }
        }
    }

    fn report(&self, what: &str, err: &ProviderError) {
        error!(api_base = %self.api_base, error = %err, "{what} failed");
        self.notifier.notify(&format!("{what} failed: {err}"));
    }
}

#[async_trait]
impl Assistant for OpenAiAssistant {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::OpenAiCompatible
    }

    async fn text_call(
        &self,
        messages: &[Message],
        target: Option<&dyn RenderTarget>,
    ) -> Option<String> {
        let model = self.effective_model(messages);
        let limit = token_limit_param(model, self.options.max_tokens);

        let result = match self.chat_once(model, messages, limit, target).await {
            Err(e) if limit.is_some() && is_token_limit_rejection(&e) => {
                warn!(model, error = %e, "token limit rejected, retrying without it");
                self.chat_once(model, messages, None, target).await
            }
            other => other,
        };

        match result {
            Ok(text) => {
                debug!(chars = text.len(), "chat completion received");
                Some(text)
            }
            Err(e) => {
                self.report("Text request", &e);
                None
            }
        }
    }

    async fn image_call(&self, request: &ImageRequest) -> Option<Vec<String>> {
        let body = ImageGenerationRequest::from_request(request);
        debug!(model = body.model, n = ?body.n, hd = body.quality.is_some(), "generating image");

        let result = async {
            let response = self.post_json("images/generations", &body).await?;
            response
                .json::<ImageGenerationResponse>()
                .await
                .map_err(|e| ProviderError::Decode(e.to_string()))
        }
        .await;

        match result {
            Ok(images) => Some(images.data.into_iter().filter_map(|d| d.url).collect()),
            Err(e) => {
                self.report("Image generation", &e);
                None
            }
        }
    }

    async fn transcribe_call(&self, audio: &AudioFile, language: Option<&str>) -> Option<String> {
        let model = if self.options.speech_model_name.trim().is_empty() {
            DEFAULT_SPEECH_MODEL
        } else {
            self.options.speech_model_name.trim()
        };
        let language = language.map(str::trim).filter(|l| !l.is_empty());

        debug!(
            file = %audio.file_name,
            bytes = audio.bytes.len(),
            model,
            language = language.unwrap_or("auto"),
            "transcribing audio"
        );

        let result = async {
            let mut form = reqwest::multipart::Form::new()
                .part("file", audio.to_part()?)
                .text("model", model.to_string());
            if let Some(lang) = language {
                form = form.text("language", lang.to_string());
            }

            let response = self
                .client
                .post(self.url("audio/transcriptions"))
                .bearer_auth(&self.api_key)
                .multipart(form)
                .send()
                .await?;
            let response = check_status(response).await?;
            response
                .json::<TranscriptionResponse>()
                .await
                .map_err(|e| ProviderError::Decode(e.to_string()))
        }
        .await;

        match result {
            Ok(transcription) => Some(transcription.text),
            Err(e) => {
                self.report("Transcription", &e);
                None
            }
        }
    }

    async fn speak_call(&self, text: &str) {
        let body = SpeechRequest {
            model: TTS_MODEL,
            input: text,
            voice: TTS_VOICE,
        };
        debug!(chars = text.len(), "synthesizing speech");

        let audio = async {
            let response = self.post_json("audio/speech", &body).await?;
            Ok::<_, ProviderError>(response.bytes().await?)
        }
        .await;

        match audio {
            Ok(bytes) => {
                if let Err(e) = self.audio_sink.play(&bytes) {
                    error!(error = %e, "audio playback failed");
                    self.notifier.notify(&format!("Audio playback failed: {e}"));
                }
            }
            Err(e) => self.report("Speech synthesis", &e),
        }
    }
}

/// Trim and strip a single trailing slash.
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    url.strip_suffix('/').unwrap_or(url).to_string()
}

/// Turn a non-2xx response into a [`ProviderError::Api`].
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    warn!(status = %status, body = %truncate_string(&body, 500), "API error");
    Err(ProviderError::from_response(status.as_u16(), body))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
