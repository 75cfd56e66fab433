//! Assistant for the Anthropic Messages API.
//!
//! Text only: image generation, transcription and speech are reported as
//! unsupported without touching the network.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use duet_core::config::schema::{DEFAULT_ANTHROPIC_BASE_URL, DEFAULT_MAX_TOKENS};
use duet_core::notice::Notifier;
use duet_core::types::{ContentPart, Message, MessageContent};

use crate::error::ProviderError;
use crate::openai::{check_status, normalize_base_url};
use crate::traits::{Assistant, AssistantOptions, ImageRequest, ProviderFamily, RenderTarget};
use crate::transcription::AudioFile;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const IMAGE_UNSUPPORTED: &str = "Image generation is not supported by the Anthropic provider";
pub const TRANSCRIPTION_UNSUPPORTED: &str =
    "Speech-to-text is not supported by the Anthropic provider";
pub const SPEECH_UNSUPPORTED: &str = "Text-to-speech is not supported by the Anthropic provider";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Value>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<Value>,
}

impl MessagesResponse {
    fn first_text(&self) -> String {
        self.content
            .first()
            .and_then(|block| block.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

/// Split system messages out of the conversation.
///
/// Returns the joined system prompt (if any) and the remaining turns in
/// Messages API shape.
pub fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<Value>) {
    let mut system: Vec<&str> = Vec::new();
    let mut turns = Vec::with_capacity(messages.len());

    for message in messages {
        match message {
            Message::System { content } => system.push(content),
            Message::User { content } => turns.push(json!({
                "role": "user",
                "content": user_content(content),
            })),
            Message::Assistant { content } => turns.push(json!({
                "role": "assistant",
                "content": content,
            })),
        }
    }

    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, turns)
}

fn user_content(content: &MessageContent) -> Value {
    match content {
        MessageContent::Text(text) => Value::String(text.clone()),
        MessageContent::Parts(parts) => Value::Array(parts.iter().map(content_block).collect()),
    }
}

fn content_block(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text { text } => json!({"type": "text", "text": text}),
        ContentPart::ImageUrl { image_url } => {
            json!({"type": "image", "source": image_source(&image_url.url)})
        }
    }
}

/// `data:` URIs become base64 sources, everything else a URL source.
fn image_source(url: &str) -> Value {
    if let Some((meta, data)) = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
    {
        if let Some(media_type) = meta.strip_suffix(";base64") {
            return json!({"type": "base64", "media_type": media_type, "data": data});
        }
    }
    json!({"type": "url", "url": url})
}

/// Assistant that speaks the Anthropic Messages dialect.
pub struct AnthropicAssistant {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    options: AssistantOptions,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for AnthropicAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicAssistant")
            .field("api_base", &self.api_base)
            .field("options", &self.options)
            .finish()
    }
}

impl AnthropicAssistant {
    pub fn new(
        client: reqwest::Client,
        api_key: &str,
        api_base: &str,
        options: AssistantOptions,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let api_base = match normalize_base_url(api_base) {
            base if base.is_empty() => DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            base => base,
        };
        Self {
            client,
            api_base,
            api_key: api_key.to_string(),
            options,
            notifier,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Messages API requires `max_tokens`; 0 falls back to the default.
    fn max_tokens(&self) -> u32 {
        match self.options.max_tokens {
            0 => DEFAULT_MAX_TOKENS,
            n => n,
        }
    }

    async fn send(&self, messages: &[Message]) -> Result<String, ProviderError> {
        let (system, turns) = convert_messages(messages);
        let request = MessagesRequest {
            model: &self.options.model_name,
            max_tokens: self.max_tokens(),
            system,
            messages: turns,
            stream: false,
        };

        debug!(
            model = request.model,
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "calling anthropic messages"
        );

        let response = self
            .client
            .post(format!("{}/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(body.first_text())
    }

    fn unsupported(&self, notice: &str) {
        debug!(notice, "unsupported capability requested");
        self.notifier.notify(notice);
    }
}

#[async_trait]
impl Assistant for AnthropicAssistant {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::Anthropic
    }

    async fn text_call(
        &self,
        messages: &[Message],
        target: Option<&dyn RenderTarget>,
    ) -> Option<String> {
        match self.send(messages).await {
            Ok(text) => {
                if let Some(target) = target {
                    target.clear();
                    target.render(&text);
                }
                Some(text)
            }
            Err(e) => {
                error!(api_base = %self.api_base, error = %e, "Text request failed");
                self.notifier.notify(&format!("Text request failed: {e}"));
                None
            }
        }
    }

    async fn image_call(&self, _request: &ImageRequest) -> Option<Vec<String>> {
        self.unsupported(IMAGE_UNSUPPORTED);
        None
    }

    async fn transcribe_call(&self, _audio: &AudioFile, _language: Option<&str>) -> Option<String> {
        self.unsupported(TRANSCRIPTION_UNSUPPORTED);
        None
    }

    async fn speak_call(&self, _text: &str) {
        self.unsupported(SPEECH_UNSUPPORTED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingNotifier, RecordingTarget};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn assistant(base: &str, max_tokens: u32) -> (AnthropicAssistant, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let options = AssistantOptions {
            model_name: "claude-3-5-sonnet-latest".into(),
            speech_model_name: "whisper-1".into(),
            max_tokens,
        };
        let assistant = AnthropicAssistant::new(
            reqwest::Client::new(),
            "sk-ant-test",
            base,
            options,
            notifier.clone(),
        );
        (assistant, notifier)
    }

    fn reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "stop_reason": "end_turn"
        }))
    }

    #[test]
    fn test_blank_base_url_defaults() {
        let (a, _) = assistant("  ", 500);
        assert_eq!(a.api_base(), DEFAULT_ANTHROPIC_BASE_URL);
        let (a, _) = assistant("https://proxy.example/anthropic/", 500);
        assert_eq!(a.api_base(), "https://proxy.example/anthropic");
    }

    #[test]
    fn test_convert_messages_hoists_system() {
        let messages = vec![
            Message::system("Be brief."),
            Message::user("Hi"),
            Message::assistant("Hello"),
            Message::system("Use English."),
        ];
        let (system, turns) = convert_messages(&messages);
        assert_eq!(system.as_deref(), Some("Be brief.\n\nUse English."));
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], json!({"role": "user", "content": "Hi"}));
        assert_eq!(turns[1], json!({"role": "assistant", "content": "Hello"}));
    }

    #[test]
    fn test_convert_messages_without_system() {
        let (system, turns) = convert_messages(&[Message::user("Hi")]);
        assert!(system.is_none());
        assert_eq!(turns.len(), 1);
    }

    #[test]
    fn test_image_parts_converted() {
        let messages = vec![Message::user_parts(vec![
            ContentPart::text("Describe"),
            ContentPart::image_url("data:image/png;base64,AAAA"),
            ContentPart::image_url("https://example.com/cat.jpg"),
        ])];
        let (_, turns) = convert_messages(&messages);
        let content = &turns[0]["content"];
        assert_eq!(content[0], json!({"type": "text", "text": "Describe"}));
        assert_eq!(
            content[1]["source"],
            json!({"type": "base64", "media_type": "image/png", "data": "AAAA"})
        );
        assert_eq!(
            content[2]["source"],
            json!({"type": "url", "url": "https://example.com/cat.jpg"})
        );
    }

    #[tokio::test]
    async fn test_text_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({
                "model": "claude-3-5-sonnet-latest",
                "max_tokens": 300,
                "system": "Be brief.",
                "stream": false
            })))
            .respond_with(reply("Hi there"))
            .expect(1)
            .mount(&server)
            .await;

        let (a, notifier) = assistant(&server.uri(), 300);
        let messages = [Message::system("Be brief."), Message::user("Hi")];
        let text = a.text_call(&messages, None).await;

        assert_eq!(text.as_deref(), Some("Hi there"));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_text_call_renders_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(reply("whole answer"))
            .mount(&server)
            .await;

        let (a, _) = assistant(&server.uri(), 300);
        let target = RecordingTarget::default();
        let text = a.text_call(&[Message::user("Hi")], Some(&target)).await;

        assert_eq!(text.as_deref(), Some("whole answer"));
        assert_eq!(target.clears(), 1);
        assert_eq!(target.renders(), vec!["whole answer"]);
    }

    #[tokio::test]
    async fn test_zero_max_tokens_uses_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_partial_json(json!({"max_tokens": DEFAULT_MAX_TOKENS})))
            .respond_with(reply("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let (a, _) = assistant(&server.uri(), 0);
        assert_eq!(a.text_call(&[Message::user("Hi")], None).await.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_unexpected_shape_yields_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "tool_use", "id": "t1"}]
            })))
            .mount(&server)
            .await;

        let (a, notifier) = assistant(&server.uri(), 300);
        assert_eq!(a.text_call(&[Message::user("Hi")], None).await.as_deref(), Some(""));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_no_retry_on_token_limit_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "type": "error",
                "error": {"type": "invalid_request_error", "message": "max_tokens: too large"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (a, notifier) = assistant(&server.uri(), 999_999);
        assert!(a.text_call(&[Message::user("Hi")], None).await.is_none());

        let notices = notifier.messages();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("max_tokens: too large"));
    }

    #[tokio::test]
    async fn test_unsupported_capabilities_skip_network() {
        let server = MockServer::start().await;
        let (a, notifier) = assistant(&server.uri(), 300);

        assert!(a.image_call(&ImageRequest::default()).await.is_none());
        let audio = AudioFile::new("memo.wav", vec![0; 4]);
        assert!(a.transcribe_call(&audio, Some("en")).await.is_none());
        a.speak_call("hello").await;

        assert_eq!(
            notifier.messages(),
            vec![IMAGE_UNSUPPORTED, TRANSCRIPTION_UNSUPPORTED, SPEECH_UNSUPPORTED]
        );
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
