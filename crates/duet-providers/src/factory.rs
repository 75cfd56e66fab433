//! Builds the right assistant for an API key and base URL.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use duet_core::config::schema::DEFAULT_OPENAI_BASE_URL;
use duet_core::config::Settings;
use duet_core::notice::Notifier;

use crate::anthropic::AnthropicAssistant;
use crate::openai::OpenAiAssistant;
use crate::traits::{Assistant, AssistantOptions, AudioSink, ProviderFamily};

const ANTHROPIC_HOST: &str = "anthropic.com";

/// Time allowed to establish a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest silence between two reads of a response. Resets on every chunk,
/// so a long stream that keeps sending is never cut off.
pub const READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the shared HTTP client.
///
/// No total request timeout is set: it would also bound the body and end
/// streamed answers early.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .read_timeout(READ_TIMEOUT)
        .build()
}

/// Decide the provider family from a base URL.
///
/// Anthropic when the host contains `anthropic.com` (case-insensitive);
/// OpenAI-compatible otherwise. Without a scheme the whole string is
/// treated as the host.
pub fn classify_base_url(url: &str) -> ProviderFamily {
    let lower = url.trim().to_ascii_lowercase();
    let host = match lower.split_once("://") {
        Some((_, rest)) => rest.split(['/', '?', '#']).next().unwrap_or_default(),
        None => lower.as_str(),
    };
    if host.contains(ANTHROPIC_HOST) {
        ProviderFamily::Anthropic
    } else {
        ProviderFamily::OpenAiCompatible
    }
}

/// Constructs assistants. The router and resolver only see this trait.
pub trait AssistantFactory: Send + Sync {
    fn create(&self, api_key: &str, base_url: &str, settings: &Settings) -> Arc<dyn Assistant>;
}

/// Production factory: one pooled HTTP client shared by every assistant.
pub struct HttpAssistantFactory {
    client: reqwest::Client,
    notifier: Arc<dyn Notifier>,
    audio_sink: Arc<dyn AudioSink>,
}

impl HttpAssistantFactory {
    pub fn new(notifier: Arc<dyn Notifier>, audio_sink: Arc<dyn AudioSink>) -> Self {
        let client = build_http_client().unwrap_or_else(|e| {
            warn!(error = %e, "failed to build HTTP client, using defaults");
            reqwest::Client::new()
        });
        Self::with_client(client, notifier, audio_sink)
    }

    pub fn with_client(
        client: reqwest::Client,
        notifier: Arc<dyn Notifier>,
        audio_sink: Arc<dyn AudioSink>,
    ) -> Self {
        Self {
            client,
            notifier,
            audio_sink,
        }
    }
}

impl AssistantFactory for HttpAssistantFactory {
    fn create(&self, api_key: &str, base_url: &str, settings: &Settings) -> Arc<dyn Assistant> {
        let base_url = match base_url.trim() {
            "" => DEFAULT_OPENAI_BASE_URL,
            url => url,
        };
        let family = classify_base_url(base_url);
        let options = AssistantOptions::from_settings(settings);

        debug!(
            family = family.display_name(),
            api_base = base_url,
            model = %options.model_name,
            "creating assistant"
        );

        match family {
            ProviderFamily::Anthropic => Arc::new(AnthropicAssistant::new(
                self.client.clone(),
                api_key,
                base_url,
                options,
                self.notifier.clone(),
            )),
            ProviderFamily::OpenAiCompatible => Arc::new(OpenAiAssistant::new(
                self.client.clone(),
                api_key,
                base_url,
                options,
                self.notifier.clone(),
                self.audio_sink.clone(),
            )),
        }
    }
}
