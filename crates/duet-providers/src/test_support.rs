//! Recording doubles and request matchers shared by the provider tests.

use std::sync::{Arc, Mutex};

use duet_core::config::Settings;
use duet_core::notice::Notifier;
use duet_core::types::Message;
use wiremock::{Match, Request};

use crate::factory::AssistantFactory;
use crate::traits::{Assistant, AudioSink, ImageRequest, ProviderFamily, RenderTarget};
use crate::transcription::AudioFile;

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
pub struct RecordingTarget {
    clears: Mutex<usize>,
    renders: Mutex<Vec<String>>,
}

impl RecordingTarget {
    pub fn clears(&self) -> usize {
        *self.clears.lock().unwrap()
    }

    pub fn renders(&self) -> Vec<String> {
        self.renders.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.renders.lock().unwrap().last().cloned()
    }
}

impl RenderTarget for RecordingTarget {
    fn clear(&self) {
        *self.clears.lock().unwrap() += 1;
    }

    fn render(&self, text: &str) {
        self.renders.lock().unwrap().push(text.to_string());
    }
}

#[derive(Default)]
pub struct RecordingSink {
    played: Mutex<Vec<Vec<u8>>>,
}

impl RecordingSink {
    pub fn played(&self) -> Vec<Vec<u8>> {
        self.played.lock().unwrap().clone()
    }
}

impl AudioSink for RecordingSink {
    fn play(&self, audio: &[u8]) -> anyhow::Result<()> {
        self.played.lock().unwrap().push(audio.to_vec());
        Ok(())
    }
}

fn body_json(request: &Request) -> Option<serde_json::Value> {
    serde_json::from_slice(&request.body).ok()
}

/// Matches JSON bodies that carry the given top-level field.
pub struct HasBodyField(pub &'static str);

impl Match for HasBodyField {
    fn matches(&self, request: &Request) -> bool {
        body_json(request).is_some_and(|body| body.get(self.0).is_some())
    }
}

/// Matches JSON bodies that do not carry the given top-level field.
pub struct BodyLacksField(pub &'static str);

impl Match for BodyLacksField {
    fn matches(&self, request: &Request) -> bool {
        body_json(request).is_some_and(|body| body.get(self.0).is_none())
    }
}

/// Assistant that records what it was built from and answers with a tag.
pub struct StubAssistant {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[async_trait::async_trait]
impl Assistant for StubAssistant {
    fn family(&self) -> ProviderFamily {
        crate::factory::classify_base_url(&self.base_url)
    }

    async fn text_call(
        &self,
        _messages: &[Message],
        _target: Option<&dyn RenderTarget>,
    ) -> Option<String> {
        Some(format!("{}@{}", self.api_key, self.model))
    }

    async fn image_call(&self, _request: &ImageRequest) -> Option<Vec<String>> {
        None
    }

    async fn transcribe_call(&self, _audio: &AudioFile, _language: Option<&str>) -> Option<String> {
        Some(format!("transcribed by {}", self.api_key))
    }

    async fn speak_call(&self, _text: &str) {}
}

/// Factory that counts and records every `create` call.
#[derive(Default)]
pub struct CountingFactory {
    calls: Mutex<Vec<(String, String)>>,
}

impl CountingFactory {
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl AssistantFactory for CountingFactory {
    fn create(&self, api_key: &str, base_url: &str, settings: &Settings) -> Arc<dyn Assistant> {
        self.calls
            .lock()
            .unwrap()
            .push((api_key.to_string(), base_url.to_string()));
        Arc::new(StubAssistant {
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            model: settings.model().to_string(),
        })
    }
}
