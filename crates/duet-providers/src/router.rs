//! Capability router: the map from capability to active assistant.
//!
//! Entry points ask the router for a capability and never learn which
//! provider backs it. The map is rebuilt wholesale whenever settings change.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use duet_core::config::{Settings, Slot};
use duet_core::notice::Notifier;
use duet_core::types::Capability;

use crate::factory::AssistantFactory;
use crate::resolver::SlotResolver;
use crate::traits::{Assistant, ProviderFamily};

/// One line of the router's current state, for status displays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteInfo {
    pub capability: Capability,
    pub slot: Slot,
    pub family: Option<ProviderFamily>,
}

pub struct CapabilityRouter {
    factory: Arc<dyn AssistantFactory>,
    notifier: Arc<dyn Notifier>,
    assistants: HashMap<Capability, Arc<dyn Assistant>>,
    slots: HashMap<Capability, Slot>,
}

impl CapabilityRouter {
    /// An empty router; call [`rebuild`](Self::rebuild) before use.
    pub fn new(factory: Arc<dyn AssistantFactory>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            factory,
            notifier,
            assistants: HashMap::new(),
            slots: HashMap::new(),
        }
    }

    /// A router already built from `settings`.
    pub fn from_settings(
        settings: &Settings,
        factory: Arc<dyn AssistantFactory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let mut router = Self::new(factory, notifier);
        router.rebuild(settings);
        router
    }

    /// Replace the whole map from a settings snapshot.
    ///
    /// In-flight requests keep the assistant they started with.
    pub fn rebuild(&mut self, settings: &Settings) {
        let mut resolver = SlotResolver::new(settings, self.factory.as_ref());
        let mut assistants = HashMap::new();
        let mut slots = HashMap::new();

        for capability in Capability::ALL {
            slots.insert(capability, settings.slot_for(capability));
            if let Some(assistant) = resolver.resolve(capability) {
                assistants.insert(capability, assistant);
            }
        }

        info!(
            configured = assistants.len(),
            text = settings.text_provider.number(),
            speech = settings.speech_provider.number(),
            "capability map rebuilt"
        );
        self.assistants = assistants;
        self.slots = slots;
    }

    /// Assistant for a capability, if configured.
    pub fn get(&self, capability: Capability) -> Option<Arc<dyn Assistant>> {
        self.assistants.get(&capability).cloned()
    }

    /// Like [`get`](Self::get), but tells the user when the capability is
    /// not configured.
    pub fn require(&self, capability: Capability) -> Option<Arc<dyn Assistant>> {
        let assistant = self.get(capability);
        if assistant.is_none() {
            let slot = self.slots.get(&capability).copied().unwrap_or_default();
            debug!(%capability, slot = slot.number(), "capability not configured");
            self.notifier.notify(&format!(
                "The {capability} provider is not configured. Set apiKey{} first.",
                slot.number()
            ));
        }
        assistant
    }

    /// Current routing, one entry per capability.
    pub fn routes(&self) -> Vec<RouteInfo> {
        Capability::ALL
            .into_iter()
            .map(|capability| RouteInfo {
                capability,
                slot: self.slots.get(&capability).copied().unwrap_or_default(),
                family: self.assistants.get(&capability).map(|a| a.family()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CountingFactory, RecordingNotifier};
    use duet_core::types::Message;

    fn router(settings: &Settings) -> (CapabilityRouter, Arc<CountingFactory>, Arc<RecordingNotifier>) {
        let factory = Arc::new(CountingFactory::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let router = CapabilityRouter::from_settings(settings, factory.clone(), notifier.clone());
        (router, factory, notifier)
    }

    #[tokio::test]
    async fn test_get_routes_to_slot() {
        let settings = Settings {
            api_key1: "sk-one".into(),
            api_key2: "sk-two".into(),
            speech_provider: Slot::Two,
            ..Settings::default()
        };
        let (router, factory, _) = router(&settings);

        let text = router.get(Capability::Text).unwrap();
        assert_eq!(
            text.text_call(&[Message::user("hi")], None).await.as_deref(),
            Some("sk-one@gpt-4o")
        );
        let speech = router.get(Capability::Speech).unwrap();
        let audio = crate::transcription::AudioFile::new("a.wav", vec![]);
        assert_eq!(
            speech.transcribe_call(&audio, None).await.as_deref(),
            Some("transcribed by sk-two")
        );
        assert_eq!(factory.calls().len(), 2);
    }

    #[test]
    fn test_require_notifies_when_unconfigured() {
        let settings = Settings {
            api_key1: "sk-one".into(),
            speech_provider: Slot::Two,
            ..Settings::default()
        };
        let (router, _, notifier) = router(&settings);

        assert!(router.require(Capability::Text).is_some());
        assert!(notifier.messages().is_empty());

        assert!(router.require(Capability::Speech).is_none());
        let notices = notifier.messages();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("speech"));
        assert!(notices[0].contains("apiKey2"));
    }

    #[tokio::test]
    async fn test_rebuild_replaces_map() {
        let mut settings = Settings {
            api_key1: "sk-old".into(),
            ..Settings::default()
        };
        let (mut router, factory, _) = router(&settings);
        let held = router.get(Capability::Text).unwrap();

        settings.api_key1 = "sk-new".into();
        settings.model_name = "gpt-4o-mini".into();
        router.rebuild(&settings);

        let fresh = router.get(Capability::Text).unwrap();
        assert_eq!(
            fresh.text_call(&[], None).await.as_deref(),
            Some("sk-new@gpt-4o-mini")
        );
        assert_eq!(
            held.text_call(&[], None).await.as_deref(),
            Some("sk-old@gpt-4o")
        );
        assert_eq!(factory.calls().len(), 2);
    }

    #[test]
    fn test_rebuild_to_unconfigured_clears() {
        let mut settings = Settings {
            api_key1: "sk-one".into(),
            ..Settings::default()
        };
        let (mut router, _, _) = router(&settings);
        assert!(router.get(Capability::Text).is_some());

        settings.api_key1.clear();
        router.rebuild(&settings);
        assert!(router.get(Capability::Text).is_none());
        assert!(router.get(Capability::Speech).is_none());
    }

    #[test]
    fn test_routes() {
        let settings = Settings {
            api_key1: "sk-one".into(),
            api_base_url1: "https://api.anthropic.com/v1".into(),
            speech_provider: Slot::Two,
            ..Settings::default()
        };
        let (router, _, _) = router(&settings);
        assert_eq!(
            router.routes(),
            vec![
                RouteInfo {
                    capability: Capability::Text,
                    slot: Slot::One,
                    family: Some(ProviderFamily::Anthropic),
                },
                RouteInfo {
                    capability: Capability::Speech,
                    slot: Slot::Two,
                    family: None,
                },
            ]
        );
    }
}
