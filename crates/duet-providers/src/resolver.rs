//! Maps a capability to the assistant of its configured slot.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use duet_core::config::{Settings, Slot};
use duet_core::types::Capability;

use crate::factory::AssistantFactory;
use crate::traits::Assistant;

/// Resolves capabilities against one settings snapshot.
///
/// Each slot is built at most once per resolver, so two capabilities on the
/// same slot share one assistant.
pub struct SlotResolver<'a> {
    settings: &'a Settings,
    factory: &'a dyn AssistantFactory,
    cache: HashMap<Slot, Option<Arc<dyn Assistant>>>,
}

impl<'a> SlotResolver<'a> {
    pub fn new(settings: &'a Settings, factory: &'a dyn AssistantFactory) -> Self {
        Self {
            settings,
            factory,
            cache: HashMap::new(),
        }
    }

    /// Assistant for a capability; `None` when its slot has no API key.
    pub fn resolve(&mut self, capability: Capability) -> Option<Arc<dyn Assistant>> {
        let slot = self.settings.slot_for(capability);
        if let Some(cached) = self.cache.get(&slot) {
            return cached.clone();
        }
        let assistant = self.build(slot);
        self.cache.insert(slot, assistant.clone());
        assistant
    }

    fn build(&self, slot: Slot) -> Option<Arc<dyn Assistant>> {
        let api_key = self.settings.api_key(slot);
        if api_key.is_empty() {
            debug!(slot = slot.number(), "slot has no API key");
            return None;
        }
        let base_url = self.settings.api_base_url(slot);
        debug!(slot = slot.number(), base_url, "building assistant for slot");
        Some(self.factory.create(api_key, base_url, self.settings))
    }
}
