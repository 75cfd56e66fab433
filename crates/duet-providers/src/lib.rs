//! Provider layer for Duet.
//!
//! Talks directly to OpenAI-compatible and Anthropic HTTP APIs.
//!
//! # Architecture
//!
//! - [`traits::Assistant`]: capability surface both provider families implement
//! - [`openai::OpenAiAssistant`] / [`anthropic::AnthropicAssistant`]: the two families
//! - [`factory`]: picks the family from a base URL and builds the assistant
//! - [`resolver::SlotResolver`]: maps a capability to its slot's assistant
//! - [`router::CapabilityRouter`]: the capability map entry points consult

pub mod anthropic;
pub mod error;
pub mod factory;
pub mod openai;
pub mod resolver;
pub mod router;
pub mod stream;
pub mod traits;
pub mod transcription;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use anthropic::AnthropicAssistant;
pub use error::{is_token_limit_rejection, ProviderError};
pub use factory::{classify_base_url, AssistantFactory, HttpAssistantFactory};
pub use openai::OpenAiAssistant;
pub use resolver::SlotResolver;
pub use router::{CapabilityRouter, RouteInfo};
pub use traits::{
    Assistant, AssistantOptions, AudioSink, ImageRequest, ProviderFamily, RenderTarget,
};
pub use transcription::AudioFile;
