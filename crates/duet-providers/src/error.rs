//! Provider errors and the token-limit rejection classifier.

use thiserror::Error;

/// Failure of a single provider request.
///
/// Never escapes an assistant: it is logged, turned into a user notice,
/// and the call resolves to an empty result.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
        body: String,
    },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

impl ProviderError {
    /// Build an API error from a non-2xx status and its raw body.
    ///
    /// Understands the `{"error": {"message", "code", "param"}}` envelope
    /// shared by OpenAI-compatible servers and Anthropic; anything else keeps
    /// the raw body as the message.
    pub fn from_response(status: u16, body: String) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(&body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));

        let message = error
            .and_then(|e| e.get("message").and_then(|m| m.as_str()).map(String::from))
            .or_else(|| error.and_then(|e| e.as_str()).map(String::from))
            .unwrap_or_else(|| body.clone());
        let code = error.and_then(|e| {
            e.get("code")
                .and_then(|c| c.as_str())
                .or_else(|| e.get("param").and_then(|p| p.as_str()))
                .map(String::from)
        });

        ProviderError::Api {
            status,
            message,
            code,
            body,
        }
    }
}

/// Whether a failure means "this server does not accept the token-limit
/// parameter we sent".
///
/// Matches `max_tokens` or `max_completion_tokens` anywhere in the error's
/// message, code or raw body, case-insensitively. Depends on upstream error
/// wording; if a server rephrases its error, the retry silently stops firing.
pub fn is_token_limit_rejection(error: &ProviderError) -> bool {
    let haystack = match error {
        ProviderError::Api {
            message,
            code,
            body,
            ..
        } => format!("{message} {} {body}", code.as_deref().unwrap_or_default()),
        other => other.to_string(),
    }
    .to_lowercase();

    haystack.contains("max_tokens") || haystack.contains("max_completion_tokens")
}
