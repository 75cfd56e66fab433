//! Settings schema: the single persisted settings document.
//!
//! JSON on disk uses **camelCase** keys (`apiKey1`, `textProvider`, ...);
//! Rust uses snake_case. `#[serde(rename_all = "camelCase")]` handles the
//! conversion.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::SettingsError;
use crate::types::Capability;

/// Default OpenAI-compatible endpoint. Slot 1 falls back to it when blank.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Default Anthropic API root.
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
/// Chat model used when `modelName` is blank.
pub const DEFAULT_MODEL: &str = "gpt-4o";
/// Transcription model used when `speechModelName` is blank.
pub const DEFAULT_SPEECH_MODEL: &str = "whisper-1";
/// Token limit used when the stored value is missing or malformed.
pub const DEFAULT_MAX_TOKENS: u32 = 500;

// ─────────────────────────────────────────────
// Provider slots
// ─────────────────────────────────────────────

/// One of the two independently configured provider credential sets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Slot {
    #[default]
    One,
    Two,
}

impl Slot {
    pub fn number(&self) -> u8 {
        match self {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Normalize any stored or typed value into a slot.
///
/// The value is parsed as an integer; only an exact `2` selects slot 2.
/// Everything else (absent, `0`, `3`, non-numeric) selects slot 1.
pub fn normalize_slot(value: &Value) -> Slot {
    match parse_integer(value) {
        Some(2) => Slot::Two,
        _ => Slot::One,
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(normalize_slot(&value))
    }
}

/// Integer parse with leading-digits semantics: `"42abc"` → 42,
/// `2.9` → 2, `"abc"` → `None`.
pub fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

// ─────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────

/// Root settings document: loaded from `~/.duet/settings.json` + env vars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_key1: String,
    pub api_base_url1: String,
    pub api_key2: String,
    /// No implicit default: blank stays blank.
    pub api_base_url2: String,
    /// Slot backing chat and prompt completion.
    pub text_provider: Slot,
    /// Slot backing transcription.
    pub speech_provider: Slot,
    pub model_name: String,
    pub speech_model_name: String,
    /// 0 means "omit the token-limit parameter".
    pub max_tokens: u32,
    /// Replace the selection with the answer instead of appending below it.
    pub replace_selection: bool,
    /// ISO-639-1 transcription hint; blank = auto-detect.
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key1: String::new(),
            api_base_url1: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key2: String::new(),
            api_base_url2: String::new(),
            text_provider: Slot::One,
            speech_provider: Slot::One,
            model_name: DEFAULT_MODEL.to_string(),
            speech_model_name: DEFAULT_SPEECH_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            replace_selection: true,
            language: String::new(),
        }
    }
}

/// Keys accepted by [`Settings::set_field`], in display order.
pub const SETTING_KEYS: &[&str] = &[
    "apiKey1",
    "apiBaseUrl1",
    "apiKey2",
    "apiBaseUrl2",
    "textProvider",
    "speechProvider",
    "modelName",
    "speechModelName",
    "maxTokens",
    "replaceSelection",
    "language",
];

impl Settings {
    /// The slot configured for a capability.
    pub fn slot_for(&self, capability: Capability) -> Slot {
        match capability {
            Capability::Text => self.text_provider,
            Capability::Speech => self.speech_provider,
        }
    }

    /// Trimmed API key of a slot.
    pub fn api_key(&self, slot: Slot) -> &str {
        match slot {
            Slot::One => self.api_key1.trim(),
            Slot::Two => self.api_key2.trim(),
        }
    }

    /// Trimmed base URL of a slot. Slot 1 falls back to the OpenAI default.
    pub fn api_base_url(&self, slot: Slot) -> &str {
        match slot {
            Slot::One => {
                let url = self.api_base_url1.trim();
                if url.is_empty() {
                    DEFAULT_OPENAI_BASE_URL
                } else {
                    url
                }
            }
            Slot::Two => self.api_base_url2.trim(),
        }
    }

    /// Chat model, or the default when blank.
    pub fn model(&self) -> &str {
        non_blank_or(&self.model_name, DEFAULT_MODEL)
    }

    /// Transcription model, or the default when blank.
    pub fn speech_model(&self) -> &str {
        non_blank_or(&self.speech_model_name, DEFAULT_SPEECH_MODEL)
    }

    /// Language hint, `None` when blank.
    pub fn language_hint(&self) -> Option<&str> {
        let lang = self.language.trim();
        (!lang.is_empty()).then_some(lang)
    }

    /// Apply a single user edit by its camelCase key.
    ///
    /// Malformed values are rejected and leave the setting unchanged.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        match key {
            "apiKey1" => self.api_key1 = value.trim().to_string(),
            "apiBaseUrl1" => {
                let url = value.trim();
                self.api_base_url1 = if url.is_empty() {
                    DEFAULT_OPENAI_BASE_URL.to_string()
                } else {
                    url.to_string()
                };
            }
            "apiKey2" => self.api_key2 = value.trim().to_string(),
            "apiBaseUrl2" => self.api_base_url2 = value.trim().to_string(),
            "textProvider" => self.text_provider = parse_slot_input(key, value)?,
            "speechProvider" => self.speech_provider = parse_slot_input(key, value)?,
            "modelName" => self.model_name = value.trim().to_string(),
            "speechModelName" => self.speech_model_name = value.trim().to_string(),
            "maxTokens" => {
                self.max_tokens = value.trim().parse::<u32>().map_err(|_| {
                    SettingsError::invalid(key, format!("'{value}' is not a non-negative integer"))
                })?;
            }
            "replaceSelection" => {
                self.replace_selection = match value.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => true,
                    "false" | "0" | "no" => false,
                    _ => return Err(SettingsError::invalid(key, "expected true or false")),
                };
            }
            "language" => self.language = value.trim().to_string(),
            other => return Err(SettingsError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

fn parse_slot_input(key: &str, value: &str) -> Result<Slot, SettingsError> {
    match value.trim() {
        "1" => Ok(Slot::One),
        "2" => Ok(Slot::Two),
        _ => Err(SettingsError::invalid(key, "provider must be 1 or 2")),
    }
}

fn non_blank_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_slot() {
        assert_eq!(normalize_slot(&json!(2)), Slot::Two);
        assert_eq!(normalize_slot(&json!("2")), Slot::Two);
        assert_eq!(normalize_slot(&json!(1)), Slot::One);
        assert_eq!(normalize_slot(&json!(3)), Slot::One);
        assert_eq!(normalize_slot(&json!(0)), Slot::One);
        assert_eq!(normalize_slot(&Value::Null), Slot::One);
        assert_eq!(normalize_slot(&json!("two")), Slot::One);
        assert_eq!(normalize_slot(&json!(true)), Slot::One);
    }

    #[test]
    fn test_parse_integer_leading_digits() {
        assert_eq!(parse_integer(&json!("600abc")), Some(600));
        assert_eq!(parse_integer(&json!("  42")), Some(42));
        assert_eq!(parse_integer(&json!("-5")), Some(-5));
        assert_eq!(parse_integer(&json!(2.9)), Some(2));
        assert_eq!(parse_integer(&json!("abc")), None);
        assert_eq!(parse_integer(&json!("")), None);
        assert_eq!(parse_integer(&json!([1])), None);
    }

    #[test]
    fn test_slot_serde() {
        let settings: Settings =
            serde_json::from_value(json!({"textProvider": "2", "speechProvider": 7})).unwrap();
        assert_eq!(settings.text_provider, Slot::Two);
        assert_eq!(settings.speech_provider, Slot::One);

        let raw = serde_json::to_value(&settings).unwrap();
        assert_eq!(raw["textProvider"], 2);
        assert_eq!(raw["speechProvider"], 1);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.api_base_url1, DEFAULT_OPENAI_BASE_URL);
        assert!(settings.api_base_url2.is_empty());
        assert_eq!(settings.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(settings.slot_for(Capability::Text), Slot::One);
    }

    #[test]
    fn test_slot_accessors_trim_and_default() {
        let settings = Settings {
            api_key1: "  key-1 ".into(),
            api_base_url1: "   ".into(),
            api_key2: "\t".into(),
            api_base_url2: "".into(),
            ..Default::default()
        };
        assert_eq!(settings.api_key(Slot::One), "key-1");
        assert_eq!(settings.api_base_url(Slot::One), DEFAULT_OPENAI_BASE_URL);
        assert_eq!(settings.api_key(Slot::Two), "");
        assert_eq!(settings.api_base_url(Slot::Two), "");
    }

    #[test]
    fn test_model_fallbacks() {
        let settings = Settings {
            model_name: " ".into(),
            speech_model_name: "".into(),
            ..Default::default()
        };
        assert_eq!(settings.model(), DEFAULT_MODEL);
        assert_eq!(settings.speech_model(), DEFAULT_SPEECH_MODEL);
        assert_eq!(settings.language_hint(), None);
    }

    #[test]
    fn test_set_field_valid() {
        let mut settings = Settings::default();
        settings.set_field("apiKey2", " sk-ant ").unwrap();
        settings.set_field("textProvider", "2").unwrap();
        settings.set_field("maxTokens", "0").unwrap();
        settings.set_field("replaceSelection", "false").unwrap();
        settings.set_field("apiBaseUrl1", "").unwrap();

        assert_eq!(settings.api_key2, "sk-ant");
        assert_eq!(settings.text_provider, Slot::Two);
        assert_eq!(settings.max_tokens, 0);
        assert!(!settings.replace_selection);
        assert_eq!(settings.api_base_url1, DEFAULT_OPENAI_BASE_URL);
    }

    #[test]
    fn test_set_field_rejects_malformed_max_tokens() {
        let mut settings = Settings::default();
        let err = settings.set_field("maxTokens", "lots").unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
        assert_eq!(settings.max_tokens, DEFAULT_MAX_TOKENS);

        assert!(settings.set_field("maxTokens", "-1").is_err());
        assert_eq!(settings.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_set_field_rejects_bad_slot_and_unknown_key() {
        let mut settings = Settings::default();
        assert!(settings.set_field("speechProvider", "3").is_err());
        assert_eq!(settings.speech_provider, Slot::One);
        assert_eq!(
            settings.set_field("imageModelName", "dall-e-3"),
            Err(SettingsError::UnknownField("imageModelName".into()))
        );
    }

    #[test]
    fn test_setting_keys_are_all_settable() {
        let mut settings = Settings::default();
        for key in SETTING_KEYS {
            let value = match *key {
                "textProvider" | "speechProvider" => "1",
                "maxTokens" => "10",
                "replaceSelection" => "true",
                _ => "x",
            };
            settings.set_field(key, value).unwrap();
        }
    }
}
