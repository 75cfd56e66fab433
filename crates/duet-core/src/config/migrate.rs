//! Legacy settings migration.
//!
//! Older releases stored a single `apiKey` / `openAIapiKey` /
//! `anthropicApiKey`, a single `apiBaseUrl`, a third provider slot and a
//! handful of image-generation fields. [`migrate`] turns any of those shapes
//! into a patch in the current schema; [`apply_patch`] merges that patch
//! over [`Settings::default`].

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::schema::{
    normalize_slot, parse_integer, Settings, DEFAULT_MAX_TOKENS, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_SPEECH_MODEL,
};

/// Legacy single-key fields, in priority order.
const LEGACY_KEY_FIELDS: &[&str] = &["apiKey", "openAIapiKey", "anthropicApiKey"];

/// Fields that no longer exist and are dropped on load.
const OBSOLETE_FIELDS: &[&str] = &[
    "apiKey",
    "openAIapiKey",
    "anthropicApiKey",
    "apiBaseUrl",
    "apiKey3",
    "apiBaseUrl3",
    "imageProvider",
    "imageModelName",
    "imgFolder",
    "imageSize",
    "imageCount",
    "imageHd",
    "provider",
    "legacyModelName",
    "mySetting",
];

const STRING_FIELDS: &[&str] = &[
    "apiKey1",
    "apiBaseUrl1",
    "apiKey2",
    "apiBaseUrl2",
    "modelName",
    "speechModelName",
    "language",
];

const TRIMMED_FIELDS: &[&str] = &["apiKey1", "apiBaseUrl1", "apiKey2", "apiBaseUrl2"];

/// Normalize a raw (possibly legacy, possibly absent) settings document
/// into a patch in the current schema.
///
/// Pure: the input is not modified.
pub fn migrate(raw: Option<&Value>) -> Map<String, Value> {
    let Some(Value::Object(raw)) = raw else {
        return Map::new();
    };
    let mut patch = raw.clone();

    // Legacy single key → apiKey1
    if !patch.get("apiKey1").is_some_and(Value::is_string) {
        let legacy = LEGACY_KEY_FIELDS.iter().find_map(|field| {
            raw.get(*field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(|key| (*field, key))
        });
        if let Some((field, key)) = legacy {
            debug!(from = field, "migrated legacy API key into apiKey1");
            patch.insert("apiKey1".into(), Value::String(key.to_string()));
        }
    }

    // Legacy apiBaseUrl → apiBaseUrl1
    if !patch.get("apiBaseUrl1").is_some_and(Value::is_string) {
        let url = match raw.get("apiBaseUrl").and_then(Value::as_str) {
            Some(legacy) => {
                debug!("migrated legacy apiBaseUrl into apiBaseUrl1");
                legacy.to_string()
            }
            None => DEFAULT_OPENAI_BASE_URL.to_string(),
        };
        patch.insert("apiBaseUrl1".into(), Value::String(url));
    }

    // Wrong-typed fields fall back to defaults rather than failing the load.
    for field in STRING_FIELDS {
        if patch.get(*field).is_some_and(|v| !v.is_string()) {
            warn!(field = *field, "dropping non-string setting");
            patch.remove(*field);
        }
    }
    if patch.get("replaceSelection").is_some_and(|v| !v.is_boolean()) {
        warn!("dropping non-boolean replaceSelection");
        patch.remove("replaceSelection");
    }

    for field in TRIMMED_FIELDS {
        if let Some(Value::String(s)) = patch.get_mut(*field) {
            *s = s.trim().to_string();
        }
    }
    if patch
        .get("apiBaseUrl1")
        .and_then(Value::as_str)
        .is_some_and(str::is_empty)
    {
        patch.insert(
            "apiBaseUrl1".into(),
            Value::String(DEFAULT_OPENAI_BASE_URL.to_string()),
        );
    }

    for field in ["textProvider", "speechProvider"] {
        let slot = normalize_slot(raw.get(field).unwrap_or(&Value::Null));
        patch.insert(field.into(), Value::from(slot.number()));
    }

    let speech_model_blank = patch
        .get("speechModelName")
        .and_then(Value::as_str)
        .map_or(true, |m| m.trim().is_empty());
    if speech_model_blank {
        patch.insert(
            "speechModelName".into(),
            Value::String(DEFAULT_SPEECH_MODEL.to_string()),
        );
    }

    let max_tokens = raw
        .get("maxTokens")
        .and_then(parse_integer)
        .or_else(|| patch.get("maxTokens").and_then(parse_integer))
        .unwrap_or(i64::from(DEFAULT_MAX_TOKENS));
    let max_tokens = if max_tokens < 0 {
        DEFAULT_MAX_TOKENS
    } else {
        u32::try_from(max_tokens).unwrap_or(u32::MAX)
    };
    patch.insert("maxTokens".into(), Value::from(max_tokens));

    for field in OBSOLETE_FIELDS {
        patch.remove(*field);
    }

    patch
}

/// Merge a migrated patch over the defaults.
pub fn apply_patch(patch: Map<String, Value>) -> Settings {
    let mut merged = match serde_json::to_value(Settings::default()) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    merged.extend(patch);

    serde_json::from_value(Value::Object(merged)).unwrap_or_else(|e| {
        warn!(error = %e, "failed to apply settings patch, using defaults");
        Settings::default()
    })
}

/// Migrate and merge in one step.
pub fn settings_from_raw(raw: Option<&Value>) -> Settings {
    apply_patch(migrate(raw))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
