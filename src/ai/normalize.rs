//! Turns free-form model output into typed records.
//!
//! Two modes are supported. In schema-constrained mode the provider was
//! asked for JSON matching a declared schema, so the text is parsed as-is
//! and any parse failure is a hard error. In free-text mode the JSON is
//! buried in prose: the outermost delimiters are located by scanning and
//! whatever lies between them is parsed on a best-effort basis, with any
//! failure reported as "no results".

use std::{fmt, str::FromStr};

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::provider::{GenerativeModel, GroundingReference, ProviderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizeMode {
    SchemaConstrained,
    FreeText,
}

impl FromStr for NormalizeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "schema" | "schema-constrained" => Ok(Self::SchemaConstrained),
            "free-text" | "freetext" | "text" => Ok(Self::FreeText),
            other => Err(format!("unknown normalize mode: {other}")),
        }
    }
}

impl fmt::Display for NormalizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaConstrained => f.write_str("schema"),
            Self::FreeText => f.write_str("free-text"),
        }
    }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("AI provider not configured")]
    NotConfigured,
    #[error("AI provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("unexpected AI provider response: {0}")]
    UnexpectedResponse(String),
    #[error("no results")]
    NoResults,
}

impl From<ProviderError> for NormalizeError {
    fn from(e: ProviderError) -> Self {
        NormalizeError::ProviderUnavailable(e.to_string())
    }
}

/// Resolves the configured model, failing before any network call if there is none.
pub fn require_model(
    model: Option<&dyn GenerativeModel>,
) -> Result<&dyn GenerativeModel, NormalizeError> {
    model.ok_or(NormalizeError::NotConfigured)
}

/// Slice from the first `open` to the last `close`, both inclusive.
pub fn extract_delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&text[start..end + close.len_utf8()])
}

/// Best-effort extraction of a JSON array embedded in prose.
pub fn extract_array<T: DeserializeOwned>(text: &str) -> Option<Vec<T>> {
    let slice = extract_delimited(text, '[', ']')?;
    serde_json::from_str(slice).ok()
}

/// Best-effort extraction of a JSON object embedded in prose.
pub fn extract_object<T: DeserializeOwned>(text: &str) -> Option<T> {
    let slice = extract_delimited(text, '{', '}')?;
    serde_json::from_str(slice).ok()
}

/// Normalizes a response that should describe a single object.
pub fn object<T: DeserializeOwned>(mode: NormalizeMode, text: &str) -> Result<T, NormalizeError> {
    let value = match mode {
        NormalizeMode::SchemaConstrained => parse_strict(text)?,
        NormalizeMode::FreeText => extract_object::<Value>(text).ok_or(NormalizeError::NoResults)?,
    };
    if !value.is_object() {
        return Err(malformed(mode, "expected a JSON object"));
    }
    from_value(mode, value)
}

/// Normalizes a response that should describe a list of objects. An empty
/// list is `NoResults`.
pub fn list<T: DeserializeOwned>(mode: NormalizeMode, text: &str) -> Result<Vec<T>, NormalizeError> {
    let value = match mode {
        NormalizeMode::SchemaConstrained => parse_strict(text)?,
        NormalizeMode::FreeText => extract_array::<Value>(text)
            .map(Value::Array)
            .ok_or(NormalizeError::NoResults)?,
    };
    let Value::Array(elements) = value else {
        return Err(malformed(mode, "expected a JSON array"));
    };
    if elements.iter().any(|e| !e.is_object()) {
        return Err(malformed(mode, "expected an array of objects"));
    }
    let items: Vec<T> = from_value(mode, Value::Array(elements))?;
    if items.is_empty() {
        return Err(NormalizeError::NoResults);
    }
    Ok(items)
}

fn parse_strict(text: &str) -> Result<Value, NormalizeError> {
    if text.trim().is_empty() {
        return Err(NormalizeError::UnexpectedResponse("empty response".into()));
    }
    serde_json::from_str(text).map_err(|e| NormalizeError::UnexpectedResponse(e.to_string()))
}

fn from_value<T: DeserializeOwned>(mode: NormalizeMode, value: Value) -> Result<T, NormalizeError> {
    serde_json::from_value(value).map_err(|e| malformed(mode, &e.to_string()))
}

// Schema output that has the wrong shape is a provider fault; prose that
// does is just an unusable answer.
fn malformed(mode: NormalizeMode, detail: &str) -> NormalizeError {
    match mode {
        NormalizeMode::SchemaConstrained => NormalizeError::UnexpectedResponse(detail.to_string()),
        NormalizeMode::FreeText => NormalizeError::NoResults,
    }
}

/// Pairs reference `i` with item `i`. Extra items or references are left
/// alone. Returns how many items received a reference.
pub fn attach_references<T, F>(items: &mut [T], references: &[GroundingReference], mut attach: F) -> usize
where
    F: FnMut(&mut T, &GroundingReference),
{
    let mut attached = 0;
    for (item, reference) in items.iter_mut().zip(references) {
        attach(item, reference);
        attached += 1;
    }
    attached
}

/// Numbers, numeric strings, or nothing. Anything else becomes `None`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

/// Strings pass through; numbers and booleans are stringified; anything else is `None`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Some(v.to_string()),
        _ => None,
    })
}

/// Like [`lenient_string`] but missing values become the empty string.
pub fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}
