//! Core data models shared by every search kind.
//!
//! These types represent the request, the per-provider result and the
//! cross-provider summary that flow through the aggregation pipeline:
//!
//! ```text
//! SearchRequest ─▶ classify ─▶ fan-out ─▶ Vec<SourceResult> ─▶ SummaryReport
//! ```
//!
//! All of them are request-scoped: created for one call and dropped once the
//! report has been handed to the caller.

use serde::ser::Serializer;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The four identifier kinds the engine can look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Username,
    Email,
    Phone,
    Image,
}

impl SearchKind {
    /// All kinds, in the order they are listed by `trace providers`.
    pub const ALL: [SearchKind; 4] = [
        SearchKind::Username,
        SearchKind::Email,
        SearchKind::Phone,
        SearchKind::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Username => "username",
            SearchKind::Email => "email",
            SearchKind::Phone => "phone",
            SearchKind::Image => "image",
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "username" => Ok(SearchKind::Username),
            "email" => Ok(SearchKind::Email),
            "phone" => Ok(SearchKind::Phone),
            "image" => Ok(SearchKind::Image),
            other => Err(format!("unknown search kind: {}", other)),
        }
    }
}

/// Raw, unvalidated query as received from the transport layer.
#[derive(Debug, Clone)]
pub enum RawQuery {
    /// Textual query (username, email, phone, or a base64/data-URI image).
    Text(String),
    /// Raw bytes (image uploads only).
    Binary(Vec<u8>),
}

/// One incoming lookup. Immutable once built.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub kind: SearchKind,
    pub query: RawQuery,
    /// Original file name for image uploads (display only).
    pub filename: Option<String>,
}

impl SearchRequest {
    /// Build a textual request.
    pub fn text(kind: SearchKind, query: impl Into<String>) -> Self {
        Self {
            kind,
            query: RawQuery::Text(query.into()),
            filename: None,
        }
    }

    /// Build an image request from raw bytes.
    pub fn image_bytes(bytes: Vec<u8>, filename: Option<String>) -> Self {
        Self {
            kind: SearchKind::Image,
            query: RawQuery::Binary(bytes),
            filename,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Found
// ═══════════════════════════════════════════════════════════════════════

/// Outcome of one probe.
///
/// Serialized in the wire encoding consumers expect:
///
/// | Variant | JSON |
/// |---------|------|
/// | `Confirmed` | `true` |
/// | `Absent` | `false` |
/// | `Indeterminate` | `null` |
/// | `Heuristic` | `"likely"` |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Found {
    /// Authoritative confirmation from a structured API.
    Confirmed,
    /// Authoritative absence.
    Absent,
    /// Timeout, transport failure, auth/rate-limit failure or missing credential.
    Indeterminate,
    /// Presence inferred from HTTP status or redirect target only.
    Heuristic,
}

impl Serialize for Found {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Found::Confirmed => serializer.serialize_bool(true),
            Found::Absent => serializer.serialize_bool(false),
            Found::Indeterminate => serializer.serialize_none(),
            Found::Heuristic => serializer.serialize_str("likely"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Payload / SourceResult
// ═══════════════════════════════════════════════════════════════════════

/// Normalized provider data.
///
/// The five identity fields are the only ones the summarizer reads; every
/// other provider-specific field lives in `details` and is flattened into
/// the same JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Payload {
    /// Insert a provider-specific field, skipping JSON nulls.
    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.details.insert(key.to_string(), value);
        }
        self
    }
}

/// Normalized result of one probe for one request.
///
/// `data` is only ever present when `found` is [`Found::Confirmed`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceResult {
    pub source: String,
    pub found: Found,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl SourceResult {
    pub fn confirmed(source: &str, data: Payload) -> Self {
        Self::bare(source, Found::Confirmed).with_data(data)
    }

    pub fn absent(source: &str) -> Self {
        Self::bare(source, Found::Absent)
    }

    pub fn likely(source: &str) -> Self {
        Self::bare(source, Found::Heuristic)
    }

    pub fn indeterminate(source: &str) -> Self {
        Self::bare(source, Found::Indeterminate)
    }

    fn bare(source: &str, found: Found) -> Self {
        Self {
            source: source.to_string(),
            found,
            data: None,
            note: None,
            url: None,
        }
    }

    fn with_data(mut self, data: Payload) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Summary
// ═══════════════════════════════════════════════════════════════════════

/// A biography attributed to the provider that exposed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourcedText {
    pub source: String,
    pub text: String,
}

/// An avatar URL attributed to the provider that exposed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourcedAvatar {
    pub source: String,
    pub url: String,
}

/// Deduplicated cross-provider synthesis for one request.
///
/// `confirmed_count + likely_count + not_found_count <= total_count`; the
/// remainder were indeterminate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub name: Option<String>,
    pub names: Vec<String>,
    pub avatar: Option<String>,
    pub avatars: Vec<SourcedAvatar>,
    pub locations: Vec<String>,
    pub websites: Vec<String>,
    pub bios: Vec<SourcedText>,
    pub confirmed_count: usize,
    pub likely_count: usize,
    pub not_found_count: usize,
    pub total_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_found_wire_encoding() {
        assert_eq!(serde_json::to_value(Found::Confirmed).unwrap(), json!(true));
        assert_eq!(serde_json::to_value(Found::Absent).unwrap(), json!(false));
        assert_eq!(serde_json::to_value(Found::Indeterminate).unwrap(), json!(null));
        assert_eq!(serde_json::to_value(Found::Heuristic).unwrap(), json!("likely"));
    }

    #[test]
    fn test_payload_flattens_details() {
        let payload = Payload {
            name: Some("Ada".into()),
            ..Default::default()
        }
        .detail("followers", 12)
        .detail("company", Value::Null);

        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v, json!({ "name": "Ada", "followers": 12 }));
    }

    #[test]
    fn test_source_result_omits_empty_fields() {
        let r = SourceResult::indeterminate("Hunter.io").with_note("Rate limited");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(
            v,
            json!({ "source": "Hunter.io", "found": null, "note": "Rate limited" })
        );
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("EMAIL".parse::<SearchKind>().unwrap(), SearchKind::Email);
        assert!("fax".parse::<SearchKind>().is_err());
    }
}
