//! The aggregation engine.
//!
//! [`SearchEngine::aggregate`] is the single entry point for every search
//! kind. The pipeline is identical for all four; only the classifier and
//! the registered probes differ:
//!
//! ```text
//! SearchRequest
//!   └─▶ identifier::*::classify    (ValidationError short-circuits here)
//!         └─▶ fanout::run_all      (all probes, concurrently, each bounded)
//!               └─▶ normalize      (one SourceResult per probe, in order)
//!                     └─▶ summarize
//!                           └─▶ kind-specific report
//! ```
//!
//! A report always carries one source entry per registered probe, even
//! when every provider failed. The only exception is an email that fails
//! syntax validation, which yields `valid: false` and no provider calls.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::info;

use crate::config::Config;
use crate::error::{SearchError, ValidationError};
use crate::fanout::run_all;
use crate::identifier::{EmailAddress, ImageQuery, PhoneNumber, Username};
use crate::models::{Payload, RawQuery, SearchKind, SearchRequest, SourceResult, SummaryReport};
use crate::normalize::normalize;
use crate::probe::{HttpClients, ProbeRegistry};
use crate::providers::Registries;
use crate::summary::{by_priority, summarize};

/// Entities shaped like "Firstname Lastname".
static PERSON_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-z]+ [A-Z][a-z]+").unwrap());

/// How many top web entities are considered for `possibleNames`.
const NAME_CANDIDATES: usize = 5;

// ═══════════════════════════════════════════════════════════════════════
// Reports
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsernameReport {
    pub username: String,
    pub search_type: SearchKind,
    pub platforms: Vec<SourceResult>,
    pub summary: SummaryReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailParts {
    pub local: String,
    pub domain: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailReport {
    pub email: String,
    pub search_type: SearchKind,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_parts: Option<EmailParts>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryReport>,
}

impl EmailReport {
    /// Report for an address that failed syntax validation.
    pub fn invalid(address: &str) -> Self {
        Self {
            email: address.to_string(),
            search_type: SearchKind::Email,
            valid: false,
            error: Some(ValidationError::InvalidEmail.to_string()),
            email_hash: None,
            email_parts: None,
            sources: Vec::new(),
            summary: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneReport {
    pub phone: String,
    pub search_type: SearchKind,
    pub cleaned: String,
    pub digits: String,
    pub possible_formats: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_flag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialing_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ported_network: Option<String>,
    pub sources: Vec<SourceResult>,
    pub summary: SummaryReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReport {
    pub search_type: SearchKind,
    pub filename: String,
    pub size_bytes: usize,
    pub mime_type: String,
    pub has_results: bool,
    pub possible_names: Vec<String>,
    pub best_guess: Vec<String>,
    pub face_count: u64,
    pub sources: Vec<SourceResult>,
    pub summary: SummaryReport,
}

/// Report for any search kind, serialized as the inner report.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SearchReport {
    Username(UsernameReport),
    Email(EmailReport),
    Phone(PhoneReport),
    Image(ImageReport),
}

impl SearchReport {
    pub fn kind(&self) -> SearchKind {
        match self {
            SearchReport::Username(_) => SearchKind::Username,
            SearchReport::Email(_) => SearchKind::Email,
            SearchReport::Phone(_) => SearchKind::Phone,
            SearchReport::Image(_) => SearchKind::Image,
        }
    }

    /// Per-provider results, in registration order.
    pub fn sources(&self) -> &[SourceResult] {
        match self {
            SearchReport::Username(r) => &r.platforms,
            SearchReport::Email(r) => &r.sources,
            SearchReport::Phone(r) => &r.sources,
            SearchReport::Image(r) => &r.sources,
        }
    }

    pub fn summary(&self) -> Option<&SummaryReport> {
        match self {
            SearchReport::Username(r) => Some(&r.summary),
            SearchReport::Email(r) => r.summary.as_ref(),
            SearchReport::Phone(r) => Some(&r.summary),
            SearchReport::Image(r) => Some(&r.summary),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════════════════

/// Shared, read-only search engine.
///
/// Holds the outbound HTTP clients and one probe registry per kind. Built
/// once at startup; safe to share behind an `Arc` across requests.
pub struct SearchEngine {
    http: HttpClients,
    max_image_bytes: usize,
    registries: Registries,
}

impl SearchEngine {
    /// Engine with the built-in providers, configured from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = HttpClients::new(&config.http.user_agent)?;
        Ok(Self::new(
            http,
            config.http.max_image_bytes,
            Registries::builtin(config),
        ))
    }

    /// Engine with custom registries.
    pub fn new(http: HttpClients, max_image_bytes: usize, registries: Registries) -> Self {
        Self {
            http,
            max_image_bytes,
            registries,
        }
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Classify `request` and run the search for its kind.
    ///
    /// Fails only on malformed input. Provider failures are reported inside
    /// the returned report.
    pub async fn aggregate(&self, request: &SearchRequest) -> Result<SearchReport, SearchError> {
        let report = match request.kind {
            SearchKind::Username => {
                let username = Username::classify(&request.query)?;
                SearchReport::Username(self.search_username(&username).await)
            }
            SearchKind::Email => match EmailAddress::classify(&request.query) {
                Ok(email) => SearchReport::Email(self.search_email(&email).await),
                Err(ValidationError::InvalidEmail) => {
                    let raw = match &request.query {
                        RawQuery::Text(text) => text.as_str(),
                        RawQuery::Binary(_) => "",
                    };
                    info!(kind = "email", "invalid email, no providers queried");
                    SearchReport::Email(EmailReport::invalid(&EmailAddress::normalize(raw)))
                }
                Err(e) => return Err(e.into()),
            },
            SearchKind::Phone => {
                let phone = PhoneNumber::classify(&request.query)?;
                SearchReport::Phone(self.search_phone(&phone).await)
            }
            SearchKind::Image => {
                let image = ImageQuery::classify(
                    &request.query,
                    request.filename.clone(),
                    self.max_image_bytes,
                )?;
                SearchReport::Image(self.search_image(&image).await)
            }
        };
        Ok(report)
    }

    pub async fn search_username(&self, username: &Username) -> UsernameReport {
        let (platforms, summary) = self
            .sweep(SearchKind::Username, &self.registries.username, username)
            .await;
        UsernameReport {
            username: username.as_str().to_string(),
            search_type: SearchKind::Username,
            platforms,
            summary,
        }
    }

    pub async fn search_email(&self, email: &EmailAddress) -> EmailReport {
        let (sources, summary) = self.sweep(SearchKind::Email, &self.registries.email, email).await;
        EmailReport {
            email: email.address.clone(),
            search_type: SearchKind::Email,
            valid: true,
            error: None,
            email_hash: Some(email.fingerprint.clone()),
            email_parts: Some(EmailParts {
                local: email.local.clone(),
                domain: email.domain.clone(),
            }),
            sources,
            summary: Some(summary),
        }
    }

    pub async fn search_phone(&self, phone: &PhoneNumber) -> PhoneReport {
        let registry = &self.registries.phone;
        let (sources, summary) = self.sweep(SearchKind::Phone, registry, phone).await;

        let provider = by_priority(&sources, registry.priority())
            .into_iter()
            .find_map(|r| r.data.as_ref());
        let from_provider = |key: &str| provider.and_then(|p| detail_text(p, key));
        let local = phone.country;

        PhoneReport {
            phone: phone.raw.clone(),
            search_type: SearchKind::Phone,
            cleaned: phone.cleaned.clone(),
            digits: phone.digits.clone(),
            possible_formats: phone.possible_formats(),
            country: from_provider("country").or_else(|| local.map(|c| c.country.to_string())),
            country_flag: local.map(|c| c.flag.to_string()),
            timezone: from_provider("timezone").or_else(|| local.map(|c| c.timezone.to_string())),
            dialing_code: from_provider("dialingCode")
                .or_else(|| local.map(|c| c.code.to_string())),
            carrier: from_provider("carrier"),
            line_type: from_provider("type"),
            formatted: from_provider("formatted"),
            local_format: from_provider("local"),
            valid: provider.and_then(|p| p.details.get("valid")).and_then(Value::as_bool),
            caller_name: from_provider("callerName"),
            line_status: from_provider("lineStatus"),
            ported_network: from_provider("portedNetwork"),
            sources,
            summary,
        }
    }

    pub async fn search_image(&self, image: &ImageQuery) -> ImageReport {
        let registry = &self.registries.image;
        let (sources, summary) = self.sweep(SearchKind::Image, registry, image).await;

        let vision = by_priority(&sources, registry.priority())
            .into_iter()
            .find_map(|r| r.data.as_ref());
        let possible_names = detail_array(vision, "entities")
            .iter()
            .take(NAME_CANDIDATES)
            .filter_map(|e| e.get("description").and_then(Value::as_str))
            .filter(|d| PERSON_NAME_RE.is_match(d))
            .map(str::to_string)
            .collect();
        let best_guess = detail_array(vision, "bestGuess")
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        let face_count = vision
            .and_then(|p| p.details.get("faceCount"))
            .and_then(Value::as_u64)
            .unwrap_or(0);

        ImageReport {
            search_type: SearchKind::Image,
            filename: image.filename.clone(),
            size_bytes: image.size_bytes,
            mime_type: image.mime.clone(),
            has_results: summary.confirmed_count > 0,
            possible_names,
            best_guess,
            face_count,
            sources,
            summary,
        }
    }

    /// Fan out, normalize in declaration order, summarize.
    async fn sweep<Q: Sync>(
        &self,
        kind: SearchKind,
        registry: &ProbeRegistry<Q>,
        query: &Q,
    ) -> (Vec<SourceResult>, SummaryReport) {
        let started = Instant::now();
        let probes = registry.probes();
        let outcomes = run_all(&self.http, probes, query).await;

        let results: Vec<SourceResult> = probes
            .iter()
            .zip(outcomes)
            .map(|(probe, outcome)| normalize(probe.as_ref(), outcome, query))
            .collect();
        let summary = summarize(&results, registry.priority());

        info!(
            kind = %kind,
            providers = results.len(),
            confirmed = summary.confirmed_count,
            likely = summary.likely_count,
            not_found = summary.not_found_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search complete"
        );

        (results, summary)
    }
}

fn detail_array<'a>(payload: Option<&'a Payload>, key: &str) -> &'a [Value] {
    payload
        .and_then(|p| p.details.get(key))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn detail_text(payload: &Payload, key: &str) -> Option<String> {
    payload
        .details
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeFailure;
    use crate::models::Found;
    use crate::normalize::{ApiRule, Extracted, NormalizeRule};
    use crate::probe::{Probe, RawResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Answers every query with a fixed JSON body, counting calls.
    struct Canned {
        name: &'static str,
        status: u16,
        body: Value,
        calls: Arc<AtomicUsize>,
    }

    fn passthrough<Q>(body: &Value, _q: &Q) -> Extracted {
        if body.is_null() {
            return Extracted::Empty;
        }
        Extracted::Data(Payload {
            name: body.get("name").and_then(Value::as_str).map(str::to_string),
            ..Default::default()
        }
        .detail("country", body.get("country").cloned().unwrap_or(Value::Null))
        .detail("entities", body.get("entities").cloned().unwrap_or(Value::Null)))
    }

    #[async_trait]
    impl<Q: Sync> Probe<Q> for Canned {
        fn name(&self) -> &str {
            self.name
        }

        fn rule(&self) -> NormalizeRule<Q> {
            NormalizeRule::Api(ApiRule::new(passthrough::<Q>))
        }

        async fn fetch(&self, _http: &HttpClients, _q: &Q) -> Result<RawResponse, ProbeFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawResponse::json(self.status, &self.body))
        }
    }

    fn canned(
        name: &'static str,
        status: u16,
        body: Value,
        calls: &Arc<AtomicUsize>,
    ) -> Arc<Canned> {
        Arc::new(Canned {
            name,
            status,
            body,
            calls: calls.clone(),
        })
    }

    fn engine(registries: Registries) -> SearchEngine {
        SearchEngine::new(HttpClients::new("test").unwrap(), 1024, registries)
    }

    #[tokio::test]
    async fn test_invalid_email_calls_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registries = Registries::empty();
        registries.email.register(canned("A", 200, json!({"name": "x"}), &calls));
        let engine = engine(registries);

        let report = engine
            .aggregate(&SearchRequest::text(SearchKind::Email, "not-an-email"))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let SearchReport::Email(email) = report else {
            panic!("expected email report");
        };
        assert!(!email.valid);
        assert_eq!(email.error.as_deref(), Some("Invalid email format"));
        let v = serde_json::to_value(&email).unwrap();
        assert!(v.get("sources").is_none());
        assert!(v.get("summary").is_none());
    }

    #[tokio::test]
    async fn test_one_source_per_probe_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registries = Registries::empty();
        registries.username.register(canned("First", 404, Value::Null, &calls));
        registries.username.register(canned("Second", 503, Value::Null, &calls));
        registries.username.register(canned("Third", 200, json!({"name": "Ada"}), &calls));
        let engine = engine(registries);

        let report = engine
            .aggregate(&SearchRequest::text(SearchKind::Username, "@ada"))
            .await
            .unwrap();

        let names: Vec<&str> = report.sources().iter().map(|s| s.source.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
        let found: Vec<Found> = report.sources().iter().map(|s| s.found).collect();
        assert_eq!(found, vec![Found::Absent, Found::Indeterminate, Found::Confirmed]);
        assert_eq!(report.summary().unwrap().name.as_deref(), Some("Ada"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let SearchReport::Username(r) = report else {
            panic!("expected username report");
        };
        assert_eq!(r.username, "ada");
    }

    #[tokio::test]
    async fn test_validation_errors_propagate() {
        let engine = engine(Registries::empty());
        let err = engine
            .aggregate(&SearchRequest::text(SearchKind::Username, "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Validation(ValidationError::EmptyQuery(_))));

        let err = engine
            .aggregate(&SearchRequest::image_bytes(vec![0u8; 2048], None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SearchError::Validation(ValidationError::ImageTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_phone_provider_country_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registries = Registries::empty();
        registries
            .phone
            .register(canned("Phones", 200, json!({"country": "Canada"}), &calls));
        let engine = engine(registries);

        let SearchReport::Phone(report) = engine
            .aggregate(&SearchRequest::text(SearchKind::Phone, "+1 (613) 555-0100"))
            .await
            .unwrap()
        else {
            panic!("expected phone report");
        };

        assert_eq!(report.country.as_deref(), Some("Canada"));
        assert_eq!(report.dialing_code.as_deref(), Some("+1"));
        assert_eq!(report.digits, "16135550100");
        assert_eq!(report.country_flag.as_deref(), Some("🇺🇸"));
    }

    #[tokio::test]
    async fn test_phone_without_providers_uses_local_detection() {
        let engine = engine(Registries::empty());
        let SearchReport::Phone(report) = engine
            .aggregate(&SearchRequest::text(SearchKind::Phone, "+44 20 7946 0000"))
            .await
            .unwrap()
        else {
            panic!("expected phone report");
        };
        assert_eq!(report.country.as_deref(), Some("United Kingdom"));
        assert!(report.sources.is_empty());
        assert_eq!(report.summary.total_count, 0);
    }

    #[tokio::test]
    async fn test_image_possible_names() {
        let calls = Arc::new(AtomicUsize::new(0));
        let entities = json!([
            { "description": "Ada Lovelace", "score": 91 },
            { "description": "mathematician", "score": 80 },
            { "description": "Charles Babbage", "score": 60 }
        ]);
        let mut registries = Registries::empty();
        registries
            .image
            .register(canned("Vision", 200, json!({ "entities": entities }), &calls));
        let engine = engine(registries);

        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        let SearchReport::Image(report) = engine
            .aggregate(&SearchRequest::image_bytes(png, Some("a.png".into())))
            .await
            .unwrap()
        else {
            panic!("expected image report");
        };

        assert!(report.has_results);
        assert_eq!(report.possible_names, vec!["Ada Lovelace", "Charles Babbage"]);
        assert_eq!(report.filename, "a.png");
        assert_eq!(report.size_bytes, 8);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registries = Registries::empty();
        registries.email.register(canned("A", 200, json!({"name": "Ada"}), &calls));
        registries.email.register(canned("B", 404, Value::Null, &calls));
        let engine = engine(registries);
        let request = SearchRequest::text(SearchKind::Email, "Ada@Example.com");

        let first = serde_json::to_string(&engine.aggregate(&request).await.unwrap()).unwrap();
        let second = serde_json::to_string(&engine.aggregate(&request).await.unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
