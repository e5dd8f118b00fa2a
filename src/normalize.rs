//! Result normalization.
//!
//! Maps each [`ProviderOutcome`] to a [`SourceResult`]. Every probe declares
//! a [`NormalizeRule`]; the rule is the only provider-specific input, so new
//! providers never require touching the fan-out.
//!
//! # Structured API providers ([`NormalizeRule::Api`])
//!
//! | Outcome | `found` | `note` |
//! |---------|---------|--------|
//! | credential missing (probe skipped) | `null` | `API key not configured` |
//! | timeout / transport error | `null` | failure description |
//! | status in `absent_statuses` (default `404`) | `false` | provider message for non-404 rejections |
//! | `401` | `null` | `Invalid API key` |
//! | `429` | `null` | `Rate limited` |
//! | other non-2xx | `null` | `API error <status>` |
//! | 2xx, extractor says empty | `false` | |
//! | 2xx, extractor returns data | `true` | |
//! | 2xx, unparseable or unrecognized body | `null` | `Unrecognized response` |
//!
//! # Heuristic web-presence providers ([`NormalizeRule::WebPresence`])
//!
//! | Outcome | `found` | `note` |
//! |---------|---------|--------|
//! | `200` | `"likely"` | `HTTP 200; no API confirmation` |
//! | `404` | `false` | |
//! | `301`/`302` to a login or not-found page | `false` | |
//! | `301`/`302` elsewhere | `"likely"` | `Redirected to <target>` |
//! | `429` | `null` | `Rate limited` |
//! | any other status | `null` | `HTTP <status>` |
//! | timeout, transport error | `null` | failure description |
//!
//! Heuristic probes never produce `true`: without a structured API there is
//! no authoritative signal.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

use crate::error::ProbeFailure;
use crate::models::{Found, Payload, SourceResult};
use crate::probe::{Probe, ProviderOutcome, RawResponse};

pub const NOTE_INVALID_KEY: &str = "Invalid API key";
pub const NOTE_RATE_LIMITED: &str = "Rate limited";
pub const NOTE_UNRECOGNIZED: &str = "Unrecognized response";
/// Note on a `"likely"` result backed only by a 200.
pub const NOTE_UNCONFIRMED: &str = "HTTP 200; no API confirmation";

/// Redirect targets that mean the profile does not exist (login walls and
/// generic not-found pages). `.` also covers `+`, `-`, `_` and space.
static MISSING_REDIRECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)login|signin|404|not.found|does.not.exist").unwrap());

/// What a provider-specific extractor made of a 2xx JSON body.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// Recognizable data: the identifier is confirmed.
    Data(Payload),
    /// Recognizable "nothing here" payload (empty list, `valid: false`, …).
    Empty,
    /// The body did not have the documented shape.
    Unrecognized,
}

/// Normalization strategy declared by each probe.
pub enum NormalizeRule<Q> {
    /// Status/redirect inspection only.
    WebPresence,
    /// Structured API with a payload extractor.
    Api(ApiRule<Q>),
}

/// Decision-table parameters for a structured API provider.
pub struct ApiRule<Q> {
    /// Statuses that mean "authoritatively absent".
    pub absent_statuses: &'static [u16],
    /// Fallback note for non-404 rejections without a provider message.
    pub rejected_note: Option<&'static str>,
    /// Maps a 2xx JSON body to data.
    pub extract: fn(&Value, &Q) -> Extracted,
}

impl<Q> ApiRule<Q> {
    pub fn new(extract: fn(&Value, &Q) -> Extracted) -> Self {
        Self {
            absent_statuses: &[404],
            rejected_note: None,
            extract,
        }
    }

    /// Replace the set of statuses treated as "absent".
    pub fn absent_on(mut self, statuses: &'static [u16]) -> Self {
        self.absent_statuses = statuses;
        self
    }

    pub fn rejected_note(mut self, note: &'static str) -> Self {
        self.rejected_note = Some(note);
        self
    }
}

/// Normalize one probe outcome.
pub fn normalize<Q: Sync>(
    probe: &dyn Probe<Q>,
    outcome: ProviderOutcome,
    query: &Q,
) -> SourceResult {
    let name = probe.name();
    let result = match (probe.rule(), outcome) {
        (_, Err(failure)) => from_failure(name, &failure),
        (NormalizeRule::WebPresence, Ok(response)) => web_presence(name, &response),
        (NormalizeRule::Api(rule), Ok(response)) => api(name, &rule, &response, query),
    };

    debug!(provider = name, found = ?result.found, "normalized");
    result.with_url(probe.profile_url(query))
}

fn from_failure(name: &str, failure: &ProbeFailure) -> SourceResult {
    SourceResult::indeterminate(name).with_note(failure.to_string())
}

fn api<Q>(name: &str, rule: &ApiRule<Q>, response: &RawResponse, query: &Q) -> SourceResult {
    let status = response.status;

    if rule.absent_statuses.contains(&status) {
        let result = SourceResult::absent(name);
        if status == 404 {
            return result;
        }
        let message = response
            .parse_json()
            .ok()
            .and_then(|body| text(&body, "/error/message"))
            .or_else(|| rule.rejected_note.map(str::to_string));
        return match message {
            Some(note) => result.with_note(note),
            None => result,
        };
    }

    match status {
        401 => return SourceResult::indeterminate(name).with_note(NOTE_INVALID_KEY),
        429 => return SourceResult::indeterminate(name).with_note(NOTE_RATE_LIMITED),
        _ if !response.is_success() => {
            return SourceResult::indeterminate(name).with_note(format!("API error {}", status))
        }
        _ => {}
    }

    let body = match response.parse_json() {
        Ok(body) => body,
        Err(e) => {
            warn!(provider = name, error = %e, "response body is not JSON");
            return SourceResult::indeterminate(name).with_note(NOTE_UNRECOGNIZED);
        }
    };

    let extracted = panic::catch_unwind(AssertUnwindSafe(|| (rule.extract)(&body, query)))
        .unwrap_or_else(|_| {
            warn!(provider = name, "extractor panicked");
            Extracted::Unrecognized
        });

    match extracted {
        Extracted::Data(payload) => SourceResult::confirmed(name, payload),
        Extracted::Empty => SourceResult::absent(name),
        Extracted::Unrecognized => {
            warn!(provider = name, "unrecognized response shape");
            SourceResult::indeterminate(name).with_note(NOTE_UNRECOGNIZED)
        }
    }
}

fn web_presence(name: &str, response: &RawResponse) -> SourceResult {
    match response.status {
        200 => SourceResult::likely(name).with_note(NOTE_UNCONFIRMED),
        404 => SourceResult::absent(name),
        301 | 302 => {
            let target = response.location.as_deref().unwrap_or_default();
            if redirects_to_missing(target) {
                SourceResult::absent(name)
            } else {
                SourceResult::likely(name).with_note(format!("Redirected to {}", target))
            }
        }
        429 => SourceResult::indeterminate(name).with_note(NOTE_RATE_LIMITED),
        status => SourceResult::indeterminate(name).with_note(format!("HTTP {}", status)),
    }
}

/// Whether a redirect target looks like a login wall or not-found page.
pub fn redirects_to_missing(location: &str) -> bool {
    MISSING_REDIRECT_RE.is_match(location)
}

/// Whether a result is one the summarizer may draw identity data from.
pub fn is_confirmed(result: &SourceResult) -> bool {
    result.found == Found::Confirmed && result.data.is_some()
}

// ═══════════════════════════════════════════════════════════════════════
// Extraction helpers
// ═══════════════════════════════════════════════════════════════════════

/// Non-empty, trimmed string at a JSON pointer.
pub fn text(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Value at a JSON pointer, or `null`.
pub fn field(value: &Value, pointer: &str) -> Value {
    value.pointer(pointer).cloned().unwrap_or(Value::Null)
}

/// A 0–1 confidence score as a rounded percentage.
pub fn percent(score: f64) -> i64 {
    (score * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::HttpClients;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        rule: fn() -> NormalizeRule<String>,
    }

    #[async_trait]
    impl Probe<String> for Fixture {
        fn name(&self) -> &str {
            "Fixture"
        }

        fn rule(&self) -> NormalizeRule<String> {
            (self.rule)()
        }

        async fn fetch(
            &self,
            _http: &HttpClients,
            _q: &String,
        ) -> Result<RawResponse, ProbeFailure> {
            unreachable!("normalizer tests never fetch")
        }
    }

    fn extract_login(body: &Value, _q: &String) -> Extracted {
        match text(body, "/login") {
            Some(login) => Extracted::Data(Payload {
                name: Some(login),
                ..Default::default()
            }),
            None if body.is_null() => Extracted::Empty,
            None => Extracted::Unrecognized,
        }
    }

    fn api_rule() -> NormalizeRule<String> {
        NormalizeRule::Api(ApiRule::new(extract_login))
    }

    fn phone_rule() -> NormalizeRule<String> {
        NormalizeRule::Api(
            ApiRule::new(extract_login)
                .absent_on(&[400, 404, 422])
                .rejected_note("Invalid phone number"),
        )
    }

    fn web_rule() -> NormalizeRule<String> {
        NormalizeRule::WebPresence
    }

    fn run(rule: fn() -> NormalizeRule<String>, outcome: ProviderOutcome) -> SourceResult {
        normalize(&Fixture { rule }, outcome, &"q".to_string())
    }

    #[test]
    fn test_api_404_is_absent() {
        let r = run(api_rule, Ok(RawResponse::status(404)));
        assert_eq!(r.found, Found::Absent);
        assert!(r.data.is_none());
    }

    #[test]
    fn test_api_401_and_429_notes() {
        let r = run(api_rule, Ok(RawResponse::status(401)));
        assert_eq!(r.found, Found::Indeterminate);
        assert_eq!(r.note.as_deref(), Some(NOTE_INVALID_KEY));

        let r = run(api_rule, Ok(RawResponse::status(429)));
        assert_eq!(r.found, Found::Indeterminate);
        assert_eq!(r.note.as_deref(), Some(NOTE_RATE_LIMITED));
    }

    #[test]
    fn test_api_other_error_is_indeterminate() {
        let r = run(api_rule, Ok(RawResponse::status(503)));
        assert_eq!(r.found, Found::Indeterminate);
        assert_eq!(r.note.as_deref(), Some("API error 503"));
    }

    #[test]
    fn test_missing_credential_note() {
        let r = run(api_rule, Err(ProbeFailure::MissingCredential));
        assert_eq!(r.found, Found::Indeterminate);
        assert_eq!(r.note.as_deref(), Some("API key not configured"));
    }

    #[test]
    fn test_timeout_is_indeterminate() {
        let r = run(api_rule, Err(ProbeFailure::Timeout(Duration::from_millis(50))));
        assert_eq!(r.found, Found::Indeterminate);
        assert_eq!(r.note.as_deref(), Some("timed out after 50ms"));
    }

    #[test]
    fn test_api_data_and_empty() {
        let r = run(api_rule, Ok(RawResponse::json(200, &json!({"login": "ada"}))));
        assert_eq!(r.found, Found::Confirmed);
        assert_eq!(r.data.unwrap().name.as_deref(), Some("ada"));

        let r = run(api_rule, Ok(RawResponse::json(200, &Value::Null)));
        assert_eq!(r.found, Found::Absent);

        let r = run(api_rule, Ok(RawResponse::json(200, &json!({"weird": true}))));
        assert_eq!(r.found, Found::Indeterminate);
        assert_eq!(r.note.as_deref(), Some(NOTE_UNRECOGNIZED));
    }

    fn extract_panics(_body: &Value, _q: &String) -> Extracted {
        panic!("unexpected shape")
    }

    #[test]
    fn test_panicking_extractor_is_indeterminate() {
        let rule = || NormalizeRule::Api(ApiRule::new(extract_panics));
        let r = run(rule, Ok(RawResponse::json(200, &json!({"login": "ada"}))));
        assert_eq!(r.found, Found::Indeterminate);
        assert_eq!(r.note.as_deref(), Some(NOTE_UNRECOGNIZED));
    }

    #[test]
    fn test_api_garbage_body_is_indeterminate() {
        let response = RawResponse {
            status: 200,
            location: None,
            body: b"<html>".to_vec(),
        };
        let r = run(api_rule, Ok(response));
        assert_eq!(r.found, Found::Indeterminate);
    }

    #[test]
    fn test_rejection_note_prefers_provider_message() {
        let body = json!({"error": {"message": "Number too short"}});
        let r = run(phone_rule, Ok(RawResponse::json(422, &body)));
        assert_eq!(r.found, Found::Absent);
        assert_eq!(r.note.as_deref(), Some("Number too short"));

        let r = run(phone_rule, Ok(RawResponse::status(400)));
        assert_eq!(r.note.as_deref(), Some("Invalid phone number"));
    }

    #[test]
    fn test_web_presence_statuses() {
        let r = run(web_rule, Ok(RawResponse::status(200)));
        assert_eq!(r.found, Found::Heuristic);
        assert_eq!(r.note.as_deref(), Some(NOTE_UNCONFIRMED));

        assert_eq!(run(web_rule, Ok(RawResponse::status(404))).found, Found::Absent);

        let r = run(web_rule, Ok(RawResponse::status(500)));
        assert_eq!(r.found, Found::Indeterminate);
        assert_eq!(r.note.as_deref(), Some("HTTP 500"));

        let r = run(web_rule, Ok(RawResponse::status(429)));
        assert_eq!(r.found, Found::Indeterminate);
        assert_eq!(r.note.as_deref(), Some(NOTE_RATE_LIMITED));
    }

    #[test]
    fn test_web_presence_never_confirms() {
        let r = run(web_rule, Ok(RawResponse::json(200, &json!({"login": "ada"}))));
        assert_eq!(r.found, Found::Heuristic);
        assert!(r.data.is_none());
    }

    #[test]
    fn test_redirect_to_login_is_absent() {
        let r = run(
            web_rule,
            Ok(RawResponse::redirect(302, "https://example.com/accounts/Login/?next=/ada")),
        );
        assert_eq!(r.found, Found::Absent);

        let r = run(web_rule, Ok(RawResponse::redirect(301, "https://example.com/ada/")));
        assert_eq!(r.found, Found::Heuristic);
        assert_eq!(r.note.as_deref(), Some("Redirected to https://example.com/ada/"));
    }

    #[test]
    fn test_redirect_markers() {
        assert!(redirects_to_missing("/SignIn"));
        assert!(redirects_to_missing("https://x.com/404"));
        assert!(redirects_to_missing("/user-does-not-exist"));
        assert!(redirects_to_missing("/page_Not_Found"));
        assert!(redirects_to_missing("https://x.com/?error=user+not+found"));
        assert!(redirects_to_missing("https://x.com/?e=does+not+exist"));
        assert!(!redirects_to_missing("https://www.example.com/ada"));
        assert!(!redirects_to_missing(""));
    }

    #[test]
    fn test_percent_rounding() {
        assert_eq!(percent(0.874), 87);
        assert_eq!(percent(0.875), 88);
        assert_eq!(percent(1.0), 100);
    }
}
