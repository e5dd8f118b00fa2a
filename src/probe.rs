//! Provider probes and their registry.
//!
//! A [`Probe`] is one bounded call to one external provider. Probes are
//! stateless apart from the configuration injected at construction
//! (credential, base URL, timeout), so a single [`ProbeRegistry`] per search
//! kind is built at startup and shared read-only across requests.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │           ProbeRegistry<Query>            │
//! │  ┌──────────┐ ┌──────────┐ ┌───────────┐  │
//! │  │ API      │ │ Web      │ │ Custom    │  │
//! │  │ GitHub…  │ │ presence │ │ (Rust)    │  │
//! │  └──────────┘ └──────────┘ └───────────┘  │
//! └──────────────┬────────────────────────────┘
//!                ▼
//!        fanout::run_all() → Vec<ProviderOutcome>
//!                ▼
//!        normalize::normalize() → Vec<SourceResult>
//! ```
//!
//! # Custom probes
//!
//! ```rust
//! use async_trait::async_trait;
//! use trace_osint::error::ProbeFailure;
//! use trace_osint::identifier::Username;
//! use trace_osint::normalize::NormalizeRule;
//! use trace_osint::probe::{HttpClients, Probe, RawResponse};
//!
//! struct StatusPage;
//!
//! #[async_trait]
//! impl Probe<Username> for StatusPage {
//!     fn name(&self) -> &str { "Status" }
//!
//!     fn rule(&self) -> NormalizeRule<Username> {
//!         NormalizeRule::WebPresence
//!     }
//!
//!     async fn fetch(&self, _http: &HttpClients, _q: &Username) -> Result<RawResponse, ProbeFailure> {
//!         Ok(RawResponse::status(200))
//!     }
//! }
//! ```

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ProbeFailure;
use crate::normalize::NormalizeRule;

/// Budget used by probes that don't override [`Probe::timeout`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(6000);

/// Browser user agent sent by heuristic web-presence probes.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// ═══════════════════════════════════════════════════════════════════════
// Probe Trait
// ═══════════════════════════════════════════════════════════════════════

/// Whether a probe needs a credential, and whether it has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    NotRequired,
    Configured,
    Missing,
}

impl CredentialState {
    /// State for a probe holding an optional API key.
    pub fn of(key: &Option<String>) -> Self {
        match key {
            Some(_) => CredentialState::Configured,
            None => CredentialState::Missing,
        }
    }
}

/// One external provider queried for a normalized identifier `Q`.
///
/// # Lifecycle
///
/// 1. The probe is registered in a [`ProbeRegistry`] for its search kind.
/// 2. For every request, [`fetch`](Probe::fetch) is called once inside its
///    own [`timeout`](Probe::timeout), unless [`credential`](Probe::credential)
///    reports [`CredentialState::Missing`], in which case it is skipped.
/// 3. The raw response is mapped to a `SourceResult` by the probe's
///    [`rule`](Probe::rule).
///
/// `fetch` must not retry and must read the full body before returning;
/// a response dropped by the timeout is never parsed.
#[async_trait]
pub trait Probe<Q: Sync>: Send + Sync {
    /// Display name, used as `source` in results (e.g. `"GitHub"`).
    fn name(&self) -> &str;

    /// Upper bound for one call, including reading the body.
    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    /// Credential requirement. Defaults to none.
    fn credential(&self) -> CredentialState {
        CredentialState::NotRequired
    }

    /// Public URL for the identifier on this provider, if it has one.
    fn profile_url(&self, _query: &Q) -> Option<String> {
        None
    }

    /// How the raw response is turned into a `SourceResult`.
    fn rule(&self) -> NormalizeRule<Q>;

    /// Perform the outbound call.
    async fn fetch(&self, http: &HttpClients, query: &Q) -> Result<RawResponse, ProbeFailure>;
}

// ═══════════════════════════════════════════════════════════════════════
// Raw responses
// ═══════════════════════════════════════════════════════════════════════

/// Fully-read provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// `Location` header, kept for redirect inspection.
    pub location: Option<String>,
    pub body: Vec<u8>,
}

/// What the fan-out hands to the normalizer for each probe.
pub type ProviderOutcome = Result<RawResponse, ProbeFailure>;

impl RawResponse {
    /// Response with a status and no body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            location: None,
            body: Vec::new(),
        }
    }

    /// Response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            location: None,
            body: body.to_string().into_bytes(),
        }
    }

    /// Redirect response pointing at `location`.
    pub fn redirect(status: u16, location: &str) -> Self {
        Self {
            status,
            location: Some(location.to_string()),
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON. An empty body parses as `null`.
    pub fn parse_json(&self) -> Result<Value, serde_json::Error> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body)
    }

    /// Drain a `reqwest` response into a [`RawResponse`].
    pub async fn read(response: reqwest::Response) -> Result<Self, ProbeFailure> {
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();
        Ok(Self {
            status,
            location,
            body,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// HTTP clients
// ═══════════════════════════════════════════════════════════════════════

/// Shared outbound HTTP clients.
///
/// `api` follows redirects like a normal client; `web` never follows them,
/// so heuristic probes can inspect the redirect target themselves. Per-call
/// budgets are enforced by the fan-out, not by the clients.
#[derive(Debug, Clone)]
pub struct HttpClients {
    pub api: reqwest::Client,
    pub web: reqwest::Client,
}

impl HttpClients {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        let api = reqwest::Client::builder().user_agent(user_agent).build()?;
        let web = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .redirect(Policy::none())
            .build()?;
        Ok(Self { api, web })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Ordered set of probes for one search kind.
///
/// Registration order is the order of `sources` in every report. The
/// optional priority list decides which provider's `name`/`avatar` wins in
/// the summary; providers not listed follow in registration order.
pub struct ProbeRegistry<Q: Sync> {
    probes: Vec<Arc<dyn Probe<Q>>>,
    priority: Vec<String>,
}

impl<Q: Sync> ProbeRegistry<Q> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            probes: Vec::new(),
            priority: Vec::new(),
        }
    }

    /// Register a probe at the end of the declaration order.
    pub fn register(&mut self, probe: Arc<dyn Probe<Q>>) {
        self.probes.push(probe);
    }

    /// Set the summary priority order (provider names).
    pub fn with_priority<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priority = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn probes(&self) -> &[Arc<dyn Probe<Q>>] {
        &self.probes
    }

    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    /// Find a probe by display name.
    pub fn find(&self, name: &str) -> Option<&dyn Probe<Q>> {
        self.probes
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }
}

impl<Q: Sync> Default for ProbeRegistry<Q> {
    fn default() -> Self {
        Self::new()
    }
}
