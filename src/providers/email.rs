//! Email probes: Gravatar, Hunter.io, HaveIBeenPwned.
//!
//! Declaration order is Gravatar, Hunter.io, HaveIBeenPwned; the summary
//! prefers Hunter.io's enrichment over Gravatar's profile.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::ProbeFailure;
use crate::identifier::EmailAddress;
use crate::models::Payload;
use crate::normalize::{field, text, ApiRule, Extracted, NormalizeRule};
use crate::probe::{CredentialState, HttpClients, Probe, ProbeRegistry, RawResponse};

pub const GRAVATAR: &str = "Gravatar";
pub const HUNTER: &str = "Hunter.io";
pub const HIBP: &str = "HaveIBeenPwned";

const GRAVATAR_PUBLIC: &str = "https://www.gravatar.com";

/// Build the email registry.
pub fn registry(config: &Config) -> ProbeRegistry<EmailAddress> {
    let mut registry = ProbeRegistry::new().with_priority([HUNTER, GRAVATAR]);
    registry.register(Arc::new(Gravatar::new(config)));
    registry.register(Arc::new(Hunter::new(config)));
    registry.register(Arc::new(Hibp::new(config)));
    registry
}

fn avatar_url(email: &EmailAddress) -> String {
    format!("{}/avatar/{}?s=200", GRAVATAR_PUBLIC, email.fingerprint)
}

// ═══════════════════════════════════════════════════════════════════════
// Gravatar
// ═══════════════════════════════════════════════════════════════════════

/// Hash-addressed avatar and profile lookup.
///
/// A `HEAD` on the avatar with `d=404` decides presence; when an avatar
/// exists the JSON profile is fetched for identity fields. A missing,
/// failed or non-JSON profile still counts as found, with the avatar only.
pub struct Gravatar {
    base: String,
    timeout: Duration,
}

impl Gravatar {
    pub fn new(config: &Config) -> Self {
        Self {
            base: config.endpoint("gravatar", GRAVATAR_PUBLIC),
            timeout: config.http.api_timeout(),
        }
    }
}

#[async_trait]
impl Probe<EmailAddress> for Gravatar {
    fn name(&self) -> &str {
        GRAVATAR
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn rule(&self) -> NormalizeRule<EmailAddress> {
        NormalizeRule::Api(ApiRule::new(extract_gravatar))
    }

    async fn fetch(
        &self,
        http: &HttpClients,
        query: &EmailAddress,
    ) -> Result<RawResponse, ProbeFailure> {
        let head = http
            .api
            .head(format!("{}/avatar/{}", self.base, query.fingerprint))
            .query(&[("d", "404"), ("s", "200")])
            .send()
            .await?;
        let head = RawResponse::read(head).await?;
        if !head.is_success() {
            return Ok(head);
        }

        let profile = http
            .api
            .get(format!("{}/{}.json", self.base, query.fingerprint))
            .send()
            .await;
        let profile = match profile {
            Ok(response) => RawResponse::read(response).await,
            Err(e) => Err(e.into()),
        };

        match profile {
            Ok(response) if response.is_success() && response.parse_json().is_ok() => {
                Ok(response)
            }
            Ok(response) => {
                debug!(status = response.status, "gravatar profile unavailable");
                Ok(RawResponse::status(200))
            }
            Err(failure) => {
                debug!(error = %failure, "gravatar profile unavailable");
                Ok(RawResponse::status(200))
            }
        }
    }
}

fn extract_gravatar(body: &Value, email: &EmailAddress) -> Extracted {
    let base = Payload {
        avatar: Some(avatar_url(email)),
        ..Default::default()
    };

    let Some(entry) = body.pointer("/entry/0").filter(|e| e.is_object()) else {
        return Extracted::Data(base.detail("hash", email.fingerprint.as_str()));
    };

    let list = |pointer: &str, shape: fn(&Value) -> Value| -> Value {
        entry
            .pointer(pointer)
            .and_then(Value::as_array)
            .map(|items| Value::Array(items.iter().map(shape).collect()))
            .unwrap_or(Value::Null)
    };

    Extracted::Data(
        Payload {
            name: text(entry, "/displayName").or_else(|| text(entry, "/name/formatted")),
            location: text(entry, "/currentLocation"),
            bio: text(entry, "/aboutMe"),
            ..base
        }
        .detail("profileUrl", field(entry, "/profileUrl"))
        .detail("emails", list("/emails", |e| field(e, "/value")))
        .detail(
            "accounts",
            list("/accounts", |a| {
                json!({ "shortname": field(a, "/shortname"), "url": field(a, "/url") })
            }),
        )
        .detail(
            "urls",
            list("/urls", |u| {
                json!({ "title": field(u, "/title"), "value": field(u, "/value") })
            }),
        )
        .detail("hash", email.fingerprint.as_str()),
    )
}

// ═══════════════════════════════════════════════════════════════════════
// Hunter.io
// ═══════════════════════════════════════════════════════════════════════

/// Person enrichment (name, employer, socials). Needs the `hunter` key.
pub struct Hunter {
    base: String,
    key: Option<String>,
    timeout: Duration,
}

impl Hunter {
    pub fn new(config: &Config) -> Self {
        Self {
            base: config.endpoint("hunter", "https://api.hunter.io"),
            key: config.credential("hunter"),
            timeout: config.http.api_timeout(),
        }
    }
}

#[async_trait]
impl Probe<EmailAddress> for Hunter {
    fn name(&self) -> &str {
        HUNTER
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn credential(&self) -> CredentialState {
        CredentialState::of(&self.key)
    }

    fn rule(&self) -> NormalizeRule<EmailAddress> {
        NormalizeRule::Api(ApiRule::new(extract_hunter))
    }

    async fn fetch(
        &self,
        http: &HttpClients,
        query: &EmailAddress,
    ) -> Result<RawResponse, ProbeFailure> {
        let key = self.key.as_deref().ok_or(ProbeFailure::MissingCredential)?;
        let response = http
            .api
            .get(format!("{}/v2/email-enrichment", self.base))
            .query(&[("email", query.address.as_str()), ("api_key", key)])
            .send()
            .await?;
        RawResponse::read(response).await
    }
}

fn extract_hunter(body: &Value, _q: &EmailAddress) -> Extracted {
    let d = match body.get("data") {
        None | Some(Value::Null) => return Extracted::Empty,
        Some(d) if d.is_object() => d,
        Some(_) => return Extracted::Unrecognized,
    };

    let first = text(d, "/first_name");
    let last = text(d, "/last_name");
    let name = [first.as_deref(), last.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    let country = text(d, "/country");
    let location = match text(d, "/city") {
        Some(city) => Some(
            [Some(city), text(d, "/state"), country.clone()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(", "),
        ),
        None => country,
    };

    let twitter = text(d, "/twitter_handle").map(|h| format!("https://twitter.com/{}", h));

    Extracted::Data(
        Payload {
            name: Some(name).filter(|n| !n.is_empty()),
            avatar: text(d, "/avatar"),
            location,
            website: text(d, "/website"),
            ..Default::default()
        }
        .detail("firstName", first)
        .detail("lastName", last)
        .detail("position", field(d, "/position"))
        .detail("company", field(d, "/company"))
        .detail("companyType", field(d, "/company_type"))
        .detail("industry", field(d, "/industry"))
        .detail("companySize", field(d, "/company_size"))
        .detail("linkedin", field(d, "/linkedin_url"))
        .detail("twitter", twitter)
        .detail("confidence", field(d, "/score")),
    )
}

// ═══════════════════════════════════════════════════════════════════════
// HaveIBeenPwned
// ═══════════════════════════════════════════════════════════════════════

/// Breach list for the address. Needs the `hibp` key.
pub struct Hibp {
    base: String,
    key: Option<String>,
    timeout: Duration,
}

impl Hibp {
    pub fn new(config: &Config) -> Self {
        Self {
            base: config.endpoint("hibp", "https://haveibeenpwned.com"),
            key: config.credential("hibp"),
            timeout: config.http.api_timeout(),
        }
    }
}

#[async_trait]
impl Probe<EmailAddress> for Hibp {
    fn name(&self) -> &str {
        HIBP
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn credential(&self) -> CredentialState {
        CredentialState::of(&self.key)
    }

    fn rule(&self) -> NormalizeRule<EmailAddress> {
        NormalizeRule::Api(ApiRule::new(extract_hibp))
    }

    async fn fetch(
        &self,
        http: &HttpClients,
        query: &EmailAddress,
    ) -> Result<RawResponse, ProbeFailure> {
        let key = self.key.as_deref().ok_or(ProbeFailure::MissingCredential)?;
        let response = http
            .api
            .get(format!(
                "{}/api/v3/breachedaccount/{}",
                self.base,
                urlencoding::encode(&query.address)
            ))
            .query(&[("truncateResponse", "false")])
            .header("hibp-api-key", key)
            .send()
            .await?;
        RawResponse::read(response).await
    }
}

fn extract_hibp(body: &Value, _q: &EmailAddress) -> Extracted {
    let Some(breaches) = body.as_array() else {
        return Extracted::Unrecognized;
    };
    if breaches.is_empty() {
        return Extracted::Empty;
    }

    let breaches: Vec<Value> = breaches
        .iter()
        .map(|b| {
            json!({
                "name": field(b, "/Name"),
                "domain": field(b, "/Domain"),
                "date": field(b, "/BreachDate"),
                "pwnCount": field(b, "/PwnCount"),
                "dataClasses": field(b, "/DataClasses"),
                "verified": field(b, "/IsVerified"),
                "sensitive": field(b, "/IsSensitive"),
            })
        })
        .collect();

    Extracted::Data(
        Payload::default()
            .detail("breachCount", breaches.len())
            .detail("breaches", breaches),
    )
}
