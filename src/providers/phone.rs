//! Phone probe: AbstractAPI Phone Intelligence.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::ProbeFailure;
use crate::identifier::PhoneNumber;
use crate::models::Payload;
use crate::normalize::{field, text, ApiRule, Extracted, NormalizeRule};
use crate::probe::{CredentialState, HttpClients, Probe, ProbeRegistry, RawResponse};

pub const ABSTRACT_API: &str = "AbstractAPI";

/// Build the phone registry.
pub fn registry(config: &Config) -> ProbeRegistry<PhoneNumber> {
    let mut registry = ProbeRegistry::new().with_priority([ABSTRACT_API]);
    registry.register(Arc::new(AbstractApi::new(config)));
    registry
}

/// Validity, carrier and line type for a number. Needs the `abstractapi`
/// key. The number is sent digits-only.
pub struct AbstractApi {
    base: String,
    key: Option<String>,
    timeout: Duration,
}

impl AbstractApi {
    pub fn new(config: &Config) -> Self {
        Self {
            base: config.endpoint("abstractapi", "https://phoneintelligence.abstractapi.com"),
            key: config.credential("abstractapi"),
            timeout: config.http.api_timeout(),
        }
    }
}

#[async_trait]
impl Probe<PhoneNumber> for AbstractApi {
    fn name(&self) -> &str {
        ABSTRACT_API
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn credential(&self) -> CredentialState {
        CredentialState::of(&self.key)
    }

    fn rule(&self) -> NormalizeRule<PhoneNumber> {
        // 400/422 are the provider's "not a phone number" answers.
        NormalizeRule::Api(
            ApiRule::new(extract)
                .absent_on(&[400, 404, 422])
                .rejected_note("Invalid phone number"),
        )
    }

    async fn fetch(
        &self,
        http: &HttpClients,
        query: &PhoneNumber,
    ) -> Result<RawResponse, ProbeFailure> {
        let key = self.key.as_deref().ok_or(ProbeFailure::MissingCredential)?;
        let response = http
            .api
            .get(format!("{}/v1", self.base))
            .query(&[("api_key", key), ("phone", query.digits.as_str())])
            .send()
            .await?;
        RawResponse::read(response).await
    }
}

fn extract(body: &Value, _q: &PhoneNumber) -> Extracted {
    if !body.is_object() {
        return Extracted::Unrecognized;
    }
    if body.get("valid") == Some(&Value::Bool(false)) {
        return Extracted::Empty;
    }

    let formatted = text(body, "/format/international").or_else(|| text(body, "/phone"));
    let dialing_code = body
        .pointer("/country/phone_code")
        .and_then(|code| match code {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .map(|code| format!("+{}", code.trim_start_matches('+')));

    Extracted::Data(
        Payload {
            name: text(body, "/caller_name"),
            location: text(body, "/location"),
            ..Default::default()
        }
        .detail("formatted", formatted)
        .detail("local", field(body, "/format/local"))
        .detail("valid", field(body, "/valid"))
        .detail("type", field(body, "/type"))
        .detail("country", field(body, "/country/name"))
        .detail("countryCode", field(body, "/country/code"))
        .detail("dialingCode", dialing_code)
        .detail("timezone", text(body, "/timezone/name").or_else(|| text(body, "/timezone")))
        .detail("carrier", field(body, "/carrier"))
        .detail("callerName", text(body, "/caller_name"))
        .detail("lineStatus", text(body, "/line_status"))
        .detail("portedNetwork", text(body, "/ported_network")),
    )
}
