//! Built-in provider probes.
//!
//! | Kind | Providers (declaration order) | Credential |
//! |------|-------------------------------|------------|
//! | username | GitHub, Reddit, Hacker News, Dev.to, Keybase, GitLab + 12 web-presence probes | none |
//! | email | Gravatar, Hunter.io, HaveIBeenPwned | `hunter`, `hibp` |
//! | phone | AbstractAPI | `abstractapi` |
//! | image | Google Vision | `google_vision` |
//!
//! Every probe takes its base URL from `[endpoints]` (keyed by provider id)
//! and falls back to the public endpoint, so tests can point any probe at a
//! local mock server.

pub mod email;
pub mod image;
pub mod phone;
pub mod username;

use chrono::{DateTime, SecondsFormat};
use serde_json::Value;

use crate::config::Config;
use crate::identifier::{EmailAddress, ImageQuery, PhoneNumber, Username};
use crate::probe::ProbeRegistry;

/// One registry per search kind.
pub struct Registries {
    pub username: ProbeRegistry<Username>,
    pub email: ProbeRegistry<EmailAddress>,
    pub phone: ProbeRegistry<PhoneNumber>,
    pub image: ProbeRegistry<ImageQuery>,
}

impl Registries {
    /// The built-in provider set, configured from `config`.
    pub fn builtin(config: &Config) -> Self {
        Self {
            username: username::registry(config),
            email: email::registry(config),
            phone: phone::registry(config),
            image: image::registry(config),
        }
    }

    /// Registries with no probes at all.
    pub fn empty() -> Self {
        Self {
            username: ProbeRegistry::new(),
            email: ProbeRegistry::new(),
            phone: ProbeRegistry::new(),
            image: ProbeRegistry::new(),
        }
    }
}

/// Unix seconds (integer or fractional) as an RFC 3339 UTC timestamp.
pub(crate) fn unix_timestamp(value: &Value) -> Value {
    value
        .as_f64()
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
        .map(|t| Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true)))
        .unwrap_or(Value::Null)
}
