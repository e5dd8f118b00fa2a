//! TOML configuration.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8787"
//!
//! [http]
//! user_agent = "TRACE-OSINT/1.0"
//! api_timeout_ms = 6000
//! web_timeout_ms = 6000
//! image_timeout_ms = 20000
//! max_image_bytes = 20971520
//!
//! [credentials]
//! hunter = "..."
//! hibp = "..."
//!
//! [endpoints]
//! github = "http://127.0.0.1:9000"
//! ```
//!
//! # Credentials
//!
//! Provider credentials are resolved once, in [`load_config`]. A key missing
//! from `[credentials]` falls back to its environment variable:
//!
//! | Provider id | Environment variable |
//! |-------------|----------------------|
//! | `hunter` | `HUNTER_API_KEY` |
//! | `hibp` | `HIBP_API_KEY` |
//! | `abstractapi` | `ABSTRACT_API_KEY` |
//! | `google_vision` | `GOOGLE_VISION_API_KEY` |
//!
//! The resolved values are injected into probes at construction; nothing
//! reads the environment at request time.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Provider ids that accept a credential, paired with their env fallback.
pub const CREDENTIAL_ENV: [(&str, &str); 4] = [
    ("hunter", "HUNTER_API_KEY"),
    ("hibp", "HIBP_API_KEY"),
    ("abstractapi", "ABSTRACT_API_KEY"),
    ("google_vision", "GOOGLE_VISION_API_KEY"),
];

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_api_timeout_ms")]
    pub api_timeout_ms: u64,
    #[serde(default = "default_web_timeout_ms")]
    pub web_timeout_ms: u64,
    #[serde(default = "default_image_timeout_ms")]
    pub image_timeout_ms: u64,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            api_timeout_ms: default_api_timeout_ms(),
            web_timeout_ms: default_web_timeout_ms(),
            image_timeout_ms: default_image_timeout_ms(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

fn default_user_agent() -> String {
    "TRACE-OSINT/1.0".to_string()
}
fn default_api_timeout_ms() -> u64 {
    6000
}
fn default_web_timeout_ms() -> u64 {
    6000
}
fn default_image_timeout_ms() -> u64 {
    20000
}
fn default_max_image_bytes() -> usize {
    20 * 1024 * 1024
}

impl HttpConfig {
    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    pub fn web_timeout(&self) -> Duration {
        Duration::from_millis(self.web_timeout_ms)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }
}

impl Config {
    /// Defaults only, used when no config file exists. Credentials still
    /// come from the environment.
    pub fn minimal() -> Self {
        let mut config = Self::default();
        config.resolve_credentials(|var| std::env::var(var).ok());
        config
    }

    /// Credential for a provider id, if one is configured and non-empty.
    pub fn credential(&self, provider: &str) -> Option<String> {
        self.credentials
            .get(provider)
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }

    /// Base URL for a provider id: the configured override, or `default`.
    pub fn endpoint(&self, provider: &str, default: &str) -> String {
        self.endpoints
            .get(provider)
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| default.to_string())
    }

    /// Fill credentials absent from the file using `lookup` (normally the
    /// process environment). Empty values are dropped.
    pub fn resolve_credentials<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (provider, var) in CREDENTIAL_ENV {
            if self.credential(provider).is_some() {
                continue;
            }
            match lookup(var).filter(|v| !v.trim().is_empty()) {
                Some(value) => {
                    self.credentials.insert(provider.to_string(), value);
                }
                None => {
                    self.credentials.remove(provider);
                }
            }
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    config.resolve_credentials(|var| std::env::var(var).ok());

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    let http = &config.http;
    for (key, value) in [
        ("http.api_timeout_ms", http.api_timeout_ms),
        ("http.web_timeout_ms", http.web_timeout_ms),
        ("http.image_timeout_ms", http.image_timeout_ms),
    ] {
        if value == 0 {
            anyhow::bail!("{} must be > 0", key);
        }
    }

    if http.max_image_bytes == 0 {
        anyhow::bail!("http.max_image_bytes must be > 0");
    }

    for (provider, url) in &config.endpoints {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!(
                "endpoints.{} must be an http(s) URL, got '{}'",
                provider,
                url
            );
        }
    }

    Ok(())
}
