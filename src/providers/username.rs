//! Username probes.
//!
//! Six structured profile APIs ([`ProfileApi`]) followed by twelve
//! heuristic web-presence probes ([`WebPresence`]). Declaration order is
//! also the summary priority order.
//!
//! # Endpoint overrides
//!
//! Profile APIs take a base URL (`[endpoints] github = "http://…"`).
//! Web-presence probes take a full URL template; `{username}` is replaced
//! with the encoded username, and is appended as a path segment when the
//! template does not contain it.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use super::unix_timestamp;
use crate::config::Config;
use crate::error::ProbeFailure;
use crate::identifier::Username;
use crate::models::Payload;
use crate::normalize::{field, text, ApiRule, Extracted, NormalizeRule};
use crate::probe::{HttpClients, Probe, ProbeRegistry, RawResponse};

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Longest "about" text kept from Hacker News.
const ABOUT_MAX_CHARS: usize = 200;

/// Build the username registry.
pub fn registry(config: &Config) -> ProbeRegistry<Username> {
    let mut registry = ProbeRegistry::new();
    for site in Site::ALL {
        registry.register(Arc::new(ProfileApi::new(site, config)));
    }
    for (id, name, template) in WEB_SITES {
        registry.register(Arc::new(WebPresence::new(id, name, template, config)));
    }
    registry
}

// ═══════════════════════════════════════════════════════════════════════
// Structured profile APIs
// ═══════════════════════════════════════════════════════════════════════

/// A public profile API addressed by username.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    GitHub,
    Reddit,
    HackerNews,
    DevTo,
    Keybase,
    GitLab,
}

impl Site {
    pub const ALL: [Site; 6] = [
        Site::GitHub,
        Site::Reddit,
        Site::HackerNews,
        Site::DevTo,
        Site::Keybase,
        Site::GitLab,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Site::GitHub => "GitHub",
            Site::Reddit => "Reddit",
            Site::HackerNews => "Hacker News",
            Site::DevTo => "Dev.to",
            Site::Keybase => "Keybase",
            Site::GitLab => "GitLab",
        }
    }

    /// Provider id used for `[endpoints]` overrides.
    pub fn id(self) -> &'static str {
        match self {
            Site::GitHub => "github",
            Site::Reddit => "reddit",
            Site::HackerNews => "hackernews",
            Site::DevTo => "devto",
            Site::Keybase => "keybase",
            Site::GitLab => "gitlab",
        }
    }

    fn default_base(self) -> &'static str {
        match self {
            Site::GitHub => "https://api.github.com",
            Site::Reddit => "https://www.reddit.com",
            Site::HackerNews => "https://hacker-news.firebaseio.com",
            Site::DevTo => "https://dev.to",
            Site::Keybase => "https://keybase.io",
            Site::GitLab => "https://gitlab.com",
        }
    }

    /// Public profile page.
    pub fn profile_url(self, username: &str) -> String {
        let u = urlencoding::encode(username);
        match self {
            Site::GitHub => format!("https://github.com/{}", u),
            Site::Reddit => format!("https://reddit.com/u/{}", u),
            Site::HackerNews => format!("https://news.ycombinator.com/user?id={}", u),
            Site::DevTo => format!("https://dev.to/{}", u),
            Site::Keybase => format!("https://keybase.io/{}", u),
            Site::GitLab => format!("https://gitlab.com/{}", u),
        }
    }

    fn extractor(self) -> fn(&Value, &Username) -> Extracted {
        match self {
            Site::GitHub => extract_github,
            Site::Reddit => extract_reddit,
            Site::HackerNews => extract_hacker_news,
            Site::DevTo => extract_devto,
            Site::Keybase => extract_keybase,
            Site::GitLab => extract_gitlab,
        }
    }
}

/// Probe for one [`Site`].
pub struct ProfileApi {
    site: Site,
    base: String,
    timeout: Duration,
}

impl ProfileApi {
    pub fn new(site: Site, config: &Config) -> Self {
        Self {
            site,
            base: config.endpoint(site.id(), site.default_base()),
            timeout: config.http.api_timeout(),
        }
    }
}

#[async_trait]
impl Probe<Username> for ProfileApi {
    fn name(&self) -> &str {
        self.site.name()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn profile_url(&self, query: &Username) -> Option<String> {
        Some(self.site.profile_url(query.as_str()))
    }

    fn rule(&self) -> NormalizeRule<Username> {
        NormalizeRule::Api(ApiRule::new(self.site.extractor()))
    }

    async fn fetch(
        &self,
        http: &HttpClients,
        query: &Username,
    ) -> Result<RawResponse, ProbeFailure> {
        let raw = query.as_str();
        let u = urlencoding::encode(raw);
        let base = &self.base;

        let request = match self.site {
            Site::GitHub => http
                .api
                .get(format!("{}/users/{}", base, u))
                .header(ACCEPT, "application/vnd.github.v3+json"),
            Site::Reddit => http.api.get(format!("{}/user/{}/about.json", base, u)),
            Site::HackerNews => http.api.get(format!("{}/v0/user/{}.json", base, u)),
            Site::DevTo => http
                .api
                .get(format!("{}/api/users/by_username", base))
                .query(&[("url", raw)]),
            Site::Keybase => http
                .api
                .get(format!("{}/_/api/1.0/user/lookup.json", base))
                .query(&[("username", raw)]),
            Site::GitLab => http
                .api
                .get(format!("{}/api/v4/users", base))
                .query(&[("username", raw)]),
        };

        RawResponse::read(request.send().await?).await
    }
}

fn extract_github(body: &Value, _q: &Username) -> Extracted {
    if text(body, "/login").is_none() {
        return Extracted::Unrecognized;
    }
    Extracted::Data(
        Payload {
            name: text(body, "/name"),
            avatar: text(body, "/avatar_url"),
            location: text(body, "/location"),
            website: text(body, "/blog"),
            bio: text(body, "/bio"),
            ..Default::default()
        }
        .detail("company", field(body, "/company"))
        .detail("email", field(body, "/email"))
        .detail("followers", field(body, "/followers"))
        .detail("following", field(body, "/following"))
        .detail("publicRepos", field(body, "/public_repos"))
        .detail("createdAt", field(body, "/created_at"))
        .detail("twitterUsername", field(body, "/twitter_username")),
    )
}

fn extract_reddit(body: &Value, _q: &Username) -> Extracted {
    let data = match body.get("data") {
        None | Some(Value::Null) => return Extracted::Empty,
        Some(data) if data.is_object() => data,
        Some(_) => return Extracted::Unrecognized,
    };

    let link = data.get("link_karma").and_then(Value::as_i64);
    let comment = data.get("comment_karma").and_then(Value::as_i64);
    let avatar = text(data, "/icon_img")
        .and_then(|url| url.split('?').next().map(str::to_string))
        .filter(|url| !url.is_empty());

    Extracted::Data(
        Payload {
            name: text(data, "/name"),
            avatar,
            ..Default::default()
        }
        .detail("karma", link.unwrap_or(0) + comment.unwrap_or(0))
        .detail("postKarma", link)
        .detail("commentKarma", comment)
        .detail("createdAt", unix_timestamp(&field(data, "/created_utc")))
        .detail("isPremium", field(data, "/is_gold"))
        .detail("totalAwardsReceived", field(data, "/total_awards_received"))
        .detail("isOver18", field(data, "/over_18")),
    )
}

fn extract_hacker_news(body: &Value, query: &Username) -> Extracted {
    if body.is_null() {
        return Extracted::Empty;
    }
    if !body.is_object() {
        return Extracted::Unrecognized;
    }

    let about = text(body, "/about").map(|html| {
        HTML_TAG_RE
            .replace_all(&html, "")
            .chars()
            .take(ABOUT_MAX_CHARS)
            .collect::<String>()
    });
    let submissions = body
        .get("submitted")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);

    Extracted::Data(
        Payload {
            name: Some(query.as_str().to_string()),
            bio: about.filter(|a| !a.trim().is_empty()),
            ..Default::default()
        }
        .detail("karma", field(body, "/karma"))
        .detail("createdAt", unix_timestamp(&field(body, "/created")))
        .detail("submissions", submissions),
    )
}

fn extract_devto(body: &Value, _q: &Username) -> Extracted {
    if body.get("error").is_some_and(|e| !e.is_null()) {
        return Extracted::Empty;
    }
    if text(body, "/username").is_none() {
        return Extracted::Unrecognized;
    }
    Extracted::Data(
        Payload {
            name: text(body, "/name"),
            avatar: text(body, "/profile_image"),
            location: text(body, "/location"),
            website: text(body, "/website_url"),
            bio: text(body, "/summary"),
            ..Default::default()
        }
        .detail("followers", field(body, "/followers_count"))
        .detail("joinedAt", field(body, "/joined_at"))
        .detail("github", field(body, "/github_username"))
        .detail("twitter", field(body, "/twitter_username")),
    )
}

fn extract_keybase(body: &Value, query: &Username) -> Extracted {
    let Some(code) = body.pointer("/status/code").and_then(Value::as_i64) else {
        return Extracted::Unrecognized;
    };
    let user = match body.pointer("/them/0") {
        Some(user) if code == 0 && user.is_object() => user,
        _ => return Extracted::Empty,
    };

    let proofs: Vec<Value> = user
        .pointer("/proofs_summary/all")
        .and_then(Value::as_array)
        .map(|all| {
            all.iter()
                .map(|p| {
                    json!({ "type": field(p, "/proof_type"), "url": field(p, "/service_url") })
                })
                .collect()
        })
        .unwrap_or_default();

    Extracted::Data(
        Payload {
            name: text(user, "/profile/full_name"),
            avatar: Some(format!(
                "https://keybase.io/{}/picture",
                urlencoding::encode(query.as_str())
            )),
            location: text(user, "/profile/location"),
            bio: text(user, "/profile/bio"),
            ..Default::default()
        }
        .detail("proofs", proofs),
    )
}

fn extract_gitlab(body: &Value, _q: &Username) -> Extracted {
    let Some(users) = body.as_array() else {
        return Extracted::Unrecognized;
    };
    let Some(user) = users.first() else {
        return Extracted::Empty;
    };
    Extracted::Data(
        Payload {
            name: text(user, "/name"),
            avatar: text(user, "/avatar_url"),
            website: text(user, "/website_url"),
            bio: text(user, "/bio"),
            ..Default::default()
        }
        .detail("username", field(user, "/username"))
        .detail("createdAt", field(user, "/created_at"))
        .detail("webUrl", field(user, "/web_url")),
    )
}

// ═══════════════════════════════════════════════════════════════════════
// Heuristic web presence
// ═══════════════════════════════════════════════════════════════════════

/// `(id, display name, URL template)` for every web-presence probe.
pub const WEB_SITES: [(&str, &str, &str); 12] = [
    ("twitter", "Twitter / X", "https://twitter.com/{username}"),
    ("instagram", "Instagram", "https://www.instagram.com/{username}/"),
    ("tiktok", "TikTok", "https://www.tiktok.com/@{username}"),
    ("twitch", "Twitch", "https://www.twitch.tv/{username}"),
    ("youtube", "YouTube", "https://www.youtube.com/@{username}"),
    ("pinterest", "Pinterest", "https://www.pinterest.com/{username}/"),
    ("medium", "Medium", "https://medium.com/@{username}"),
    ("telegram", "Telegram", "https://t.me/{username}"),
    ("snapchat", "Snapchat", "https://www.snapchat.com/add/{username}"),
    ("linkedin", "LinkedIn", "https://www.linkedin.com/in/{username}/"),
    ("tumblr", "Tumblr", "https://{username}.tumblr.com/"),
    ("mastodon", "Mastodon", "https://mastodon.social/@{username}"),
];

const PLACEHOLDER: &str = "{username}";

/// `HEAD` against a public profile page, redirects not followed.
///
/// Only the status code and the redirect target are inspected, so the
/// strongest result this probe can produce is `"likely"`.
pub struct WebPresence {
    name: String,
    template: String,
    timeout: Duration,
}

impl WebPresence {
    pub fn new(id: &str, name: &str, default_template: &str, config: &Config) -> Self {
        let mut template = config.endpoint(id, default_template);
        if !template.contains(PLACEHOLDER) {
            template = format!("{}/{}", template, PLACEHOLDER);
        }
        Self {
            name: name.to_string(),
            template,
            timeout: config.http.web_timeout(),
        }
    }

    fn url(&self, username: &Username) -> String {
        self.template
            .replace(PLACEHOLDER, &urlencoding::encode(username.as_str()))
    }
}

#[async_trait]
impl Probe<Username> for WebPresence {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn profile_url(&self, query: &Username) -> Option<String> {
        Some(self.url(query))
    }

    fn rule(&self) -> NormalizeRule<Username> {
        NormalizeRule::WebPresence
    }

    async fn fetch(
        &self,
        http: &HttpClients,
        query: &Username,
    ) -> Result<RawResponse, ProbeFailure> {
        let response = http
            .web
            .head(self.url(query))
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;
        RawResponse::read(response).await
    }
}
