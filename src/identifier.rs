//! Identifier classification.
//!
//! Kind-specific validation and normalization applied to the raw query
//! before any provider is contacted. Every type here is an immutable,
//! request-scoped value handed by reference to each probe.
//!
//! | Kind | Normalization | Rejected with |
//! |------|---------------|---------------|
//! | username | leading `@` stripped, trimmed | [`ValidationError::EmptyQuery`] |
//! | email | lower-cased, trimmed, syntax-checked, SHA-256 fingerprint | [`ValidationError::InvalidEmail`] |
//! | phone | `[\s\-().]` stripped, `00` → `+`, longest-prefix country | [`ValidationError::EmptyQuery`] |
//! | image | data-URI prefix stripped, base64 decoded, size-capped, sniffed | [`ValidationError::ImageTooLarge`] and friends |

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::countries::{detect_country, CountryCode};
use crate::error::ValidationError;
use crate::models::{RawQuery, SearchKind};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~\-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*\.[a-zA-Z]{2,}$",
    )
    .unwrap()
});

static PHONE_PUNCTUATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-().]").unwrap());

static DATA_URI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:([\w.+-]+/[\w.+-]+);base64,").unwrap()
});

/// Display name used when an upload carries no file name.
pub const DEFAULT_IMAGE_NAME: &str = "uploaded-image";

fn text_query(kind: SearchKind, query: &RawQuery) -> Result<&str, ValidationError> {
    match query {
        RawQuery::Text(text) => Ok(text.as_str()),
        RawQuery::Binary(_) => Err(ValidationError::BinaryNotSupported(kind)),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Username
// ═══════════════════════════════════════════════════════════════════════

/// A username, passed verbatim to every probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        let name = trimmed.strip_prefix('@').unwrap_or(trimmed).trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyQuery(SearchKind::Username));
        }
        Ok(Self(name.to_string()))
    }

    pub fn classify(query: &RawQuery) -> Result<Self, ValidationError> {
        Self::parse(text_query(SearchKind::Username, query)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Email
// ═══════════════════════════════════════════════════════════════════════

/// A syntactically valid, normalized email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    /// Lower-cased, trimmed address.
    pub address: String,
    /// Hex SHA-256 of `address`; key for hash-addressed providers.
    pub fingerprint: String,
    pub local: String,
    pub domain: String,
}

impl EmailAddress {
    /// Normalize `raw` without validating it.
    pub fn normalize(raw: &str) -> String {
        raw.trim().to_lowercase()
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let address = Self::normalize(raw);
        if address.is_empty() {
            return Err(ValidationError::EmptyQuery(SearchKind::Email));
        }
        if !EMAIL_RE.is_match(&address) {
            return Err(ValidationError::InvalidEmail);
        }

        let (local, domain) = address
            .split_once('@')
            .ok_or(ValidationError::InvalidEmail)?;

        Ok(Self {
            fingerprint: fingerprint(&address),
            local: local.to_string(),
            domain: domain.to_string(),
            address,
        })
    }

    pub fn classify(query: &RawQuery) -> Result<Self, ValidationError> {
        Self::parse(text_query(SearchKind::Email, query)?)
    }
}

/// Hex SHA-256 of the normalized form of `address`.
pub fn fingerprint(address: &str) -> String {
    let digest = Sha256::digest(EmailAddress::normalize(address).as_bytes());
    hex::encode(digest)
}

// ═══════════════════════════════════════════════════════════════════════
// Phone
// ═══════════════════════════════════════════════════════════════════════

/// A cleaned phone number with its locally detected country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    /// The query as received.
    pub raw: String,
    /// Whitespace and punctuation removed.
    pub cleaned: String,
    /// Digits only, without the international prefix; sent to providers.
    pub digits: String,
    /// `+` followed by `digits`.
    pub normalized: String,
    pub country: Option<&'static CountryCode>,
}

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let cleaned = PHONE_PUNCTUATION_RE.replace_all(raw.trim(), "").into_owned();
        let international = match cleaned.strip_prefix("00") {
            Some(rest) if !cleaned.starts_with('+') => rest,
            _ => cleaned.as_str(),
        };
        let digits: String = international.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(ValidationError::EmptyQuery(SearchKind::Phone));
        }

        Ok(Self {
            raw: raw.to_string(),
            country: detect_country(&cleaned),
            normalized: format!("+{}", digits),
            digits,
            cleaned,
        })
    }

    pub fn classify(query: &RawQuery) -> Result<Self, ValidationError> {
        Self::parse(text_query(SearchKind::Phone, query)?)
    }

    /// Spellings worth trying when searching for the number elsewhere.
    pub fn possible_formats(&self) -> Vec<String> {
        let mut formats = Vec::with_capacity(3);
        for format in [&self.cleaned, &self.digits, &self.normalized] {
            if !formats.contains(format) {
                formats.push(format.clone());
            }
        }
        formats
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Image
// ═══════════════════════════════════════════════════════════════════════

/// A validated image, re-encoded as plain base64 for provider upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageQuery {
    pub base64: String,
    pub filename: String,
    pub size_bytes: usize,
    /// Sniffed content type.
    pub mime: String,
}

impl ImageQuery {
    /// Validate an image given as base64, optionally wrapped in a data URI.
    pub fn from_text(
        text: &str,
        filename: Option<String>,
        max_bytes: usize,
    ) -> Result<Self, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyQuery(SearchKind::Image));
        }

        let encoded = match DATA_URI_RE.captures(text) {
            Some(caps) => {
                let mime = &caps[1];
                if !mime.to_ascii_lowercase().starts_with("image/") {
                    return Err(ValidationError::UnsupportedImageType(mime.to_string()));
                }
                &text[caps[0].len()..]
            }
            None => text,
        };

        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        // Reject before decoding when the encoded form alone is over the cap.
        let estimated = compact.len() / 4 * 3;
        if estimated > max_bytes + 2 {
            return Err(ValidationError::ImageTooLarge {
                size: estimated,
                max: max_bytes,
            });
        }

        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|_| ValidationError::InvalidImageEncoding)?;
        Self::from_bytes(bytes, filename, max_bytes)
    }

    /// Validate raw image bytes.
    pub fn from_bytes(
        bytes: Vec<u8>,
        filename: Option<String>,
        max_bytes: usize,
    ) -> Result<Self, ValidationError> {
        if bytes.is_empty() {
            return Err(ValidationError::EmptyQuery(SearchKind::Image));
        }
        if bytes.len() > max_bytes {
            return Err(ValidationError::ImageTooLarge {
                size: bytes.len(),
                max: max_bytes,
            });
        }

        let mime = match infer::get(&bytes) {
            Some(kind) if kind.matcher_type() == infer::MatcherType::Image => kind.mime_type(),
            Some(kind) => {
                return Err(ValidationError::UnsupportedImageType(
                    kind.mime_type().to_string(),
                ))
            }
            None => return Err(ValidationError::UnsupportedImageType("unknown".to_string())),
        };

        Ok(Self {
            base64: STANDARD.encode(&bytes),
            filename: filename
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_string()),
            size_bytes: bytes.len(),
            mime: mime.to_string(),
        })
    }

    pub fn classify(
        query: &RawQuery,
        filename: Option<String>,
        max_bytes: usize,
    ) -> Result<Self, ValidationError> {
        match query {
            RawQuery::Text(text) => Self::from_text(text, filename, max_bytes),
            RawQuery::Binary(bytes) => Self::from_bytes(bytes.clone(), filename, max_bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smallest PNG header `infer` recognises.
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    #[test]
    fn test_username_strips_at_and_whitespace() {
        assert_eq!(Username::parse("  @octocat ").unwrap().as_str(), "octocat");
        assert_eq!(Username::parse("ada").unwrap().as_str(), "ada");
        assert_eq!(
            Username::parse(" @ "),
            Err(ValidationError::EmptyQuery(SearchKind::Username))
        );
    }

    #[test]
    fn test_username_rejects_binary() {
        let err = Username::classify(&RawQuery::Binary(vec![1])).unwrap_err();
        assert_eq!(err, ValidationError::BinaryNotSupported(SearchKind::Username));
    }

    #[test]
    fn test_email_fingerprint_ignores_case_and_whitespace() {
        let a = EmailAddress::parse("John.Doe@Example.COM ").unwrap();
        let b = EmailAddress::parse("john.doe@example.com").unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.address, "john.doe@example.com");
        assert_eq!(a.local, "john.doe");
        assert_eq!(a.domain, "example.com");
        assert_eq!(a.fingerprint.len(), 64);
        assert_eq!(fingerprint("John.Doe@Example.COM "), b.fingerprint);
    }

    #[test]
    fn test_email_syntax() {
        assert_eq!(
            EmailAddress::parse("not-an-email"),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            EmailAddress::parse("a@b.c"),
            Err(ValidationError::InvalidEmail)
        );
        assert!(EmailAddress::parse("o'brien+tag@mail.example.ie").is_ok());
        assert_eq!(
            EmailAddress::parse("   "),
            Err(ValidationError::EmptyQuery(SearchKind::Email))
        );
    }

    #[test]
    fn test_phone_cleanup_and_country() {
        let phone = PhoneNumber::parse(" +44 (7700) 900-123 ").unwrap();
        assert_eq!(phone.cleaned, "+447700900123");
        assert_eq!(phone.digits, "447700900123");
        assert_eq!(phone.normalized, "+447700900123");
        assert_eq!(phone.country.unwrap().country, "United Kingdom");
    }

    #[test]
    fn test_phone_double_zero_prefix() {
        let phone = PhoneNumber::parse("0033 6 12 34 56 78").unwrap();
        assert_eq!(phone.cleaned, "0033612345678");
        assert_eq!(phone.digits, "33612345678");
        assert_eq!(phone.normalized, "+33612345678");
        assert_eq!(phone.country.unwrap().code, "+33");
        assert_eq!(
            phone.possible_formats(),
            vec!["0033612345678", "33612345678", "+33612345678"]
        );
    }

    #[test]
    fn test_phone_without_digits() {
        assert_eq!(
            PhoneNumber::parse("(-)"),
            Err(ValidationError::EmptyQuery(SearchKind::Phone))
        );
    }

    #[test]
    fn test_image_data_uri() {
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(PNG));
        let image = ImageQuery::from_text(&uri, None, 1024).unwrap();
        assert_eq!(image.size_bytes, PNG.len());
        assert_eq!(image.mime, "image/png");
        assert_eq!(image.filename, DEFAULT_IMAGE_NAME);
        assert_eq!(image.base64, STANDARD.encode(PNG));
    }

    #[test]
    fn test_image_rejects_non_image_uri() {
        let uri = format!("data:text/plain;base64,{}", STANDARD.encode(b"hello"));
        assert_eq!(
            ImageQuery::from_text(&uri, None, 1024),
            Err(ValidationError::UnsupportedImageType("text/plain".into()))
        );
    }

    #[test]
    fn test_image_size_cap() {
        let mut bytes = PNG.to_vec();
        bytes.resize(64, 0);
        let err = ImageQuery::from_bytes(bytes, None, 32).unwrap_err();
        assert_eq!(err, ValidationError::ImageTooLarge { size: 64, max: 32 });

        let encoded = STANDARD.encode(vec![0u8; 4096]);
        assert!(matches!(
            ImageQuery::from_text(&encoded, None, 32),
            Err(ValidationError::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn test_image_bad_base64_and_unknown_bytes() {
        assert_eq!(
            ImageQuery::from_text("!!!not base64!!!", None, 1024),
            Err(ValidationError::InvalidImageEncoding)
        );
        assert_eq!(
            ImageQuery::from_bytes(vec![1, 2, 3, 4], None, 1024),
            Err(ValidationError::UnsupportedImageType("unknown".into()))
        );
    }

    #[test]
    fn test_image_keeps_filename() {
        let image = ImageQuery::from_bytes(PNG.to_vec(), Some("me.png".into()), 1024).unwrap();
        assert_eq!(image.filename, "me.png");
    }
}
