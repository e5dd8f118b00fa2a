//! Image probe: Google Vision web detection, faces and labels.
//!
//! | Field | Filter | Cap |
//! |-------|--------|-----|
//! | `entities` | described, score > 0.5 | none |
//! | `labels` | score > 0.7 | none |
//! | `partialMatches`, `pagesWithImage`, `similarImages` | none | 10 |
//!
//! Scores are exposed as rounded percentages. The image counts as found
//! when Vision reports any web entity or any page carrying the image.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::ProbeFailure;
use crate::identifier::ImageQuery;
use crate::models::Payload;
use crate::normalize::{field, percent, ApiRule, Extracted, NormalizeRule};
use crate::probe::{CredentialState, HttpClients, Probe, ProbeRegistry, RawResponse};

pub const GOOGLE_VISION: &str = "Google Vision";

const ENTITY_MIN_SCORE: f64 = 0.5;
const LABEL_MIN_SCORE: f64 = 0.7;
const LIST_CAP: usize = 10;

/// Build the image registry.
pub fn registry(config: &Config) -> ProbeRegistry<ImageQuery> {
    let mut registry = ProbeRegistry::new().with_priority([GOOGLE_VISION]);
    registry.register(Arc::new(GoogleVision::new(config)));
    registry
}

/// `images:annotate` call. Needs the `google_vision` key and gets the long
/// image budget.
pub struct GoogleVision {
    base: String,
    key: Option<String>,
    timeout: Duration,
}

impl GoogleVision {
    pub fn new(config: &Config) -> Self {
        Self {
            base: config.endpoint("google_vision", "https://vision.googleapis.com"),
            key: config.credential("google_vision"),
            timeout: config.http.image_timeout(),
        }
    }
}

#[async_trait]
impl Probe<ImageQuery> for GoogleVision {
    fn name(&self) -> &str {
        GOOGLE_VISION
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn credential(&self) -> CredentialState {
        CredentialState::of(&self.key)
    }

    fn rule(&self) -> NormalizeRule<ImageQuery> {
        NormalizeRule::Api(ApiRule::new(extract))
    }

    async fn fetch(
        &self,
        http: &HttpClients,
        query: &ImageQuery,
    ) -> Result<RawResponse, ProbeFailure> {
        let key = self.key.as_deref().ok_or(ProbeFailure::MissingCredential)?;
        let body = json!({
            "requests": [{
                "image": { "content": query.base64 },
                "features": [
                    { "type": "WEB_DETECTION", "maxResults": 20 },
                    { "type": "FACE_DETECTION", "maxResults": 5 },
                    { "type": "LABEL_DETECTION", "maxResults": 10 },
                ],
            }],
        });
        let response = http
            .api
            .post(format!("{}/v1/images:annotate", self.base))
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?;
        RawResponse::read(response).await
    }
}

fn array<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn score(value: &Value) -> f64 {
    value.get("score").and_then(Value::as_f64).unwrap_or(0.0)
}

fn urls(items: &[Value], cap: usize) -> Vec<Value> {
    items
        .iter()
        .take(cap)
        .map(|i| json!({ "url": field(i, "/url") }))
        .collect()
}

fn extract(body: &Value, _q: &ImageQuery) -> Extracted {
    let Some(result) = body.pointer("/responses/0").filter(|r| r.is_object()) else {
        return Extracted::Unrecognized;
    };
    if result.get("error").is_some() {
        return Extracted::Unrecognized;
    }

    let web = result.get("webDetection").unwrap_or(&Value::Null);
    let raw_entities = array(web, "/webEntities");
    let raw_pages = array(web, "/pagesWithMatchingImages");
    if raw_entities.is_empty() && raw_pages.is_empty() {
        return Extracted::Empty;
    }

    let entities: Vec<Value> = raw_entities
        .iter()
        .filter(|e| e.get("description").and_then(Value::as_str).is_some())
        .filter(|e| score(e) > ENTITY_MIN_SCORE)
        .map(|e| json!({ "description": field(e, "/description"), "score": percent(score(e)) }))
        .collect();

    let pages: Vec<Value> = raw_pages
        .iter()
        .take(LIST_CAP)
        .map(|p| {
            let thumbnails: Vec<Value> = array(p, "/fullMatchingImages")
                .iter()
                .map(|i| field(i, "/url"))
                .collect();
            json!({
                "url": field(p, "/url"),
                "title": field(p, "/pageTitle"),
                "thumbnails": thumbnails,
            })
        })
        .collect();

    let best_guess: Vec<Value> = array(web, "/bestGuessLabels")
        .iter()
        .map(|l| field(l, "/label"))
        .collect();

    let labels: Vec<Value> = array(result, "/labelAnnotations")
        .iter()
        .filter(|l| score(l) > LABEL_MIN_SCORE)
        .map(|l| json!({ "description": field(l, "/description"), "score": percent(score(l)) }))
        .collect();

    Extracted::Data(
        Payload::default()
            .detail("entities", entities)
            .detail("fullMatches", urls(array(web, "/fullMatchingImages"), usize::MAX))
            .detail("partialMatches", urls(array(web, "/partialMatchingImages"), LIST_CAP))
            .detail("pagesWithImage", pages)
            .detail("similarImages", urls(array(web, "/visuallySimilarImages"), LIST_CAP))
            .detail("bestGuess", best_guess)
            .detail("faceCount", array(result, "/faceAnnotations").len())
            .detail("labels", labels),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImageQuery {
        ImageQuery {
            base64: String::new(),
            filename: "x.png".into(),
            size_bytes: 0,
            mime: "image/png".into(),
        }
    }

    fn vision(result: Value) -> Value {
        json!({ "responses": [result] })
    }

    #[test]
    fn test_thresholds_and_percentages() {
        let body = vision(json!({
            "webDetection": {
                "webEntities": [
                    { "description": "Ada Lovelace", "score": 0.874 },
                    { "description": "Noise", "score": 0.5 },
                    { "score": 0.9 }
                ],
                "bestGuessLabels": [{ "label": "ada lovelace" }]
            },
            "labelAnnotations": [
                { "description": "Portrait", "score": 0.95 },
                { "description": "Hat", "score": 0.7 }
            ],
            "faceAnnotations": [{}, {}]
        }));
        let Extracted::Data(p) = extract(&body, &image()) else {
            panic!("expected data");
        };
        assert_eq!(
            p.details["entities"],
            json!([{ "description": "Ada Lovelace", "score": 87 }])
        );
        assert_eq!(p.details["labels"], json!([{ "description": "Portrait", "score": 95 }]));
        assert_eq!(p.details["faceCount"], json!(2));
        assert_eq!(p.details["bestGuess"], json!(["ada lovelace"]));
    }

    #[test]
    fn test_lists_are_capped() {
        let many: Vec<Value> = (0..25)
            .map(|i| json!({ "url": format!("https://x/{i}") }))
            .collect();
        let body = vision(json!({
            "webDetection": {
                "pagesWithMatchingImages": many,
                "partialMatchingImages": many,
                "visuallySimilarImages": many,
                "fullMatchingImages": many
            }
        }));
        let Extracted::Data(p) = extract(&body, &image()) else {
            panic!("expected data");
        };
        assert_eq!(p.details["pagesWithImage"].as_array().unwrap().len(), 10);
        assert_eq!(p.details["partialMatches"].as_array().unwrap().len(), 10);
        assert_eq!(p.details["similarImages"].as_array().unwrap().len(), 10);
        assert_eq!(p.details["fullMatches"].as_array().unwrap().len(), 25);
    }

    #[test]
    fn test_labels_only_is_absent() {
        let body = vision(json!({ "labelAnnotations": [{ "description": "Cat", "score": 0.99 }] }));
        assert_eq!(extract(&body, &image()), Extracted::Empty);
    }

    #[test]
    fn test_missing_response_is_unrecognized() {
        assert_eq!(extract(&json!({ "responses": [] }), &image()), Extracted::Unrecognized);
        assert_eq!(
            extract(&vision(json!({ "error": { "code": 3 } })), &image()),
            Extracted::Unrecognized
        );
    }
}
