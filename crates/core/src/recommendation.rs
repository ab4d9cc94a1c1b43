//! Recommendation requests, prompts, and defensive response mapping.
//!
//! The reasoning itself happens in a hosted model. This module builds the
//! prompts and turns whatever text comes back into catalog-checked
//! [`RecommendationSet`]s. Anything unusable becomes an error that callers
//! convert into [`RecommendationResponse::degraded`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::Catalog;
use crate::types::{FrameId, GlassId, MatId};

/// Longest accepted artwork description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Message shown when recommendations cannot be produced.
pub const DEGRADED_MESSAGE: &str =
    "We couldn't get design recommendations right now. You can keep designing and try again.";

/// Image formats the recommender accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageMediaType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/webp")]
    Webp,
}

impl ImageMediaType {
    /// Match a MIME type, ignoring parameters and case.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

/// What the customer gave us to base recommendations on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecommendationRequest {
    /// Free-text description of the artwork.
    Description { text: String },
    /// A photo of the artwork, base64 encoded.
    Image {
        media_type: ImageMediaType,
        data: String,
    },
}

impl RecommendationRequest {
    /// Reject requests that can never produce a useful answer.
    pub fn validate(&self) -> Result<(), RecommendationError> {
        match self {
            Self::Description { text } => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(RecommendationError::EmptyDescription);
                }
                if text.chars().count() > MAX_DESCRIPTION_CHARS {
                    return Err(RecommendationError::DescriptionTooLong {
                        max: MAX_DESCRIPTION_CHARS,
                    });
                }
                Ok(())
            }
            Self::Image { data, .. } if data.is_empty() => Err(RecommendationError::EmptyImage),
            Self::Image { .. } => Ok(()),
        }
    }

    /// Short label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Description { .. } => "description",
            Self::Image { .. } => "image",
        }
    }
}

/// A single ranked suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Catalog code of the suggested option.
    pub id: String,
    pub name: String,
    /// 1 (weak) to 10 (strong). Display only; never affects price.
    pub score: u8,
    pub reason: String,
}

/// Ranked suggestions per category, all referencing real catalog entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSet {
    #[serde(default)]
    pub frames: Vec<Recommendation>,
    #[serde(default)]
    pub mats: Vec<Recommendation>,
    #[serde(default)]
    pub glass: Vec<Recommendation>,
    #[serde(default)]
    pub explanation: String,
}

impl RecommendationSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.mats.is_empty() && self.glass.is_empty()
    }
}

/// The envelope returned to the configurator. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub recommendations: RecommendationSet,
    /// User-facing message when recommendations are unavailable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecommendationResponse {
    #[must_use]
    pub const fn ok(recommendations: RecommendationSet) -> Self {
        Self {
            recommendations,
            error: None,
        }
    }

    /// An empty set with a message the customer can read.
    #[must_use]
    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            recommendations: RecommendationSet::default(),
            error: Some(message.into()),
        }
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Why a request or a model response could not be used.
#[derive(Debug, thiserror::Error)]
pub enum RecommendationError {
    #[error("artwork description is empty")]
    EmptyDescription,

    #[error("artwork description is longer than {max} characters")]
    DescriptionTooLong { max: usize },

    #[error("image is empty")]
    EmptyImage,

    #[error("response contained no JSON object")]
    NoJson,

    #[error("response JSON is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("response referenced no known catalog options")]
    NoMatches,
}

impl RecommendationError {
    /// Whether the customer caused the failure and can fix it.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyDescription | Self::DescriptionTooLong { .. } | Self::EmptyImage
        )
    }
}

/// System prompt: role, catalog, and the exact JSON shape to answer with.
#[must_use]
pub fn build_system_prompt(catalog: &Catalog) -> String {
    let digest = serde_json::to_string_pretty(&catalog.digest()).unwrap_or_default();
    format!(
        "You are an expert custom picture framer helping a customer choose \
         framing for their artwork.\n\n\
         Only recommend options from this catalog, referring to them by id:\n\
         {digest}\n\n\
         Respond with a single JSON object and nothing else, in this shape:\n\
         {{\n  \
           \"frames\": [{{\"id\": \"...\", \"score\": 1-10, \"reason\": \"...\"}}],\n  \
           \"mats\": [{{\"id\": \"...\", \"score\": 1-10, \"reason\": \"...\"}}],\n  \
           \"glass\": [{{\"id\": \"...\", \"score\": 1-10, \"reason\": \"...\"}}],\n  \
           \"explanation\": \"...\"\n\
         }}\n\
         Give up to three entries per category, best first. Consider the \
         artwork's colours, style, subject, and how it should be preserved."
    )
}

/// The text part of the user message.
#[must_use]
pub fn build_user_prompt(request: &RecommendationRequest) -> String {
    match request {
        RecommendationRequest::Description { text } => format!(
            "Here is a description of my artwork:\n\n{}\n\n\
             Which frames, mats, and glass would you recommend?",
            text.trim()
        ),
        RecommendationRequest::Image { .. } => "Here is a photo of my artwork. Analyse its \
             colours, style, and subject, then recommend frames, mats, and glass."
            .to_owned(),
    }
}

/// Map raw model output onto the catalog.
///
/// Tolerates code fences, prose around the JSON, ids given as numbers, and
/// missing or out-of-range scores. Entries whose id is not in the catalog
/// are dropped. Fails only when nothing usable remains.
pub fn parse_recommendations(
    raw: &str,
    catalog: &Catalog,
) -> Result<RecommendationSet, RecommendationError> {
    let json = extract_json_object(raw).ok_or(RecommendationError::NoJson)?;
    let value: Value = serde_json::from_str(json)?;
    let Value::Object(object) = value else {
        return Err(RecommendationError::NoJson);
    };

    let frames = map_entries(object.get("frames"), |id| {
        catalog.frame(&FrameId::new(id)).map(|f| f.name.clone())
    });
    let mats = map_entries(object.get("mats"), |id| {
        catalog.mat(&MatId::new(id)).map(|m| m.name.clone())
    });
    let glass = map_entries(object.get("glass"), |id| {
        catalog.glass(&GlassId::new(id)).map(|g| g.name.clone())
    });
    let explanation = object
        .get("explanation")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_owned();

    let set = RecommendationSet {
        frames,
        mats,
        glass,
        explanation,
    };
    if set.is_empty() {
        return Err(RecommendationError::NoMatches);
    }
    Ok(set)
}

/// Slice from the first `{` to the last `}`, after dropping code fences.
fn extract_json_object(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map_or(trimmed, |rest| rest.trim_end().trim_end_matches("```"));

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    unfenced.get(start..=end)
}

fn map_entries(
    entries: Option<&Value>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<Recommendation> {
    let Some(Value::Array(entries)) = entries else {
        return Vec::new();
    };

    let mut mapped: Vec<Recommendation> = entries
        .iter()
        .filter_map(|entry| {
            let id = entry_id(entry.get("id")?)?;
            let name = lookup(&id)?;
            Some(Recommendation {
                score: entry_score(entry.get("score")),
                reason: entry
                    .get("reason")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_owned(),
                id,
                name,
            })
        })
        .collect();

    mapped.sort_by(|a, b| b.score.cmp(&a.score));
    let mut seen = std::collections::HashSet::new();
    mapped.retain(|r| seen.insert(r.id.clone()));
    mapped
}

fn entry_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Scores are clamped to 1..=10; missing or non-numeric scores become 1.
fn entry_score(value: Option<&Value>) -> u8 {
    let score = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match score {
        Some(s) if s.is_finite() => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let clamped = s.round().clamp(1.0, 10.0) as u8;
            clamped
        }
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;

    #[test]
    fn test_parses_plain_json() {
        let raw = r#"{
            "frames": [
                {"id": "oak-classic", "score": 7, "reason": "warm tones"},
                {"id": "gallery-black", "score": 9, "reason": "modern contrast"}
            ],
            "mats": [{"id": "ivory", "score": 8, "reason": "soft border"}],
            "glass": [{"id": "museum", "score": 10, "reason": "no glare"}],
            "explanation": "A bold modern look."
        }"#;

        let set = parse_recommendations(raw, &fixtures::catalog()).expect("parse");
        assert_eq!(set.frames.len(), 2);
        assert_eq!(set.frames.first().map(|r| r.id.as_str()), Some("gallery-black"));
        assert_eq!(set.frames.first().map(|r| r.name.as_str()), Some("Gallery Black"));
        assert_eq!(set.mats.first().map(|r| r.name.as_str()), Some("Ivory"));
        assert_eq!(set.glass.first().map(|r| r.score), Some(10));
        assert_eq!(set.explanation, "A bold modern look.");
    }

    #[test]
    fn test_strips_fences_and_prose() {
        let raw = "Sure! Here you go:\n```json\n{\"frames\": [{\"id\": \"oak-classic\", \"score\": 6}]}\n```";
        let set = parse_recommendations(raw, &fixtures::catalog()).expect("parse");
        assert_eq!(set.frames.len(), 1);
        assert!(set.mats.is_empty());
        assert!(set.explanation.is_empty());
    }

    #[test]
    fn test_drops_unknown_ids() {
        let raw = r#"{"frames": [
            {"id": "walnut-deluxe", "score": 10, "reason": "made up"},
            {"id": "oak-classic", "score": 5, "reason": "real"}
        ]}"#;
        let set = parse_recommendations(raw, &fixtures::catalog()).expect("parse");
        assert_eq!(set.frames.len(), 1);
        assert_eq!(set.frames.first().map(|r| r.id.as_str()), Some("oak-classic"));
    }

    #[test]
    fn test_only_unknown_ids_is_an_error() {
        let raw = r#"{"frames": [{"id": "walnut-deluxe", "score": 10}], "mats": []}"#;
        assert!(matches!(
            parse_recommendations(raw, &fixtures::catalog()),
            Err(RecommendationError::NoMatches)
        ));
    }

    #[test]
    fn test_scores_are_clamped() {
        let raw = r#"{"mats": [
            {"id": "ivory", "score": 42},
            {"id": "charcoal", "score": -3},
            {"id": "no-mat"}
        ]}"#;
        let set = parse_recommendations(raw, &fixtures::catalog()).expect("parse");
        let scores: Vec<u8> = set.mats.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![10, 1, 1]);
    }

    #[test]
    fn test_numeric_ids_are_accepted() {
        let mut catalog = fixtures::catalog();
        if let Some(frame) = catalog.frames.first_mut() {
            frame.id = FrameId::new("12");
        }
        let raw = r#"{"frames": [{"id": 12, "score": "8"}]}"#;
        let set = parse_recommendations(raw, &catalog).expect("parse");
        assert_eq!(set.frames.first().map(|r| r.id.as_str()), Some("12"));
        assert_eq!(set.frames.first().map(|r| r.score), Some(8));
    }

    #[test]
    fn test_duplicates_keep_highest_score() {
        let raw = r#"{"glass": [
            {"id": "museum", "score": 4, "reason": "low"},
            {"id": "museum", "score": 9, "reason": "high"}
        ]}"#;
        let set = parse_recommendations(raw, &fixtures::catalog()).expect("parse");
        assert_eq!(set.glass.len(), 1);
        assert_eq!(set.glass.first().map(|r| r.reason.as_str()), Some("high"));
    }

    #[test]
    fn test_malformed_and_empty_responses() {
        let catalog = fixtures::catalog();
        assert!(matches!(
            parse_recommendations("", &catalog),
            Err(RecommendationError::NoJson)
        ));
        assert!(matches!(
            parse_recommendations("I cannot help with that.", &catalog),
            Err(RecommendationError::NoJson)
        ));
        assert!(matches!(
            parse_recommendations("{\"frames\": [", &catalog),
            Err(RecommendationError::NoJson)
        ));
        assert!(matches!(
            parse_recommendations("{\"frames\": [}", &catalog),
            Err(RecommendationError::Malformed(_))
        ));
        assert!(matches!(
            parse_recommendations("{\"frames\": \"oak\"}", &catalog),
            Err(RecommendationError::NoMatches)
        ));
    }

    #[test]
    fn test_degraded_response_is_empty() {
        let response = RecommendationResponse::degraded(DEGRADED_MESSAGE);
        assert!(response.is_degraded());
        assert!(response.recommendations.is_empty());

        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["recommendations"]["frames"], serde_json::json!([]));
        assert_eq!(json["error"], DEGRADED_MESSAGE);

        let ok = serde_json::to_value(RecommendationResponse::ok(RecommendationSet::default()))
            .expect("serialize");
        assert!(ok.get("error").is_none());
    }

    #[test]
    fn test_request_validation() {
        let empty = RecommendationRequest::Description {
            text: "   ".to_owned(),
        };
        assert!(matches!(
            empty.validate(),
            Err(RecommendationError::EmptyDescription)
        ));

        let long = RecommendationRequest::Description {
            text: "a".repeat(MAX_DESCRIPTION_CHARS + 1),
        };
        assert!(long.validate().is_err_and(|e| e.is_input_error()));

        let image = RecommendationRequest::Image {
            media_type: ImageMediaType::Png,
            data: "aGVsbG8=".to_owned(),
        };
        assert!(image.validate().is_ok());
        assert_eq!(image.kind(), "image");
    }

    #[test]
    fn test_request_is_tagged() {
        let json = r#"{"type": "image", "media_type": "image/webp", "data": "AAAA"}"#;
        let request: RecommendationRequest = serde_json::from_str(json).expect("deserialize");
        assert_eq!(
            request,
            RecommendationRequest::Image {
                media_type: ImageMediaType::Webp,
                data: "AAAA".to_owned(),
            }
        );
    }

    #[test]
    fn test_media_types() {
        assert_eq!(ImageMediaType::from_mime("image/JPEG"), Some(ImageMediaType::Jpeg));
        assert_eq!(
            ImageMediaType::from_mime("image/png; charset=binary"),
            Some(ImageMediaType::Png)
        );
        assert_eq!(ImageMediaType::from_mime("image/tiff"), None);
        assert_eq!(ImageMediaType::Gif.as_mime(), "image/gif");
    }

    #[test]
    fn test_prompts_include_catalog_and_description() {
        let system = build_system_prompt(&fixtures::catalog());
        assert!(system.contains("oak-classic"));
        assert!(system.contains("99% UV protection"));
        assert!(system.contains("\"explanation\""));

        let user = build_user_prompt(&RecommendationRequest::Description {
            text: "  a blue watercolor seascape ".to_owned(),
        });
        assert!(user.contains("a blue watercolor seascape\n"));
    }
}
