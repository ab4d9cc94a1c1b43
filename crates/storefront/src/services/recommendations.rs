//! AI design recommendations with graceful degradation.
//!
//! [`RecommendationService::recommend`] never fails. Missing configuration,
//! network errors, timeouts, API errors, and unusable model output all turn
//! into [`RecommendationResponse::degraded`], which leaves the customer's
//! design untouched.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::{instrument, warn};

use frameshop_core::catalog::Catalog;
use frameshop_core::recommendation::{
    DEGRADED_MESSAGE, ImageMediaType, RecommendationRequest, RecommendationResponse,
    build_system_prompt, build_user_prompt, parse_recommendations,
};

use crate::claude::{ClaudeClient, ContentBlock, ImageSource, Message};
use crate::config::ClaudeConfig;

/// Largest image accepted for analysis.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Recommendation front end over the Claude client.
#[derive(Clone)]
pub struct RecommendationService {
    client: Option<ClaudeClient>,
    timeout: Duration,
}

impl RecommendationService {
    /// Build the service. Without a usable configuration every request
    /// degrades.
    #[must_use]
    pub fn new(config: Option<&ClaudeConfig>) -> Self {
        let Some(config) = config else {
            return Self::disabled();
        };
        match ClaudeClient::new(config) {
            Ok(client) => Self {
                client: Some(client),
                timeout: config.timeout,
            },
            Err(e) => {
                tracing::error!(error = %e, "Claude client unavailable, recommendations disabled");
                Self::disabled()
            }
        }
    }

    /// A service that always degrades.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            client: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Whether a Claude client is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Shared client, for other features that call Claude.
    #[must_use]
    pub const fn client(&self) -> Option<&ClaudeClient> {
        self.client.as_ref()
    }

    /// Build an image request from uploaded bytes.
    ///
    /// Returns a degraded response instead when the upload cannot be used.
    pub fn image_request(
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<RecommendationRequest, RecommendationResponse> {
        let media_type = content_type
            .and_then(ImageMediaType::from_mime)
            .ok_or_else(|| {
                RecommendationResponse::degraded("Please upload a JPEG, PNG, GIF, or WebP image.")
            })?;
        if bytes.is_empty() {
            return Err(RecommendationResponse::degraded("The uploaded image is empty."));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(image_too_large());
        }
        Ok(RecommendationRequest::Image {
            media_type,
            data: BASE64.encode(bytes),
        })
    }

    /// Ask for recommendations against `catalog`.
    #[instrument(skip(self, request, catalog), fields(kind = request.kind()))]
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
        catalog: &Catalog,
    ) -> RecommendationResponse {
        if let Err(e) = request.validate() {
            return RecommendationResponse::degraded(capitalise(&e.to_string()));
        }
        if let RecommendationRequest::Image { data, .. } = request
            && decoded_len(data) > MAX_IMAGE_BYTES
        {
            return image_too_large();
        }

        let Some(client) = &self.client else {
            warn!("Recommendations requested but Claude is not configured");
            return RecommendationResponse::degraded(DEGRADED_MESSAGE);
        };
        if catalog.is_empty() {
            warn!("Recommendations requested with an empty catalog");
            return RecommendationResponse::degraded(DEGRADED_MESSAGE);
        }

        let message = build_message(request);
        let system = build_system_prompt(catalog);

        let response =
            match tokio::time::timeout(self.timeout, client.chat(vec![message], Some(system)))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    warn!(error = %e, transient = e.is_transient(), "Recommendation request failed");
                    return RecommendationResponse::degraded(DEGRADED_MESSAGE);
                }
                Err(_) => {
                    warn!(timeout = ?self.timeout, "Recommendation request timed out");
                    return RecommendationResponse::degraded(DEGRADED_MESSAGE);
                }
            };

        match parse_recommendations(&response.text(), catalog) {
            Ok(set) => RecommendationResponse::ok(set),
            Err(e) => {
                warn!(error = %e, "Unusable recommendation response");
                RecommendationResponse::degraded(DEGRADED_MESSAGE)
            }
        }
    }
}

fn build_message(request: &RecommendationRequest) -> Message {
    let prompt = build_user_prompt(request);
    match request {
        RecommendationRequest::Description { .. } => Message::user_text(prompt),
        RecommendationRequest::Image { media_type, data } => Message::user_blocks(vec![
            ContentBlock::Image {
                source: ImageSource::Base64 {
                    media_type: media_type.as_mime().to_string(),
                    data: data.clone(),
                },
            },
            ContentBlock::Text { text: prompt },
        ]),
    }
}

/// Upper bound on the decoded size of base64 `data`.
const fn decoded_len(data: &str) -> usize {
    data.len() / 4 * 3
}

fn image_too_large() -> RecommendationResponse {
    RecommendationResponse::degraded(format!(
        "Images must be {} MB or smaller.",
        MAX_IMAGE_BYTES / (1024 * 1024)
    ))
}

fn capitalise(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect::<String>() + "."
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        serde_json::from_value(serde_json::json!({
            "frames": [{"id": "oak", "name": "Oak", "color": "natural", "material": "wood", "pricePerInch": 150}],
            "mats": [{"id": "ivory", "name": "Ivory", "color": "ivory", "price": 3500}],
            "glass": [{"id": "clear", "name": "Clear", "description": "Standard", "price": 4500}]
        }))
        .expect("catalog")
    }

    #[tokio::test]
    async fn test_disabled_service_degrades() {
        let service = RecommendationService::disabled();
        let request = RecommendationRequest::Description {
            text: "A watercolour of a harbour".to_string(),
        };
        let response = service.recommend(&request, &catalog()).await;
        assert!(response.is_degraded());
        assert!(response.recommendations.is_empty());
        assert_eq!(response.error.as_deref(), Some(DEGRADED_MESSAGE));
    }

    #[tokio::test]
    async fn test_invalid_input_degrades_with_reason() {
        let service = RecommendationService::disabled();
        let request = RecommendationRequest::Description {
            text: "   ".to_string(),
        };
        let response = service.recommend(&request, &catalog()).await;
        assert_eq!(response.error.as_deref(), Some("Artwork description is empty."));
    }

    #[test]
    fn test_image_request_checks_type_and_size() {
        let png = [0x89, b'P', b'N', b'G'];
        let request =
            RecommendationService::image_request(&png, Some("image/png")).expect("accepted");
        assert!(matches!(
            request,
            RecommendationRequest::Image {
                media_type: ImageMediaType::Png,
                ..
            }
        ));

        let rejected = RecommendationService::image_request(&png, Some("application/pdf"));
        assert!(matches!(rejected, Err(r) if r.is_degraded()));

        let rejected = RecommendationService::image_request(&[], Some("image/jpeg"));
        assert!(rejected.is_err());

        let big = vec![0_u8; MAX_IMAGE_BYTES + 1];
        let rejected = RecommendationService::image_request(&big, Some("image/jpeg"));
        assert!(matches!(rejected, Err(r) if r.error.as_deref() == Some("Images must be 5 MB or smaller.")));
    }

    #[test]
    fn test_image_message_has_image_then_text() {
        let request = RecommendationRequest::Image {
            media_type: ImageMediaType::Jpeg,
            data: "AAAA".to_string(),
        };
        let json = serde_json::to_value(build_message(&request)).expect("serialize");
        assert_eq!(json["content"][0]["type"], "image");
        assert_eq!(json["content"][0]["source"]["media_type"], "image/jpeg");
        assert_eq!(json["content"][1]["type"], "text");
    }

    #[test]
    fn test_capitalise() {
        assert_eq!(capitalise("image is empty"), "Image is empty.");
        assert_eq!(capitalise(""), "");
    }
}
