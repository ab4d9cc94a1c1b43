//! Recommendation route handlers.
//!
//! Both endpoints always answer 200 with a `RecommendationResponse`; when
//! suggestions are unavailable the `error` field says why and the
//! configurator keeps working without them.

use axum::{
    Json,
    extract::{Multipart, State, rejection::JsonRejection},
};
use serde::Deserialize;
use tracing::{instrument, warn};

use frameshop_core::recommendation::{RecommendationRequest, RecommendationResponse};

use crate::services::RecommendationService;
use crate::state::AppState;

/// Name of the multipart field carrying the upload.
const IMAGE_FIELD: &str = "image";

const UNREADABLE_DESCRIPTION: &str = "Please describe your artwork.";

/// Text recommendation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionRequest {
    pub artwork_description: String,
}

/// Suggestions from a description of the artwork.
///
/// POST /api/recommendations
#[instrument(skip(state, body))]
pub async fn from_description(
    State(state): State<AppState>,
    body: Result<Json<DescriptionRequest>, JsonRejection>,
) -> Json<RecommendationResponse> {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Unreadable recommendation request");
            return Json(RecommendationResponse::degraded(UNREADABLE_DESCRIPTION));
        }
    };
    let request = RecommendationRequest::Description {
        text: body.artwork_description,
    };
    let catalog = state.catalog().get().await;
    Json(state.recommendations().recommend(&request, &catalog).await)
}

/// Suggestions from a photo of the artwork.
///
/// POST /api/recommendations/image (multipart, field `image`)
#[instrument(skip(state, multipart))]
pub async fn from_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Json<RecommendationResponse> {
    let request = match read_image(multipart).await {
        Ok(request) => request,
        Err(response) => return Json(response),
    };
    let catalog = state.catalog().get().await;
    Json(state.recommendations().recommend(&request, &catalog).await)
}

async fn read_image(
    mut multipart: Multipart,
) -> Result<RecommendationRequest, RecommendationResponse> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                return Err(RecommendationResponse::degraded(
                    "Please attach an image of your artwork.",
                ));
            }
            Err(e) => {
                warn!(error = %e, "Unreadable image upload");
                return Err(RecommendationResponse::degraded(
                    "The image upload could not be read. Please try again.",
                ));
            }
        };

        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_owned);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Image upload interrupted");
                return Err(RecommendationResponse::degraded(
                    "The image upload could not be read. Please try again.",
                ));
            }
        };
        return RecommendationService::image_request(&bytes, content_type.as_deref());
    }
}
