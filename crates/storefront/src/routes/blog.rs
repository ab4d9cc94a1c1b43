//! Blog route handlers.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::content::{Post, PostSummary};
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

/// Optional tag filter for the listing.
#[derive(Debug, Deserialize)]
pub struct BlogQuery {
    #[serde(default)]
    pub tag: Option<String>,
}

/// Published posts, newest first.
///
/// GET /api/blog
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BlogQuery>,
) -> Response {
    let content = state.content();
    let posts: Vec<PostSummary<'_>> = match query.tag.as_deref() {
        Some(tag) => content.get_posts_by_tag(tag).map(PostSummary::from).collect(),
        None => content.get_published_posts().map(PostSummary::from).collect(),
    };
    // Summaries borrow from the store, so serialize here.
    Json(posts).into_response()
}

/// A single published post.
///
/// GET /api/blog/{slug}
///
/// # Errors
///
/// Returns 404 for unknown slugs and drafts.
pub async fn show(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<Post>> {
    state
        .content()
        .get_post(&slug)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("post '{slug}'")))
}
