//! Integration tests for Frameshop.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p frameshop-integration-tests
//! ```
//!
//! No database or network services are needed. The router runs against a
//! lazy pool pointing at a closed port (so any query fails fast), a primed
//! catalog cache, and in-process `axum` servers standing in for the Claude
//! API.
//!
//! # Test Categories
//!
//! - `storefront_api` - Routes, validation, error mapping
//! - `claude_upstream` - Recommendations and blog drafts against a fake
//!   Claude API

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::{Json, Router, http::StatusCode, routing::post};
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinHandle;

use frameshop_core::catalog::Catalog;
use frameshop_storefront::config::{ClaudeConfig, JobsConfig, StorefrontConfig};
use frameshop_storefront::content::{ContentStore, Post, parse_post};
use frameshop_storefront::state::AppState;

/// A pool whose every query fails after 200ms.
///
/// # Panics
///
/// Panics if the URL cannot be parsed.
#[must_use]
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgres://frameshop@127.0.0.1:1/frameshop")
        .expect("lazy pool")
}

/// Storefront configuration with every optional integration off.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://frameshop@127.0.0.1:1/frameshop"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        content_dir: PathBuf::from("target/test-content"),
        claude: None,
        email: None,
        calendar: None,
        jobs: JobsConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Claude configuration pointing at `api_url`.
#[must_use]
pub fn claude_config(api_url: &str) -> ClaudeConfig {
    ClaudeConfig {
        api_key: SecretString::from("test-key-not-used-upstream"),
        model: "claude-test".to_string(),
        api_url: api_url.to_string(),
        timeout: Duration::from_secs(5),
    }
}

/// The catalog most tests price against.
///
/// # Panics
///
/// Panics if the fixture JSON no longer matches the catalog types.
#[must_use]
pub fn sample_catalog() -> Catalog {
    serde_json::from_value(json!({
        "frames": [
            { "id": "oak-classic", "name": "Classic Oak", "color": "natural",
              "material": "oak", "pricePerInch": 150 },
            { "id": "gallery-black", "name": "Gallery Black", "color": "black",
              "material": "maple", "pricePerInch": 200,
              "details": { "source": "collection", "collection": "Gallery" } }
        ],
        "mats": [
            { "id": "ivory", "name": "Ivory", "color": "ivory", "price": 3500 },
            { "id": "no-mat", "name": "No Mat", "color": "none", "price": 3500, "kind": "no_mat" }
        ],
        "glass": [
            { "id": "conservation", "name": "Conservation Clear",
              "description": "UV-filtering glass", "price": 4500 }
        ],
        "revealSizes": [
            { "id": "eighth", "label": "1/8\"", "inches": "0.125" }
        ]
    }))
    .expect("sample catalog")
}

/// Two posts, one of them a draft.
///
/// # Panics
///
/// Panics if the fixture markdown no longer parses.
#[must_use]
pub fn sample_posts() -> Vec<Post> {
    vec![
        parse_post(
            "choosing-a-mat",
            "---\ntitle: Choosing a mat\npublishedAt: 2026-03-02\ntags: [mats]\n---\n\nStart with ivory.\n",
        )
        .expect("published post"),
        parse_post(
            "unreviewed",
            "---\ntitle: Not ready\npublishedAt: 2026-04-01\ndraft: true\n---\n\nDraft body.\n",
        )
        .expect("draft post"),
    ]
}

/// Application state over the lazy pool with the sample catalog primed.
///
/// # Panics
///
/// Panics if the state cannot be built.
pub async fn test_state(config: StorefrontConfig) -> AppState {
    let state = AppState::with_content(
        config,
        lazy_pool(),
        ContentStore::from_posts(sample_posts()),
    )
    .expect("state");
    state.catalog().prime(sample_catalog()).await;
    state
}

/// Body of a Messages API reply whose only content is `text`.
#[must_use]
pub fn claude_reply(text: &str) -> Value {
    json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "model": "claude-test",
        "stop_reason": "end_turn",
        "content": [{ "type": "text", "text": text }],
        "usage": { "input_tokens": 12, "output_tokens": 34 }
    })
}

/// A stand-in for the Claude Messages API.
pub struct FakeClaude {
    pub url: String,
    handle: JoinHandle<()>,
}

impl FakeClaude {
    /// Answer every request to `/v1/messages` with `status` and `body`.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start(status: StatusCode, body: Value) -> Self {
        Self::start_delayed(status, body, Duration::ZERO).await
    }

    /// Like [`start`](Self::start), but wait `delay` before answering.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start_delayed(status: StatusCode, body: Value, delay: Duration) -> Self {
        let app = Router::new().route(
            "/v1/messages",
            post(move || {
                let body = body.clone();
                async move {
                    tokio::time::sleep(delay).await;
                    (status, Json(body))
                }
            }),
        );
        Self::serve(app).await
    }

    /// Serve a custom router, for tests that need to inspect requests.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn serve(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("bind fake claude");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            url: format!("http://{addr}/v1/messages"),
            handle,
        }
    }
}

impl Drop for FakeClaude {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
