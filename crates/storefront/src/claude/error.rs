//! Failures talking to the Messages API.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Used when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Why a Claude call produced no usable response.
///
/// Every variant degrades a recommendation the same way; the distinction
/// only matters for logs and for deciding whether a retry could help.
#[derive(Debug, Error)]
pub enum ClaudeError {
    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("request to Claude failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by Claude, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Claude rejected the API key")]
    Unauthorized,

    #[error("Claude returned {status} ({kind}): {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("unreadable Claude response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// `{"type": "error", "error": {"type": ..., "message": ...}}`
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl ClaudeError {
    /// Classify a non-success response from its status, `Retry-After`
    /// header and body.
    pub(super) fn from_status(status: StatusCode, retry_after: Option<&str>, body: &str) -> Self {
        match status {
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited {
                retry_after_secs: retry_after
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            },
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            _ => match serde_json::from_str::<ErrorEnvelope>(body) {
                Ok(envelope) => Self::Api {
                    status: status.as_u16(),
                    kind: envelope.error.kind,
                    message: envelope.error.message,
                },
                Err(_) => Self::Api {
                    status: status.as_u16(),
                    kind: "unknown".to_string(),
                    message: body.chars().take(200).collect(),
                },
            },
        }
    }

    /// Whether the same request might succeed later.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited { .. } => true,
            // 529 is Anthropic's "overloaded".
            Self::Api { status, .. } => *status >= 500,
            Self::Config(_) | Self::Unauthorized | Self::Parse(_) => false,
        }
    }
}
