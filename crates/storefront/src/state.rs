//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::content::{ContentError, ContentStore};
use crate::services::{
    CalendarClient, CalendarError, CatalogService, EmailService, Notifier, RecommendationService,
};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("email setup failed: {0}")]
    Email(#[from] lettre::transport::smtp::Error),
    #[error("calendar setup failed: {0}")]
    Calendar(#[from] CalendarError),
    #[error("content load failed: {0}")]
    Content(#[from] ContentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: CatalogService,
    recommendations: RecommendationService,
    notifier: Notifier,
    content: ContentStore,
}

impl AppState {
    /// Create a new application state, loading blog content from
    /// `config.content_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if email or calendar configuration is unusable, or
    /// the content directory cannot be read.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let content = ContentStore::load(&config.content_dir)?;
        Self::with_content(config, pool, content)
    }

    /// Create a new application state with already-loaded content.
    ///
    /// # Errors
    ///
    /// Returns an error if email or calendar configuration is unusable.
    pub fn with_content(
        config: StorefrontConfig,
        pool: PgPool,
        content: ContentStore,
    ) -> Result<Self, StateError> {
        let email = config
            .email
            .as_ref()
            .map(|email| EmailService::new(email, &config.base_url))
            .transpose()?;
        let calendar = config
            .calendar
            .as_ref()
            .map(CalendarClient::new)
            .transpose()?;

        if email.is_none() {
            tracing::warn!("SMTP not configured, customer emails will be skipped");
        }
        if calendar.is_none() {
            tracing::info!("Calendar not configured, appointments will not be synced");
        }

        let recommendations = RecommendationService::new(config.claude.as_ref());
        let catalog = CatalogService::new(pool.clone());
        let notifier = Notifier::new(email, calendar, pool.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                recommendations,
                notifier,
                content,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Cached option catalog.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// AI recommendation service.
    #[must_use]
    pub fn recommendations(&self) -> &RecommendationService {
        &self.inner.recommendations
    }

    /// Background notification dispatch.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Blog content.
    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.inner.content
    }
}
