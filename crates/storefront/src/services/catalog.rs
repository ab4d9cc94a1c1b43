//! Cached access to the option catalog.
//!
//! The catalog changes rarely (only when the CLI seeds it), so it is cached
//! for 5 minutes. When the database is unavailable an empty catalog is
//! returned and nothing is cached, so the next request retries.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use frameshop_core::catalog::Catalog;

use crate::db::CatalogRepository;

const CACHE_KEY: &str = "catalog";

/// Catalog loader with a TTL cache.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    pool: PgPool,
    cache: Cache<&'static str, Arc<Catalog>>,
}

impl CatalogService {
    /// Create a catalog service backed by `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CatalogServiceInner { pool, cache }),
        }
    }

    /// The current catalog, empty if it cannot be loaded.
    #[instrument(skip(self))]
    pub async fn get(&self) -> Arc<Catalog> {
        if let Some(catalog) = self.inner.cache.get(CACHE_KEY).await {
            debug!("Cache hit for catalog");
            return catalog;
        }

        match CatalogRepository::new(&self.inner.pool).load().await {
            Ok(catalog) => {
                let catalog = Arc::new(catalog);
                self.inner.cache.insert(CACHE_KEY, Arc::clone(&catalog)).await;
                catalog
            }
            Err(e) => {
                warn!(error = %e, "Catalog unavailable, serving empty catalog");
                Arc::new(Catalog::empty())
            }
        }
    }

    /// Put `catalog` in the cache, bypassing the database.
    pub async fn prime(&self, catalog: Catalog) {
        self.inner.cache.insert(CACHE_KEY, Arc::new(catalog)).await;
    }

    /// Drop the cached catalog so the next read reloads it.
    pub async fn invalidate(&self) {
        self.inner.cache.invalidate(CACHE_KEY).await;
    }
}
