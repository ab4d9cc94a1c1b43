//! Option catalog queries.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use frameshop_core::catalog::{
    Catalog, FrameDetails, FrameOption, GlassOption, MatKind, MatOption, RevealSize,
};
use frameshop_core::{FrameId, GlassId, MatId, RevealSizeId};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct FrameRow {
    code: FrameId,
    name: String,
    color: String,
    material: String,
    price_per_inch: i64,
    collection: Option<String>,
    style: Option<String>,
    width_inches: Option<Decimal>,
}

impl From<FrameRow> for FrameOption {
    fn from(row: FrameRow) -> Self {
        let details = match row.collection {
            Some(collection) => FrameDetails::Collection {
                collection,
                style: row.style,
                width_inches: row.width_inches,
            },
            None => FrameDetails::Standard,
        };
        Self {
            id: row.code,
            name: row.name,
            color: row.color,
            material: row.material,
            price_per_inch: row.price_per_inch,
            details,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MatRow {
    code: MatId,
    name: String,
    color: String,
    price: i64,
    is_no_mat: bool,
}

impl From<MatRow> for MatOption {
    fn from(row: MatRow) -> Self {
        Self {
            id: row.code,
            name: row.name,
            color: row.color,
            price: row.price,
            kind: if row.is_no_mat {
                MatKind::NoMat
            } else {
                MatKind::Standard
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct GlassRow {
    code: GlassId,
    name: String,
    description: String,
    price: i64,
    features: Vec<String>,
}

impl From<GlassRow> for GlassOption {
    fn from(row: GlassRow) -> Self {
        Self {
            id: row.code,
            name: row.name,
            description: row.description,
            price: row.price,
            features: row.features,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RevealRow {
    code: RevealSizeId,
    label: String,
    inches: Decimal,
}

/// Counts written by [`CatalogRepository::upsert`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub frames: usize,
    pub mats: usize,
    pub glass: usize,
    pub reveal_sizes: usize,
}

/// Repository for the option catalog.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new repository with the given pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load every active catalog entry, in display order.
    ///
    /// When no reveal sizes are stored the standard set is used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn load(&self) -> Result<Catalog, RepositoryError> {
        let frames = sqlx::query_as::<_, FrameRow>(
            r"
            SELECT code, name, color, material, price_per_inch, collection, style, width_inches
            FROM storefront.frame
            WHERE active
            ORDER BY sort_order, name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let mats = sqlx::query_as::<_, MatRow>(
            r"
            SELECT code, name, color, price, is_no_mat
            FROM storefront.mat
            WHERE active
            ORDER BY sort_order, name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let glass = sqlx::query_as::<_, GlassRow>(
            r"
            SELECT code, name, description, price, features
            FROM storefront.glass
            WHERE active
            ORDER BY sort_order, name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let reveals = sqlx::query_as::<_, RevealRow>(
            "SELECT code, label, inches FROM storefront.reveal_size ORDER BY inches",
        )
        .fetch_all(self.pool)
        .await?;

        let reveal_sizes = if reveals.is_empty() {
            RevealSize::standard_set()
        } else {
            reveals
                .into_iter()
                .map(|r| RevealSize {
                    id: r.code,
                    label: r.label,
                    inches: r.inches,
                })
                .collect()
        };

        Ok(Catalog {
            frames: frames.into_iter().map(Into::into).collect(),
            mats: mats.into_iter().map(Into::into).collect(),
            glass: glass.into_iter().map(Into::into).collect(),
            reveal_sizes,
        })
    }

    /// Insert or update every entry of `catalog` in one transaction.
    ///
    /// Entries are never deleted; list position becomes the sort order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any write fails. Nothing is
    /// written in that case.
    #[instrument(skip(self, catalog), fields(frames = catalog.frames.len(), mats = catalog.mats.len()))]
    pub async fn upsert(&self, catalog: &Catalog) -> Result<SeedSummary, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for (position, frame) in catalog.frames.iter().enumerate() {
            let (collection, style, width_inches) = match &frame.details {
                FrameDetails::Standard => (None, None, None),
                FrameDetails::Collection {
                    collection,
                    style,
                    width_inches,
                } => (Some(collection.as_str()), style.as_deref(), *width_inches),
            };
            sqlx::query(
                r"
                INSERT INTO storefront.frame
                    (code, name, color, material, price_per_inch, collection, style, width_inches, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (code) DO UPDATE SET
                    name = EXCLUDED.name,
                    color = EXCLUDED.color,
                    material = EXCLUDED.material,
                    price_per_inch = EXCLUDED.price_per_inch,
                    collection = EXCLUDED.collection,
                    style = EXCLUDED.style,
                    width_inches = EXCLUDED.width_inches,
                    sort_order = EXCLUDED.sort_order,
                    active = TRUE,
                    updated_at = NOW()
                ",
            )
            .bind(&frame.id)
            .bind(&frame.name)
            .bind(&frame.color)
            .bind(&frame.material)
            .bind(frame.price_per_inch)
            .bind(collection)
            .bind(style)
            .bind(width_inches)
            .bind(sort_order(position))
            .execute(&mut *tx)
            .await?;
        }

        for (position, mat) in catalog.mats.iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO storefront.mat (code, name, color, price, is_no_mat, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (code) DO UPDATE SET
                    name = EXCLUDED.name,
                    color = EXCLUDED.color,
                    price = EXCLUDED.price,
                    is_no_mat = EXCLUDED.is_no_mat,
                    sort_order = EXCLUDED.sort_order,
                    active = TRUE,
                    updated_at = NOW()
                ",
            )
            .bind(&mat.id)
            .bind(&mat.name)
            .bind(&mat.color)
            .bind(mat.price)
            .bind(mat.is_no_mat())
            .bind(sort_order(position))
            .execute(&mut *tx)
            .await?;
        }

        for (position, glass) in catalog.glass.iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO storefront.glass (code, name, description, price, features, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (code) DO UPDATE SET
                    name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    price = EXCLUDED.price,
                    features = EXCLUDED.features,
                    sort_order = EXCLUDED.sort_order,
                    active = TRUE,
                    updated_at = NOW()
                ",
            )
            .bind(&glass.id)
            .bind(&glass.name)
            .bind(&glass.description)
            .bind(glass.price)
            .bind(&glass.features)
            .bind(sort_order(position))
            .execute(&mut *tx)
            .await?;
        }

        for reveal in &catalog.reveal_sizes {
            sqlx::query(
                r"
                INSERT INTO storefront.reveal_size (code, label, inches)
                VALUES ($1, $2, $3)
                ON CONFLICT (code) DO UPDATE SET
                    label = EXCLUDED.label,
                    inches = EXCLUDED.inches
                ",
            )
            .bind(&reveal.id)
            .bind(&reveal.label)
            .bind(reveal.inches)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(SeedSummary {
            frames: catalog.frames.len(),
            mats: catalog.mats.len(),
            glass: catalog.glass.len(),
            reveal_sizes: catalog.reveal_sizes.len(),
        })
    }
}

fn sort_order(position: usize) -> i32 {
    i32::try_from(position).unwrap_or(i32::MAX)
}
