//! Seed the option catalog from a YAML file.
//!
//! # Usage
//!
//! ```bash
//! fs-cli seed catalog crates/cli/data/catalog.example.yaml
//! ```
//!
//! Entries are upserted by code, so the command can be re-run after editing
//! the file. List order becomes display order in the configurator.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use tracing::{error, info};

use frameshop_core::catalog::Catalog;
use frameshop_storefront::db::CatalogRepository;

use super::{CliError, connect};

/// Seed the catalog from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or if
/// the database write fails. Nothing is written unless the whole file is
/// valid.
pub async fn catalog(file_path: &str) -> Result<(), CliError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: file_path.to_string(),
            source,
        })?;
    let catalog = parse_catalog(&content)?;

    info!(
        frames = catalog.frames.len(),
        mats = catalog.mats.len(),
        glass = catalog.glass.len(),
        reveal_sizes = catalog.reveal_sizes.len(),
        "Catalog validated"
    );

    let pool = connect().await?;
    let summary = CatalogRepository::new(&pool).upsert(&catalog).await?;

    info!("Seeding complete!");
    info!("  Frames: {}", summary.frames);
    info!("  Mats: {}", summary.mats);
    info!("  Glass: {}", summary.glass);
    info!("  Reveal sizes: {}", summary.reveal_sizes);

    Ok(())
}

/// Parse and validate catalog YAML.
///
/// # Errors
///
/// Returns `CliError::Yaml` for malformed input or `CliError::Invalid`
/// after logging every validation problem.
pub fn parse_catalog(content: &str) -> Result<Catalog, CliError> {
    let catalog: Catalog = serde_yaml::from_str(content)?;

    let errors = validate_catalog(&catalog);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CliError::Invalid {
            count: errors.len(),
        });
    }

    Ok(catalog)
}

/// Every problem found in `catalog`. Empty when it can be seeded.
#[must_use]
pub fn validate_catalog(catalog: &Catalog) -> Vec<String> {
    let mut errors = Vec::new();

    check_entries(
        "frame",
        catalog
            .frames
            .iter()
            .map(|f| (f.id.as_str(), f.name.as_str(), f.price_per_inch)),
        &mut errors,
    );
    check_entries(
        "mat",
        catalog
            .mats
            .iter()
            .map(|m| (m.id.as_str(), m.name.as_str(), m.price)),
        &mut errors,
    );
    check_entries(
        "glass",
        catalog
            .glass
            .iter()
            .map(|g| (g.id.as_str(), g.name.as_str(), g.price)),
        &mut errors,
    );

    if catalog.mats.iter().filter(|m| m.is_no_mat()).count() > 1 {
        errors.push("only one mat may be the no-mat choice".to_string());
    }

    let mut reveal_ids = HashSet::new();
    for reveal in &catalog.reveal_sizes {
        if !reveal_ids.insert(reveal.id.as_str()) {
            errors.push(format!("duplicate reveal size '{}'", reveal.id));
        }
        if reveal.inches <= Decimal::ZERO {
            errors.push(format!("reveal size '{}' must be wider than zero", reveal.id));
        }
    }

    errors
}

fn check_entries<'a>(
    kind: &str,
    entries: impl Iterator<Item = (&'a str, &'a str, i64)>,
    errors: &mut Vec<String>,
) {
    let mut seen = HashSet::new();
    for (id, name, price) in entries {
        if id.trim().is_empty() {
            errors.push(format!("{kind} '{name}' has an empty id"));
        } else if !seen.insert(id) {
            errors.push(format!("duplicate {kind} '{id}'"));
        }
        if name.trim().is_empty() {
            errors.push(format!("{kind} '{id}' has an empty name"));
        }
        if price < 0 {
            errors.push(format!("{kind} '{id}' has a negative price"));
        }
    }
}
