//! Option catalog: frames, mats, glazing, and mat reveal sizes.
//!
//! Catalog entries are immutable snapshots. The storefront loads them from
//! the database and hands a [`Catalog`] to the pricing calculator, the
//! design state, and the recommendation mapper.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{FrameId, GlassId, MatId, RevealSizeId};

/// A frame moulding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameOption {
    pub id: FrameId,
    pub name: String,
    pub color: String,
    pub material: String,
    /// Price in cents per linear inch of perimeter (150 = $1.50/in).
    pub price_per_inch: i64,
    #[serde(default)]
    pub details: FrameDetails,
}

/// Source-specific metadata for a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FrameDetails {
    /// In-house stock moulding.
    #[default]
    Standard,
    /// Moulding from a vendor collection.
    #[serde(rename_all = "camelCase")]
    Collection {
        collection: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width_inches: Option<Decimal>,
    },
}

impl FrameDetails {
    /// Collection name, if the frame belongs to one.
    #[must_use]
    pub fn collection(&self) -> Option<&str> {
        match self {
            Self::Standard => None,
            Self::Collection { collection, .. } => Some(collection),
        }
    }
}

/// Whether a mat entry is a real mat board or the "no mat" choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatKind {
    #[default]
    Standard,
    NoMat,
}

/// A mat board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatOption {
    pub id: MatId,
    pub name: String,
    pub color: String,
    /// Flat price in cents.
    pub price: i64,
    #[serde(default)]
    pub kind: MatKind,
}

impl MatOption {
    /// Whether this entry is the "no mat" sentinel.
    #[must_use]
    pub fn is_no_mat(&self) -> bool {
        self.kind == MatKind::NoMat
    }

    /// Price that actually applies: always zero for the "no mat" sentinel.
    #[must_use]
    pub fn effective_price(&self) -> i64 {
        match self.kind {
            MatKind::Standard => self.price,
            MatKind::NoMat => 0,
        }
    }
}

/// A glazing option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlassOption {
    pub id: GlassId,
    pub name: String,
    pub description: String,
    /// Flat price in cents.
    pub price: i64,
    /// Marketing features (e.g. "99% UV protection", "anti-reflective").
    #[serde(default)]
    pub features: Vec<String>,
}

/// Visible border width between stacked mats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealSize {
    pub id: RevealSizeId,
    pub label: String,
    pub inches: Decimal,
}

impl RevealSize {
    /// The eight named reveal sizes offered in the shop, smallest first.
    #[must_use]
    pub fn standard_set() -> Vec<Self> {
        [
            ("eighth", "1/8\"", Decimal::new(125, 3)),
            ("three-sixteenths", "3/16\"", Decimal::new(1875, 4)),
            ("quarter", "1/4\"", Decimal::new(25, 2)),
            ("five-sixteenths", "5/16\"", Decimal::new(3125, 4)),
            ("three-eighths", "3/8\"", Decimal::new(375, 3)),
            ("half", "1/2\"", Decimal::new(5, 1)),
            ("five-eighths", "5/8\"", Decimal::new(625, 3)),
            ("three-quarters", "3/4\"", Decimal::new(75, 2)),
        ]
        .into_iter()
        .map(|(id, label, inches)| Self {
            id: RevealSizeId::new(id),
            label: label.to_owned(),
            inches,
        })
        .collect()
    }
}

/// A snapshot of everything a customer can choose from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub frames: Vec<FrameOption>,
    #[serde(default)]
    pub mats: Vec<MatOption>,
    #[serde(default)]
    pub glass: Vec<GlassOption>,
    #[serde(default)]
    pub reveal_sizes: Vec<RevealSize>,
}

impl Catalog {
    /// A catalog with nothing in it, used when the catalog is unavailable.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether there is nothing to choose from.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.mats.is_empty() && self.glass.is_empty()
    }

    #[must_use]
    pub fn frame(&self, id: &FrameId) -> Option<&FrameOption> {
        self.frames.iter().find(|f| &f.id == id)
    }

    #[must_use]
    pub fn mat(&self, id: &MatId) -> Option<&MatOption> {
        self.mats.iter().find(|m| &m.id == id)
    }

    #[must_use]
    pub fn glass(&self, id: &GlassId) -> Option<&GlassOption> {
        self.glass.iter().find(|g| &g.id == id)
    }

    #[must_use]
    pub fn reveal_size(&self, id: &RevealSizeId) -> Option<&RevealSize> {
        self.reveal_sizes.iter().find(|r| &r.id == id)
    }

    /// The smallest reveal on offer, used as the default for a new mat layer.
    #[must_use]
    pub fn smallest_reveal(&self) -> Option<&RevealSize> {
        self.reveal_sizes.iter().min_by_key(|r| r.inches)
    }

    /// Minimal projection of the catalog for the AI recommender.
    #[must_use]
    pub fn digest(&self) -> CatalogDigest {
        CatalogDigest {
            frames: self
                .frames
                .iter()
                .map(|f| DigestEntry {
                    id: f.id.to_string(),
                    name: f.name.clone(),
                    detail: format!("{} {}", f.color, f.material),
                })
                .collect(),
            mats: self
                .mats
                .iter()
                .map(|m| DigestEntry {
                    id: m.id.to_string(),
                    name: m.name.clone(),
                    detail: m.color.clone(),
                })
                .collect(),
            glass: self
                .glass
                .iter()
                .map(|g| DigestEntry {
                    id: g.id.to_string(),
                    name: g.name.clone(),
                    detail: if g.features.is_empty() {
                        g.description.clone()
                    } else {
                        g.features.join(", ")
                    },
                })
                .collect(),
        }
    }
}

/// The catalog fields the recommender needs, and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogDigest {
    pub frames: Vec<DigestEntry>,
    pub mats: Vec<DigestEntry>,
    pub glass: Vec<DigestEntry>,
}

/// A single entry in a [`CatalogDigest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestEntry {
    pub id: String,
    pub name: String,
    pub detail: String,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_reveal_set() {
        let sizes = RevealSize::standard_set();
        assert_eq!(sizes.len(), 8);
        assert_eq!(sizes.first().map(|r| r.inches), Some(Decimal::new(125, 3)));
        assert_eq!(sizes.get(1).map(|r| r.inches), Some(Decimal::new(1875, 4)));
        assert_eq!(sizes.last().map(|r| r.inches), Some(Decimal::new(75, 2)));
        assert!(sizes.windows(2).all(|w| match w {
            [a, b] => a.inches < b.inches,
            _ => true,
        }));
    }

    #[test]
    fn test_no_mat_effective_price_is_zero() {
        let catalog = fixtures::catalog();
        let no_mat = catalog.mat(&MatId::new("no-mat")).expect("fixture");
        assert_eq!(no_mat.price, 3500);
        assert_eq!(no_mat.effective_price(), 0);
        assert!(no_mat.is_no_mat());
    }

    #[test]
    fn test_smallest_reveal() {
        let catalog = fixtures::catalog();
        let smallest = catalog.smallest_reveal().expect("reveal");
        assert_eq!(smallest.id, RevealSizeId::new("eighth"));
        assert!(Catalog::empty().smallest_reveal().is_none());
    }

    #[test]
    fn test_frame_details_tagging() {
        let json = r#"{
            "id": "gallery-black",
            "name": "Gallery Black",
            "color": "black",
            "material": "maple",
            "pricePerInch": 200,
            "details": {"source": "collection", "collection": "Gallery"}
        }"#;
        let frame: FrameOption = serde_json::from_str(json).expect("deserialize");
        assert_eq!(frame.details.collection(), Some("Gallery"));

        let json = r#"{"id":"x","name":"X","color":"c","material":"m","pricePerInch":1}"#;
        let frame: FrameOption = serde_json::from_str(json).expect("deserialize");
        assert_eq!(frame.details, FrameDetails::Standard);
    }

    #[test]
    fn test_digest_uses_minimal_fields() {
        let digest = fixtures::catalog().digest();
        let json = serde_json::to_value(&digest).expect("serialize");
        let frame = &json["frames"][0];
        assert_eq!(frame["id"], "oak-classic");
        assert_eq!(frame["detail"], "natural oak");
        assert!(frame.get("pricePerInch").is_none());
        assert_eq!(json["glass"][0]["detail"], "99% UV protection");
        assert_eq!(json["glass"][1]["detail"], "Anti-reflective conservation glass");
    }
}
