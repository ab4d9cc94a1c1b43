//! Pricing calculator.
//!
//! Price is a pure function of a [`DesignSelection`] and a [`Catalog`].
//! Missing selections contribute nothing; the calculator never fails.
//!
//! Each component is rounded to whole cents on its own and the total is
//! the sum of the rounded components, so adding or removing one option
//! changes the total by exactly that option's line.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, MatOption};
use crate::design::{DesignSelection, MatLayer, clamp_dimension};
use crate::types::{Price, round_to_cents};

/// Fees and multipliers applied on top of catalog prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingRules {
    /// Charged on every design, in cents.
    pub mounting_fee: i64,
    /// Charged once when any extra mat layer is active, in cents.
    pub advanced_matting_fee: i64,
    /// Float mounting, in cents.
    pub float_mount_fee: i64,
    /// Glass spacers, in cents. Only charged together with float mounting.
    pub glass_spacer_fee: i64,
    /// Multiplier on the stacked frame's perimeter cost.
    pub stacked_frame_premium: Decimal,
    /// Multiplier on each extra mat layer's price.
    pub extra_mat_surcharge: Decimal,
}

impl PricingRules {
    /// The shop's current rate card.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            mounting_fee: 2500,
            advanced_matting_fee: 1500,
            float_mount_fee: 5000,
            glass_spacer_fee: 3500,
            stacked_frame_premium: Decimal::new(120, 2),
            extra_mat_surcharge: Decimal::new(110, 2),
        }
    }
}

impl Default for PricingRules {
    fn default() -> Self {
        Self::standard()
    }
}

/// Itemised price of a design, every field in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub frame: i64,
    pub stacked_frame: i64,
    pub top_mat: i64,
    pub middle_mat: i64,
    pub bottom_mat: i64,
    pub glass: i64,
    pub mounting: i64,
    pub advanced_matting: i64,
    pub float_mount: i64,
    pub glass_spacer: i64,
}

impl PriceBreakdown {
    /// Sum of all components.
    #[must_use]
    pub fn total(&self) -> Price {
        [
            self.frame,
            self.stacked_frame,
            self.top_mat,
            self.middle_mat,
            self.bottom_mat,
            self.glass,
            self.mounting,
            self.advanced_matting,
            self.float_mount,
            self.glass_spacer,
        ]
        .into_iter()
        .map(Price::from_cents)
        .sum()
    }

    /// Matting lines only (top mat plus extra layers and their surcharge).
    #[must_use]
    pub const fn matting(&self) -> i64 {
        self.top_mat
            .saturating_add(self.middle_mat)
            .saturating_add(self.bottom_mat)
            .saturating_add(self.advanced_matting)
    }
}

/// Price a selection with the standard rate card.
#[must_use]
pub fn calculate(selection: &DesignSelection, catalog: &Catalog) -> PriceBreakdown {
    calculate_with(&PricingRules::standard(), selection, catalog)
}

/// Total price of a selection with the standard rate card.
#[must_use]
pub fn price(selection: &DesignSelection, catalog: &Catalog) -> Price {
    calculate(selection, catalog).total()
}

/// Price a selection with an explicit rate card.
#[must_use]
pub fn calculate_with(
    rules: &PricingRules,
    selection: &DesignSelection,
    catalog: &Catalog,
) -> PriceBreakdown {
    let perimeter = perimeter(selection);

    let frame = selection
        .frame
        .as_ref()
        .and_then(|id| catalog.frame(id))
        .map_or(0, |f| round_to_cents(perimeter * Decimal::from(f.price_per_inch)));

    let stacked_frame = selection
        .stacked_frame
        .active()
        .and_then(|id| catalog.frame(id))
        .map_or(0, |f| {
            round_to_cents(
                perimeter * Decimal::from(f.price_per_inch) * rules.stacked_frame_premium,
            )
        });

    let top_mat = selection
        .top_mat
        .as_ref()
        .and_then(|id| catalog.mat(id))
        .map_or(0, MatOption::effective_price);

    let middle = active_layer_mat(&selection.middle_mat, catalog);
    let bottom = active_layer_mat(&selection.bottom_mat, catalog);
    let surcharge = |mat: &MatOption| {
        round_to_cents(Decimal::from(mat.effective_price()) * rules.extra_mat_surcharge)
    };

    let glass = selection
        .glass
        .as_ref()
        .and_then(|id| catalog.glass(id))
        .map_or(0, |g| g.price);

    PriceBreakdown {
        frame,
        stacked_frame,
        top_mat,
        middle_mat: middle.map_or(0, surcharge),
        bottom_mat: bottom.map_or(0, surcharge),
        glass,
        mounting: rules.mounting_fee,
        advanced_matting: if middle.is_some() || bottom.is_some() {
            rules.advanced_matting_fee
        } else {
            0
        },
        float_mount: if selection.float_mount {
            rules.float_mount_fee
        } else {
            0
        },
        glass_spacer: if selection.float_mount && selection.glass_spacer {
            rules.glass_spacer_fee
        } else {
            0
        },
    }
}

/// Artwork perimeter in inches.
fn perimeter(selection: &DesignSelection) -> Decimal {
    let width = clamp_dimension(selection.width);
    let height = clamp_dimension(selection.height);
    Decimal::TWO * (width + height)
}

/// The mat an extra layer contributes, if the layer counts as active.
fn active_layer_mat<'a>(layer: &MatLayer, catalog: &'a Catalog) -> Option<&'a MatOption> {
    layer
        .active_mat()
        .and_then(|id| catalog.mat(id))
        .filter(|mat| !mat.is_no_mat())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;
    use crate::design::StackedFrame;
    use crate::types::{FrameId, GlassId, MatId};

    fn base_selection() -> DesignSelection {
        DesignSelection {
            width: Decimal::from(16),
            height: Decimal::from(20),
            frame: Some(FrameId::new("oak-classic")),
            top_mat: Some(MatId::new("ivory")),
            glass: Some(GlassId::new("conservation")),
            ..DesignSelection::default()
        }
    }

    fn layer(mat: &str) -> MatLayer {
        MatLayer {
            enabled: true,
            mat: Some(MatId::new(mat)),
            reveal: None,
        }
    }

    #[test]
    fn test_basic_design() {
        let catalog = fixtures::catalog();
        let breakdown = calculate(&base_selection(), &catalog);
        assert_eq!(breakdown.frame, 10800);
        assert_eq!(breakdown.top_mat, 3500);
        assert_eq!(breakdown.glass, 4500);
        assert_eq!(breakdown.mounting, 2500);
        assert_eq!(breakdown.total().cents, 21300);
    }

    #[test]
    fn test_no_mat_sentinel_costs_nothing() {
        let catalog = fixtures::catalog();
        let selection = DesignSelection {
            top_mat: Some(MatId::new("no-mat")),
            ..base_selection()
        };
        let breakdown = calculate(&selection, &catalog);
        assert_eq!(breakdown.matting(), 0);
        assert_eq!(breakdown.total().cents, 17800);
    }

    #[test]
    fn test_float_mount_and_spacer() {
        let catalog = fixtures::catalog();
        let base = price(&base_selection(), &catalog).cents;

        let spacer_only = DesignSelection {
            glass_spacer: true,
            ..base_selection()
        };
        assert_eq!(price(&spacer_only, &catalog).cents, base);

        let float = DesignSelection {
            float_mount: true,
            ..base_selection()
        };
        assert_eq!(price(&float, &catalog).cents, base + 5000);

        let both = DesignSelection {
            float_mount: true,
            glass_spacer: true,
            ..base_selection()
        };
        assert_eq!(price(&both, &catalog).cents, 29800);
    }

    #[test]
    fn test_empty_selection_is_mounting_fee_only() {
        let catalog = fixtures::catalog();
        let breakdown = calculate(&DesignSelection::default(), &catalog);
        assert_eq!(breakdown.total().cents, 2500);
        assert_eq!(
            price(&base_selection(), &Catalog::empty()).cents,
            2500,
            "unknown ids contribute nothing"
        );
    }

    #[test]
    fn test_price_never_below_mounting_fee() {
        let catalog = fixtures::catalog();
        let selections = [
            DesignSelection::default(),
            base_selection(),
            DesignSelection {
                top_mat: Some(MatId::new("no-mat")),
                width: Decimal::ZERO,
                height: Decimal::ZERO,
                ..base_selection()
            },
            DesignSelection {
                width: Decimal::from(-40),
                ..base_selection()
            },
        ];
        for selection in &selections {
            assert!(price(selection, &catalog).cents >= 2500);
        }
    }

    #[test]
    fn test_monotonic_in_dimensions() {
        let catalog = fixtures::catalog();
        let mut previous = 0;
        for tenths in 0..=400 {
            let selection = DesignSelection {
                width: Decimal::new(tenths, 1),
                ..base_selection()
            };
            let cents = price(&selection, &catalog).cents;
            assert!(cents >= previous, "width {tenths}/10 dropped the price");
            previous = cents;
        }

        let mut previous = 0;
        for height in 0..=60 {
            let selection = DesignSelection {
                height: Decimal::from(height),
                ..base_selection()
            };
            let cents = price(&selection, &catalog).cents;
            assert!(cents >= previous);
            previous = cents;
        }
    }

    #[test]
    fn test_extra_layers_share_one_surcharge() {
        let catalog = fixtures::catalog();
        let base = price(&base_selection(), &catalog).cents;

        let middle = DesignSelection {
            middle_mat: layer("ivory"),
            ..base_selection()
        };
        // 3500 * 1.10 + 1500
        assert_eq!(price(&middle, &catalog).cents, base + 3850 + 1500);

        let both = DesignSelection {
            middle_mat: layer("ivory"),
            bottom_mat: layer("charcoal"),
            ..base_selection()
        };
        let breakdown = calculate(&both, &catalog);
        assert_eq!(breakdown.bottom_mat, 3666);
        assert_eq!(breakdown.advanced_matting, 1500);
        assert_eq!(breakdown.total().cents, base + 3850 + 3666 + 1500);
    }

    #[test]
    fn test_inactive_layers_cost_nothing() {
        let catalog = fixtures::catalog();
        let base = price(&base_selection(), &catalog).cents;

        let disabled = DesignSelection {
            middle_mat: MatLayer {
                enabled: false,
                ..layer("ivory")
            },
            ..base_selection()
        };
        assert_eq!(price(&disabled, &catalog).cents, base);

        let no_mat_layer = DesignSelection {
            bottom_mat: layer("no-mat"),
            ..base_selection()
        };
        assert_eq!(price(&no_mat_layer, &catalog).cents, base);

        let unselected = DesignSelection {
            middle_mat: MatLayer {
                enabled: true,
                mat: None,
                reveal: None,
            },
            ..base_selection()
        };
        assert_eq!(price(&unselected, &catalog).cents, base);
    }

    #[test]
    fn test_bottom_layer_without_middle_is_priced() {
        let catalog = fixtures::catalog();
        let selection = DesignSelection {
            bottom_mat: layer("ivory"),
            ..base_selection()
        };
        let breakdown = calculate(&selection, &catalog);
        assert_eq!(breakdown.middle_mat, 0);
        assert_eq!(breakdown.bottom_mat, 3850);
        assert_eq!(breakdown.advanced_matting, 1500);
    }

    #[test]
    fn test_stacked_frame_premium() {
        let catalog = fixtures::catalog();
        let selection = DesignSelection {
            stacked_frame: StackedFrame {
                enabled: true,
                frame: Some(FrameId::new("gallery-black")),
            },
            ..base_selection()
        };
        // 72in * 200 * 1.20
        assert_eq!(calculate(&selection, &catalog).stacked_frame, 17280);

        let disabled = DesignSelection {
            stacked_frame: StackedFrame {
                enabled: false,
                frame: Some(FrameId::new("gallery-black")),
            },
            ..base_selection()
        };
        assert_eq!(calculate(&disabled, &catalog).stacked_frame, 0);
    }

    #[test]
    fn test_fractional_dimensions_round_per_component() {
        let catalog = fixtures::catalog();
        let selection = DesignSelection {
            width: Decimal::new(10125, 3),
            height: Decimal::new(8, 0),
            ..base_selection()
        };
        // 2 * 18.125 * 150 = 5437.5 -> 5438
        assert_eq!(calculate(&selection, &catalog).frame, 5438);
    }

    #[test]
    fn test_custom_rules() {
        let catalog = fixtures::catalog();
        let rules = PricingRules {
            mounting_fee: 0,
            ..PricingRules::standard()
        };
        let breakdown = calculate_with(&rules, &base_selection(), &catalog);
        assert_eq!(breakdown.total().cents, 18800);
    }
}
