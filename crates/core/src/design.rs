//! In-progress frame design: the selection struct and its state machine.
//!
//! [`DesignSelection`] is the plain data the client holds and posts back.
//! [`DesignState`] wraps it with the toggle rules and the
//! last-response-wins bookkeeping for recommendation round trips.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::Catalog;
use crate::pricing::{self, PriceBreakdown};
use crate::recommendation::RecommendationSet;
use crate::types::{FrameId, GlassId, MatId, Price, RevealSizeId};

/// Largest accepted artwork edge, in inches. Anything above is clamped.
pub const MAX_DIMENSION_INCHES: i64 = 10_000;

/// Clamp a dimension into `0..=MAX_DIMENSION_INCHES`.
#[must_use]
pub fn clamp_dimension(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, Decimal::from(MAX_DIMENSION_INCHES))
}

/// Parse a dimension typed by a customer.
///
/// Never fails: empty, non-numeric, or negative input becomes zero and
/// oversized input is clamped.
#[must_use]
pub fn parse_dimension_lenient(input: &str) -> Decimal {
    Decimal::from_str(input.trim()).map_or(Decimal::ZERO, clamp_dimension)
}

fn deserialize_dimension<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => parse_dimension_lenient(&n.to_string()),
        serde_json::Value::String(s) => parse_dimension_lenient(&s),
        _ => Decimal::ZERO,
    })
}

/// Optional second frame profile outside the primary frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StackedFrame {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub frame: Option<FrameId>,
}

impl StackedFrame {
    /// The stacked frame that counts toward price, if any.
    #[must_use]
    pub fn active(&self) -> Option<&FrameId> {
        self.frame.as_ref().filter(|_| self.enabled)
    }
}

/// An additional mat layer beneath the top mat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MatLayer {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mat: Option<MatId>,
    #[serde(default)]
    pub reveal: Option<RevealSizeId>,
}

impl MatLayer {
    /// The mat that counts toward price, if the layer is enabled.
    #[must_use]
    pub fn active_mat(&self) -> Option<&MatId> {
        self.mat.as_ref().filter(|_| self.enabled)
    }
}

/// Everything the customer has chosen so far.
///
/// Price is a pure function of this struct plus the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DesignSelection {
    /// Artwork width in inches.
    #[serde(default, deserialize_with = "deserialize_dimension")]
    pub width: Decimal,
    /// Artwork height in inches.
    #[serde(default, deserialize_with = "deserialize_dimension")]
    pub height: Decimal,
    #[serde(default)]
    pub frame: Option<FrameId>,
    #[serde(default)]
    pub stacked_frame: StackedFrame,
    #[serde(default)]
    pub top_mat: Option<MatId>,
    #[serde(default)]
    pub middle_mat: MatLayer,
    #[serde(default)]
    pub bottom_mat: MatLayer,
    #[serde(default)]
    pub glass: Option<GlassId>,
    #[serde(default, alias = "useFloatMount")]
    pub float_mount: bool,
    #[serde(default, alias = "useGlassSpacer")]
    pub glass_spacer: bool,
}

/// Which extra mat layer an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatLayerPosition {
    Middle,
    Bottom,
}

/// Identifies one recommendation request issued from a [`DesignState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecommendationTicket(u64);

/// What happened when a recommendation result was offered to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// At least one selection changed.
    Applied,
    /// The result was for the latest request but had nothing usable.
    NothingToApply,
    /// A newer request was issued after this one; the result was ignored.
    Stale,
}

/// The single mutable source of truth for a configurator session.
#[derive(Debug, Clone, Default)]
pub struct DesignState {
    selection: DesignSelection,
    latest_ticket: u64,
}

impl DesignState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a selection the client already holds.
    #[must_use]
    pub fn from_selection(selection: DesignSelection) -> Self {
        Self {
            selection,
            latest_ticket: 0,
        }
    }

    #[must_use]
    pub const fn selection(&self) -> &DesignSelection {
        &self.selection
    }

    #[must_use]
    pub fn into_selection(self) -> DesignSelection {
        self.selection
    }

    pub fn set_dimensions(&mut self, width: Decimal, height: Decimal) {
        self.selection.width = clamp_dimension(width);
        self.selection.height = clamp_dimension(height);
    }

    /// Set dimensions from raw text input. Invalid input becomes zero.
    pub fn set_dimensions_lenient(&mut self, width: &str, height: &str) {
        self.selection.width = parse_dimension_lenient(width);
        self.selection.height = parse_dimension_lenient(height);
    }

    pub fn select_frame(&mut self, frame: Option<FrameId>) {
        self.selection.frame = frame;
    }

    /// Toggle the stacked frame. The chosen profile is kept while disabled.
    pub fn set_stacked_frame_enabled(&mut self, enabled: bool) {
        self.selection.stacked_frame.enabled = enabled;
    }

    pub fn select_stacked_frame(&mut self, frame: Option<FrameId>) {
        self.selection.stacked_frame.frame = frame;
    }

    pub fn select_top_mat(&mut self, mat: Option<MatId>) {
        self.selection.top_mat = mat;
    }

    /// Toggle an extra mat layer.
    ///
    /// Layers are independent: turning the middle layer off leaves the
    /// bottom layer as it is. The first time a layer is enabled its reveal
    /// defaults to the smallest reveal in the catalog.
    pub fn set_mat_layer_enabled(
        &mut self,
        position: MatLayerPosition,
        enabled: bool,
        catalog: &Catalog,
    ) {
        let layer = self.layer_mut(position);
        layer.enabled = enabled;
        if enabled && layer.reveal.is_none() {
            layer.reveal = catalog.smallest_reveal().map(|r| r.id.clone());
        }
    }

    pub fn set_middle_mat_enabled(&mut self, enabled: bool, catalog: &Catalog) {
        self.set_mat_layer_enabled(MatLayerPosition::Middle, enabled, catalog);
    }

    pub fn set_bottom_mat_enabled(&mut self, enabled: bool, catalog: &Catalog) {
        self.set_mat_layer_enabled(MatLayerPosition::Bottom, enabled, catalog);
    }

    pub fn select_layer_mat(&mut self, position: MatLayerPosition, mat: Option<MatId>) {
        self.layer_mut(position).mat = mat;
    }

    pub fn select_middle_mat(&mut self, mat: Option<MatId>) {
        self.select_layer_mat(MatLayerPosition::Middle, mat);
    }

    pub fn select_bottom_mat(&mut self, mat: Option<MatId>) {
        self.select_layer_mat(MatLayerPosition::Bottom, mat);
    }

    pub fn set_reveal(&mut self, position: MatLayerPosition, reveal: Option<RevealSizeId>) {
        self.layer_mut(position).reveal = reveal;
    }

    pub fn select_glass(&mut self, glass: Option<GlassId>) {
        self.selection.glass = glass;
    }

    /// Toggle float mounting. The glass spacer flag is left untouched.
    pub fn set_float_mount(&mut self, enabled: bool) {
        self.selection.float_mount = enabled;
    }

    pub fn set_glass_spacer(&mut self, enabled: bool) {
        self.selection.glass_spacer = enabled;
    }

    #[must_use]
    pub fn breakdown(&self, catalog: &Catalog) -> PriceBreakdown {
        pricing::calculate(&self.selection, catalog)
    }

    #[must_use]
    pub fn price(&self, catalog: &Catalog) -> Price {
        self.breakdown(catalog).total()
    }

    /// Register a new recommendation request.
    ///
    /// Any result for an earlier ticket will be ignored from now on.
    pub const fn begin_recommendation(&mut self) -> RecommendationTicket {
        self.latest_ticket += 1;
        RecommendationTicket(self.latest_ticket)
    }

    /// Apply the top-ranked frame, mat, and glass from a recommendation.
    ///
    /// Only the result for the most recently issued ticket is applied.
    /// Empty categories leave the current choice in place.
    pub fn apply_recommendation(
        &mut self,
        ticket: RecommendationTicket,
        recommendations: &RecommendationSet,
    ) -> ApplyOutcome {
        if ticket.0 != self.latest_ticket {
            return ApplyOutcome::Stale;
        }

        let mut changed = false;
        if let Some(top) = recommendations.frames.first() {
            self.selection.frame = Some(FrameId::new(&top.id));
            changed = true;
        }
        if let Some(top) = recommendations.mats.first() {
            self.selection.top_mat = Some(MatId::new(&top.id));
            changed = true;
        }
        if let Some(top) = recommendations.glass.first() {
            self.selection.glass = Some(GlassId::new(&top.id));
            changed = true;
        }

        if changed {
            ApplyOutcome::Applied
        } else {
            ApplyOutcome::NothingToApply
        }
    }

    const fn layer_mut(&mut self, position: MatLayerPosition) -> &mut MatLayer {
        match position {
            MatLayerPosition::Middle => &mut self.selection.middle_mat,
            MatLayerPosition::Bottom => &mut self.selection.bottom_mat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;
    use crate::recommendation::Recommendation;

    fn recommendation(id: &str) -> Recommendation {
        Recommendation {
            id: id.to_owned(),
            name: id.to_owned(),
            score: 9,
            reason: "fits".to_owned(),
        }
    }

    #[test]
    fn test_lenient_dimensions() {
        assert_eq!(parse_dimension_lenient("16"), Decimal::from(16));
        assert_eq!(parse_dimension_lenient(" 16.5 "), Decimal::new(165, 1));
        assert_eq!(parse_dimension_lenient("abc"), Decimal::ZERO);
        assert_eq!(parse_dimension_lenient(""), Decimal::ZERO);
        assert_eq!(parse_dimension_lenient("-4"), Decimal::ZERO);
        assert_eq!(
            parse_dimension_lenient("99999999"),
            Decimal::from(MAX_DIMENSION_INCHES)
        );
    }

    #[test]
    fn test_selection_deserializes_loose_dimensions() {
        let json = r#"{"width": "twelve", "height": 20.5, "useFloatMount": true}"#;
        let selection: DesignSelection = serde_json::from_str(json).expect("deserialize");
        assert_eq!(selection.width, Decimal::ZERO);
        assert_eq!(selection.height, Decimal::new(205, 1));
        assert!(selection.float_mount);
        assert!(selection.frame.is_none());
    }

    #[test]
    fn test_disabling_middle_mat_keeps_bottom_mat() {
        let catalog = fixtures::catalog();
        let mut state = DesignState::new();
        state.set_middle_mat_enabled(true, &catalog);
        state.select_middle_mat(Some(MatId::new("charcoal")));
        state.set_bottom_mat_enabled(true, &catalog);
        state.select_bottom_mat(Some(MatId::new("ivory")));

        state.set_middle_mat_enabled(false, &catalog);

        let selection = state.selection();
        assert!(!selection.middle_mat.enabled);
        assert!(selection.bottom_mat.enabled);
        assert_eq!(selection.bottom_mat.mat, Some(MatId::new("ivory")));
        assert_eq!(selection.middle_mat.mat, Some(MatId::new("charcoal")));
    }

    #[test]
    fn test_float_mount_off_keeps_spacer_flag() {
        let mut state = DesignState::new();
        state.set_float_mount(true);
        state.set_glass_spacer(true);
        state.set_float_mount(false);
        assert!(state.selection().glass_spacer);
        assert!(!state.selection().float_mount);
    }

    #[test]
    fn test_reveal_defaults_to_smallest_on_first_enable() {
        let catalog = fixtures::catalog();
        let mut state = DesignState::new();
        state.set_middle_mat_enabled(true, &catalog);
        assert_eq!(
            state.selection().middle_mat.reveal,
            Some(RevealSizeId::new("eighth"))
        );

        state.set_reveal(MatLayerPosition::Middle, Some(RevealSizeId::new("half")));
        state.set_middle_mat_enabled(false, &catalog);
        state.set_middle_mat_enabled(true, &catalog);
        assert_eq!(
            state.selection().middle_mat.reveal,
            Some(RevealSizeId::new("half"))
        );
    }

    #[test]
    fn test_reveal_without_catalog_sizes_stays_unset() {
        let mut state = DesignState::new();
        state.set_bottom_mat_enabled(true, &Catalog::empty());
        assert!(state.selection().bottom_mat.enabled);
        assert!(state.selection().bottom_mat.reveal.is_none());
    }

    #[test]
    fn test_stacked_frame_choice_survives_toggle() {
        let mut state = DesignState::new();
        state.select_stacked_frame(Some(FrameId::new("gallery-black")));
        state.set_stacked_frame_enabled(true);
        state.set_stacked_frame_enabled(false);
        assert!(state.selection().stacked_frame.active().is_none());
        assert_eq!(
            state.selection().stacked_frame.frame,
            Some(FrameId::new("gallery-black"))
        );
    }

    #[test]
    fn test_latest_recommendation_wins() {
        let mut state = DesignState::new();
        let first = state.begin_recommendation();
        let second = state.begin_recommendation();

        let newer = RecommendationSet {
            frames: vec![recommendation("gallery-black")],
            ..RecommendationSet::default()
        };
        let older = RecommendationSet {
            frames: vec![recommendation("oak-classic")],
            ..RecommendationSet::default()
        };

        assert_eq!(
            state.apply_recommendation(second, &newer),
            ApplyOutcome::Applied
        );
        assert_eq!(state.apply_recommendation(first, &older), ApplyOutcome::Stale);
        assert_eq!(
            state.selection().frame,
            Some(FrameId::new("gallery-black"))
        );
    }

    #[test]
    fn test_empty_recommendation_leaves_selection_untouched() {
        let mut state = DesignState::new();
        state.select_frame(Some(FrameId::new("oak-classic")));
        state.select_top_mat(Some(MatId::new("ivory")));
        let before = state.selection().clone();

        let ticket = state.begin_recommendation();
        let outcome = state.apply_recommendation(ticket, &RecommendationSet::default());

        assert_eq!(outcome, ApplyOutcome::NothingToApply);
        assert_eq!(state.selection(), &before);
    }

    #[test]
    fn test_price_tracks_every_toggle() {
        let catalog = fixtures::catalog();
        let mut state = DesignState::new();
        state.set_dimensions(Decimal::from(16), Decimal::from(20));
        state.select_frame(Some(FrameId::new("oak-classic")));
        state.select_top_mat(Some(MatId::new("ivory")));
        state.select_glass(Some(GlassId::new("conservation")));
        assert_eq!(state.price(&catalog).cents, 21300);

        state.set_float_mount(true);
        assert_eq!(state.price(&catalog).cents, 26300);
        state.set_glass_spacer(true);
        assert_eq!(state.price(&catalog).cents, 29800);
        state.set_float_mount(false);
        assert_eq!(state.price(&catalog).cents, 21300);
    }
}
