//! Order line item assembly.
//!
//! A [`LineItem`] freezes a design and its price at checkout. The price is
//! always recomputed here from the catalog; a total sent by the client is
//! never trusted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, MatOption};
use crate::design::{DesignSelection, MatLayer};
use crate::pricing::{self, PriceBreakdown};
use crate::types::{Email, EmailError, Price};

/// Why a design cannot be committed to an order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("choose a frame before checking out")]
    MissingFrame,

    #[error("choose a mat before checking out")]
    MissingTopMat,

    #[error("choose glass before checking out")]
    MissingGlass,

    #[error("{kind} '{id}' is no longer available")]
    UnknownOption { kind: &'static str, id: String },

    #[error("artwork width and height must be greater than zero")]
    InvalidDimensions,
}

/// Code and display name of a chosen catalog entry, as of checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSnapshot {
    pub code: String,
    pub name: String,
}

/// An extra mat layer as of checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatLayerSnapshot {
    pub mat: OptionSnapshot,
    /// Reveal label (e.g. `1/8"`), if one was chosen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal: Option<String>,
}

/// Immutable record of one framed piece.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub width: Decimal,
    pub height: Decimal,
    pub frame: OptionSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacked_frame: Option<OptionSnapshot>,
    pub top_mat: OptionSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_mat: Option<MatLayerSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom_mat: Option<MatLayerSnapshot>,
    pub glass: OptionSnapshot,
    pub float_mount: bool,
    /// Only true when spacers were actually charged (float mount on).
    pub glass_spacer: bool,
    pub breakdown: PriceBreakdown,
    pub total: Price,
    /// The selection as submitted, so the design can be reopened.
    pub selection: DesignSelection,
}

impl LineItem {
    /// One-line summary for emails and the order list.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} x {} in, {} frame",
            self.width.normalize(),
            self.height.normalize(),
            self.frame.name
        );
        if let Some(stacked) = &self.stacked_frame {
            summary.push_str(&format!(" stacked with {}", stacked.name));
        }
        summary.push_str(&format!(", {} mat", self.top_mat.name));
        let layers = [&self.middle_mat, &self.bottom_mat]
            .into_iter()
            .flatten()
            .count();
        match layers {
            0 => {}
            1 => summary.push_str(" (+1 layer)"),
            n => summary.push_str(&format!(" (+{n} layers)")),
        }
        summary.push_str(&format!(", {} glass", self.glass.name));
        if self.float_mount {
            summary.push_str(", float mounted");
        }
        summary
    }
}

/// Freeze a selection into a line item, recomputing its price.
pub fn assemble(selection: &DesignSelection, catalog: &Catalog) -> Result<LineItem, AssemblyError> {
    let frame_id = selection.frame.as_ref().ok_or(AssemblyError::MissingFrame)?;
    let top_mat_id = selection.top_mat.as_ref().ok_or(AssemblyError::MissingTopMat)?;
    let glass_id = selection.glass.as_ref().ok_or(AssemblyError::MissingGlass)?;

    if selection.width <= Decimal::ZERO || selection.height <= Decimal::ZERO {
        return Err(AssemblyError::InvalidDimensions);
    }

    let frame = catalog
        .frame(frame_id)
        .ok_or_else(|| unknown("frame", frame_id))?;
    let top_mat = catalog
        .mat(top_mat_id)
        .ok_or_else(|| unknown("mat", top_mat_id))?;
    let glass = catalog
        .glass(glass_id)
        .ok_or_else(|| unknown("glass", glass_id))?;

    let stacked_frame = selection
        .stacked_frame
        .active()
        .map(|id| {
            catalog
                .frame(id)
                .map(|f| snapshot(&f.id, &f.name))
                .ok_or_else(|| unknown("frame", id))
        })
        .transpose()?;

    let breakdown = pricing::calculate(selection, catalog);

    Ok(LineItem {
        width: selection.width,
        height: selection.height,
        frame: snapshot(&frame.id, &frame.name),
        stacked_frame,
        top_mat: mat_snapshot(top_mat),
        middle_mat: layer_snapshot(&selection.middle_mat, catalog)?,
        bottom_mat: layer_snapshot(&selection.bottom_mat, catalog)?,
        glass: snapshot(&glass.id, &glass.name),
        float_mount: selection.float_mount,
        glass_spacer: selection.float_mount && selection.glass_spacer,
        total: breakdown.total(),
        breakdown,
        selection: selection.clone(),
    })
}

fn unknown(kind: &'static str, id: impl ToString) -> AssemblyError {
    AssemblyError::UnknownOption {
        kind,
        id: id.to_string(),
    }
}

fn snapshot(code: impl ToString, name: &str) -> OptionSnapshot {
    OptionSnapshot {
        code: code.to_string(),
        name: name.to_owned(),
    }
}

fn mat_snapshot(mat: &MatOption) -> OptionSnapshot {
    snapshot(&mat.id, &mat.name)
}

/// Enabled layers with a mat chosen are recorded; others are dropped.
fn layer_snapshot(
    layer: &MatLayer,
    catalog: &Catalog,
) -> Result<Option<MatLayerSnapshot>, AssemblyError> {
    let Some(mat_id) = layer.active_mat() else {
        return Ok(None);
    };
    let mat = catalog.mat(mat_id).ok_or_else(|| unknown("mat", mat_id))?;
    let reveal = layer
        .reveal
        .as_ref()
        .map(|id| {
            catalog
                .reveal_size(id)
                .map(|r| r.label.clone())
                .ok_or_else(|| unknown("reveal size", id))
        })
        .transpose()?;

    Ok(Some(MatLayerSnapshot {
        mat: mat_snapshot(mat),
        reveal,
    }))
}

/// Why customer contact details were rejected.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ContactError {
    #[error("name is required")]
    MissingName,

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("phone number must have between 7 and 15 digits")]
    InvalidPhone,
}

/// Contact details as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Contact details after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
}

impl CustomerContact {
    /// Validate and normalise. A blank phone number counts as none.
    pub fn validate(&self) -> Result<Customer, ContactError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ContactError::MissingName);
        }
        let email = Email::parse(&self.email)?;

        let phone = match self.phone.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(phone) => {
                let digits = phone.chars().filter(char::is_ascii_digit).count();
                let allowed = phone
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | '.' | ' '));
                if !allowed || !(7..=15).contains(&digits) {
                    return Err(ContactError::InvalidPhone);
                }
                Some(phone.to_owned())
            }
        };

        Ok(Customer {
            name: name.to_owned(),
            email,
            phone,
        })
    }
}

/// Body of a checkout submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub selection: DesignSelection,
    pub customer: CustomerContact,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;
    use crate::design::StackedFrame;
    use crate::types::{FrameId, GlassId, MatId, RevealSizeId};

    fn complete() -> DesignSelection {
        DesignSelection {
            width: Decimal::from(16),
            height: Decimal::from(20),
            frame: Some(FrameId::new("oak-classic")),
            top_mat: Some(MatId::new("ivory")),
            glass: Some(GlassId::new("conservation")),
            ..DesignSelection::default()
        }
    }

    #[test]
    fn test_assemble_recomputes_price() {
        let item = assemble(&complete(), &fixtures::catalog()).expect("assemble");
        assert_eq!(item.total.cents, 21300);
        assert_eq!(item.breakdown.frame, 10800);
        assert_eq!(item.frame.name, "Classic Oak");
        assert_eq!(item.top_mat.code, "ivory");
        assert!(item.middle_mat.is_none());
    }

    #[test]
    fn test_mandatory_fields() {
        let catalog = fixtures::catalog();
        let cases = [
            (
                DesignSelection {
                    frame: None,
                    ..complete()
                },
                AssemblyError::MissingFrame,
            ),
            (
                DesignSelection {
                    top_mat: None,
                    ..complete()
                },
                AssemblyError::MissingTopMat,
            ),
            (
                DesignSelection {
                    glass: None,
                    ..complete()
                },
                AssemblyError::MissingGlass,
            ),
        ];
        for (selection, expected) in cases {
            assert_eq!(assemble(&selection, &catalog), Err(expected));
        }
    }

    #[test]
    fn test_zero_dimensions_rejected_at_commit() {
        let selection = DesignSelection {
            width: Decimal::ZERO,
            ..complete()
        };
        assert_eq!(
            assemble(&selection, &fixtures::catalog()),
            Err(AssemblyError::InvalidDimensions)
        );
    }

    #[test]
    fn test_unknown_options_rejected() {
        let selection = DesignSelection {
            glass: Some(GlassId::new("acrylic")),
            ..complete()
        };
        assert_eq!(
            assemble(&selection, &fixtures::catalog()),
            Err(AssemblyError::UnknownOption {
                kind: "glass",
                id: "acrylic".to_owned(),
            })
        );

        let selection = DesignSelection {
            stacked_frame: StackedFrame {
                enabled: true,
                frame: Some(FrameId::new("walnut")),
            },
            ..complete()
        };
        assert!(matches!(
            assemble(&selection, &fixtures::catalog()),
            Err(AssemblyError::UnknownOption { kind: "frame", .. })
        ));
    }

    #[test]
    fn test_optional_add_ons_snapshot() {
        let selection = DesignSelection {
            middle_mat: MatLayer {
                enabled: true,
                mat: Some(MatId::new("charcoal")),
                reveal: Some(RevealSizeId::new("quarter")),
            },
            bottom_mat: MatLayer {
                enabled: false,
                mat: Some(MatId::new("ivory")),
                reveal: None,
            },
            glass_spacer: true,
            ..complete()
        };
        let item = assemble(&selection, &fixtures::catalog()).expect("assemble");
        let middle = item.middle_mat.as_ref().expect("middle layer");
        assert_eq!(middle.mat.name, "Charcoal");
        assert_eq!(middle.reveal.as_deref(), Some("1/4\""));
        assert!(item.bottom_mat.is_none());
        assert!(!item.glass_spacer, "spacer without float mount is not charged");
        assert_eq!(item.total.cents, 21300 + 3666 + 1500);
        assert!(item.summary().contains("(+1 layer)"));
    }

    #[test]
    fn test_summary() {
        let item = assemble(&complete(), &fixtures::catalog()).expect("assemble");
        assert_eq!(
            item.summary(),
            "16 x 20 in, Classic Oak frame, Ivory mat, Conservation Clear glass"
        );
    }

    #[test]
    fn test_contact_validation() {
        let contact = CustomerContact {
            name: "  Ada Lovelace ".to_owned(),
            email: "ada@example.com".to_owned(),
            phone: Some("(555) 123-4567".to_owned()),
        };
        let customer = contact.validate().expect("valid");
        assert_eq!(customer.name, "Ada Lovelace");
        assert_eq!(customer.email.as_str(), "ada@example.com");

        let blank_phone = CustomerContact {
            phone: Some("  ".to_owned()),
            ..contact.clone()
        };
        assert!(blank_phone.validate().expect("valid").phone.is_none());

        let bad_phone = CustomerContact {
            phone: Some("call me".to_owned()),
            ..contact.clone()
        };
        assert!(matches!(bad_phone.validate(), Err(ContactError::InvalidPhone)));

        let bad_email = CustomerContact {
            email: "ada".to_owned(),
            ..contact.clone()
        };
        assert!(matches!(bad_email.validate(), Err(ContactError::InvalidEmail(_))));

        let no_name = CustomerContact {
            name: String::new(),
            ..contact
        };
        assert!(matches!(no_name.validate(), Err(ContactError::MissingName)));
    }

    #[test]
    fn test_checkout_request_shape() {
        let json = r#"{
            "selection": {"width": "16", "height": 20, "frame": "oak-classic",
                          "topMat": "ivory", "glass": "conservation"},
            "customer": {"name": "Ada", "email": "ada@example.com"}
        }"#;
        let request: CheckoutRequest = serde_json::from_str(json).expect("deserialize");
        assert!(request.notes.is_none());
        let item = assemble(&request.selection, &fixtures::catalog()).expect("assemble");
        assert_eq!(item.total.cents, 21300);
    }
}
