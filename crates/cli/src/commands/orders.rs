//! Order lookup commands for shop staff.
//!
//! # Usage
//!
//! ```bash
//! # Most recent orders
//! fs-cli orders list
//!
//! # Orders in one status
//! fs-cli orders list --status ready_for_pickup --limit 20
//!
//! # Stage history of one order
//! fs-cli orders history 42
//! ```

use tracing::info;

use frameshop_core::{OrderId, OrderStatus};
use frameshop_storefront::db::{OrderFilter, OrderRepository};

use super::{CliError, connect};

/// Parse a status argument such as `in_progress`.
///
/// # Errors
///
/// Returns `CliError::Argument` listing the valid statuses.
pub fn parse_status(value: &str) -> Result<OrderStatus, CliError> {
    value.parse().map_err(|_| {
        let valid: Vec<&str> = OrderStatus::ALL.iter().map(|s| s.as_str()).collect();
        CliError::Argument(format!(
            "unknown status '{value}', expected one of: {}",
            valid.join(", ")
        ))
    })
}

/// Log recent orders, newest first.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn list(status: Option<&str>, limit: i64) -> Result<(), CliError> {
    let status = status.map(parse_status).transpose()?;
    let pool = connect().await?;

    let orders = OrderRepository::new(&pool)
        .list(OrderFilter { status, limit })
        .await?;

    info!("{} orders", orders.len());
    for order in &orders {
        info!(
            "  #{:<6} {:<18} {:>10}  {} <{}>  {}",
            order.id.as_i32(),
            order.status.as_str(),
            order.total.display(),
            order.customer.name,
            order.customer.email,
            order.created_at.format("%Y-%m-%d %H:%M"),
        );
    }

    Ok(())
}

/// Log the stage history of one order.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn history(id: i32) -> Result<(), CliError> {
    let pool = connect().await?;

    let entries = OrderRepository::new(&pool).history(OrderId::new(id)).await?;
    if entries.is_empty() {
        info!("Order #{id} has no history (does it exist?)");
        return Ok(());
    }

    info!("Order #{id}");
    for entry in &entries {
        let from = entry.from_status.map_or("-", OrderStatus::as_str);
        info!(
            "  {}  {} -> {}  {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            from,
            entry.to_status,
            entry.note.as_deref().unwrap_or(""),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(
            parse_status("ready_for_pickup").expect("valid"),
            OrderStatus::ReadyForPickup
        );
        let err = parse_status("shipped").expect_err("invalid");
        assert!(err.to_string().contains("awaiting_payment"));
    }
}
