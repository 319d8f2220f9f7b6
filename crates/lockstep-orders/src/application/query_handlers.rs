//! Query handlers for the Order context.
//!
//! Reads are served from the cache. An order that is not resident is
//! rebuilt from the log first.

use lockstep_core::aggregate::AggregateState;
use lockstep_core::error::DomainError;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::application::command_handlers::OrderCache;
use crate::domain::aggregates::{LineItem, Order, OrderStatus};

/// Read-only view of an order aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    /// The order identifier.
    pub order_id: Uuid,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Line items in insertion order.
    pub items: Vec<LineItem>,
    /// The last total set on the order.
    pub total: Decimal,
    /// Whether items changed since the total was last set.
    pub needs_recalculation: bool,
    /// Current version (event count).
    pub version: i64,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.aggregate_id(),
            status: order.status(),
            items: order.items().to_vec(),
            total: order.total(),
            needs_recalculation: order.needs_recalculation(),
            version: order.version(),
        }
    }
}

/// Retrieves an order by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the order was never created,
/// `DomainError::AggregateQuarantined` if it is halted, and the log or
/// replay error if it cannot be rebuilt.
pub async fn get_order_by_id(order_id: Uuid, cache: &OrderCache) -> Result<OrderView, DomainError> {
    let order = cache.load(order_id).await?;
    Ok(OrderView::from(order.as_ref()))
}
