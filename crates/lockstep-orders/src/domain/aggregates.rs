//! Aggregate state for the Order context.

use lockstep_core::aggregate::AggregateState;
use lockstep_core::clock::Clock;
use lockstep_core::outcome::RuleViolation;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{
    ItemAdded, ItemRemoved, OrderCancelled, OrderCreated, OrderEvent, OrderEventKind,
    StatusChanged, TotalUpdated,
};

/// Lifecycle of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Referenced but never created.
    #[default]
    Uninitialized,
    /// Accepting changes.
    Open,
    /// Completed; terminal.
    Closed,
    /// Abandoned; terminal.
    Cancelled,
}

impl OrderStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A priced line on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Item identifier, unique within the order.
    pub item_id: Uuid,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Decimal,
}

/// Materialized state of one order.
///
/// Values are never mutated in place: each event produces a successor via
/// [`AggregateState::apply`]. The decision methods below read a snapshot and
/// return the candidate event for the next version, or the rule it breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: Uuid,
    version: i64,
    status: OrderStatus,
    items: Vec<LineItem>,
    total: Decimal,
    needs_recalculation: bool,
}

impl Order {
    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// The last total set on the order.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Whether items changed since the total was last set.
    #[must_use]
    pub fn needs_recalculation(&self) -> bool {
        self.needs_recalculation
    }

    /// Sum of the current line item prices.
    #[must_use]
    pub fn items_sum(&self) -> Decimal {
        self.items.iter().map(|item| item.price).sum()
    }

    fn next_event(&self, kind: OrderEventKind, correlation_id: Uuid, clock: &dyn Clock) -> OrderEvent {
        OrderEvent::new(self.id, self.version + 1, kind, correlation_id, clock)
    }

    fn require_open(&self, action: &str) -> Result<(), RuleViolation> {
        if self.status == OrderStatus::Open {
            Ok(())
        } else {
            Err(RuleViolation::new(format!(
                "cannot {action} order {} in status {}",
                self.id, self.status
            )))
        }
    }

    /// Opens the order, producing an `OrderCreated` event.
    ///
    /// # Errors
    ///
    /// Returns a `RuleViolation` if the order already exists.
    pub fn create(&self, correlation_id: Uuid, clock: &dyn Clock) -> Result<OrderEvent, RuleViolation> {
        if self.status != OrderStatus::Uninitialized {
            return Err(RuleViolation::new(format!(
                "order {} already exists in status {}",
                self.id, self.status
            )));
        }
        Ok(self.next_event(
            OrderEventKind::OrderCreated(OrderCreated { order_id: self.id }),
            correlation_id,
            clock,
        ))
    }

    /// Adds a line item, producing an `ItemAdded` event.
    ///
    /// # Errors
    ///
    /// Returns a `RuleViolation` if the order is not open, the price is
    /// negative, or an item with the same id is already present.
    pub fn add_item(
        &self,
        item: LineItem,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<OrderEvent, RuleViolation> {
        self.require_open("add an item to")?;
        if item.price < Decimal::ZERO {
            return Err(RuleViolation::new(format!(
                "item {} has negative price {}",
                item.item_id, item.price
            )));
        }
        if self.items.iter().any(|existing| existing.item_id == item.item_id) {
            return Err(RuleViolation::new(format!(
                "item {} is already on order {}",
                item.item_id, self.id
            )));
        }
        Ok(self.next_event(
            OrderEventKind::ItemAdded(ItemAdded {
                order_id: self.id,
                item,
            }),
            correlation_id,
            clock,
        ))
    }

    /// Removes a line item, producing an `ItemRemoved` event.
    ///
    /// # Errors
    ///
    /// Returns a `RuleViolation` if the order is not open or the item is not
    /// on it.
    pub fn remove_item(
        &self,
        item_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<OrderEvent, RuleViolation> {
        self.require_open("remove an item from")?;
        if !self.items.iter().any(|item| item.item_id == item_id) {
            return Err(RuleViolation::new(format!(
                "item {item_id} not found on order {}",
                self.id
            )));
        }
        Ok(self.next_event(
            OrderEventKind::ItemRemoved(ItemRemoved {
                order_id: self.id,
                item_id,
            }),
            correlation_id,
            clock,
        ))
    }

    /// Sets the total to `total`, producing a `TotalUpdated` event.
    ///
    /// # Errors
    ///
    /// Returns a `RuleViolation` if the order is not open or `total` is
    /// negative.
    pub fn update_total(
        &self,
        total: Decimal,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<OrderEvent, RuleViolation> {
        self.require_open("update the total of")?;
        if total < Decimal::ZERO {
            return Err(RuleViolation::new(format!("total {total} is negative")));
        }
        Ok(self.next_event(
            OrderEventKind::TotalUpdated(TotalUpdated {
                order_id: self.id,
                total,
            }),
            correlation_id,
            clock,
        ))
    }

    /// Sets the total to the sum of the snapshot's items.
    ///
    /// # Errors
    ///
    /// Returns a `RuleViolation` if the order is not open.
    pub fn recalculate_total(&self, correlation_id: Uuid, clock: &dyn Clock) -> Result<OrderEvent, RuleViolation> {
        self.update_total(self.items_sum(), correlation_id, clock)
    }

    /// Moves the order to a terminal status, producing a `StatusChanged`
    /// event.
    ///
    /// # Errors
    ///
    /// Returns a `RuleViolation` if the order is not open or `status` is not
    /// terminal.
    pub fn set_status(
        &self,
        status: OrderStatus,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<OrderEvent, RuleViolation> {
        self.require_open("change the status of")?;
        if !status.is_terminal() {
            return Err(RuleViolation::new(format!(
                "cannot move order {} from open to {status}",
                self.id
            )));
        }
        Ok(self.next_event(
            OrderEventKind::StatusChanged(StatusChanged {
                order_id: self.id,
                status,
            }),
            correlation_id,
            clock,
        ))
    }

    /// Cancels the order, producing an `OrderCancelled` event.
    ///
    /// # Errors
    ///
    /// Returns a `RuleViolation` if the order is not open.
    pub fn cancel(&self, reason: String, correlation_id: Uuid, clock: &dyn Clock) -> Result<OrderEvent, RuleViolation> {
        self.require_open("cancel")?;
        Ok(self.next_event(
            OrderEventKind::OrderCancelled(OrderCancelled {
                order_id: self.id,
                reason,
            }),
            correlation_id,
            clock,
        ))
    }
}

impl AggregateState for Order {
    type Event = OrderEvent;

    fn initial(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            status: OrderStatus::Uninitialized,
            items: Vec::new(),
            total: Decimal::ZERO,
            needs_recalculation: false,
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&self, event: &OrderEvent) -> Self {
        let mut next = self.clone();
        match &event.kind {
            OrderEventKind::OrderCreated(_) => {
                next.status = OrderStatus::Open;
            }
            OrderEventKind::ItemAdded(payload) => {
                next.items.push(payload.item.clone());
                next.needs_recalculation = true;
            }
            OrderEventKind::ItemRemoved(payload) => {
                next.items.retain(|item| item.item_id != payload.item_id);
                next.needs_recalculation = true;
            }
            OrderEventKind::TotalUpdated(payload) => {
                next.total = payload.total;
                next.needs_recalculation = false;
            }
            OrderEventKind::StatusChanged(payload) => {
                next.status = payload.status;
            }
            OrderEventKind::OrderCancelled(_) => {
                next.status = OrderStatus::Cancelled;
            }
            OrderEventKind::Unrecognized { .. } => {}
        }
        next.version = event.metadata.version;
        next
    }
}
