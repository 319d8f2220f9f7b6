//! Domain events for the Order context.

use lockstep_core::clock::Clock;
use lockstep_core::error::DomainError;
use lockstep_core::event::{DomainEvent, EventMetadata};
use lockstep_core::event_log::StoredEvent;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregates::{LineItem, OrderStatus};

/// Event type identifier for [`OrderCreated`].
pub const ORDER_CREATED_EVENT_TYPE: &str = "order.created";
/// Event type identifier for [`ItemAdded`].
pub const ITEM_ADDED_EVENT_TYPE: &str = "order.item_added";
/// Event type identifier for [`ItemRemoved`].
pub const ITEM_REMOVED_EVENT_TYPE: &str = "order.item_removed";
/// Event type identifier for [`TotalUpdated`].
pub const TOTAL_UPDATED_EVENT_TYPE: &str = "order.total_updated";
/// Event type identifier for [`StatusChanged`].
pub const STATUS_CHANGED_EVENT_TYPE: &str = "order.status_changed";
/// Event type identifier for [`OrderCancelled`].
pub const ORDER_CANCELLED_EVENT_TYPE: &str = "order.cancelled";

const KNOWN_EVENT_TYPES: [&str; 6] = [
    ORDER_CREATED_EVENT_TYPE,
    ITEM_ADDED_EVENT_TYPE,
    ITEM_REMOVED_EVENT_TYPE,
    TOTAL_UPDATED_EVENT_TYPE,
    STATUS_CHANGED_EVENT_TYPE,
    ORDER_CANCELLED_EVENT_TYPE,
];

/// Emitted when an order is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    /// The order identifier.
    pub order_id: Uuid,
}

/// Emitted when a line item is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    /// The order identifier.
    pub order_id: Uuid,
    /// The added line item.
    pub item: LineItem,
}

/// Emitted when a line item is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    /// The order identifier.
    pub order_id: Uuid,
    /// The removed item's identifier.
    pub item_id: Uuid,
}

/// Emitted when the order total is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalUpdated {
    /// The order identifier.
    pub order_id: Uuid,
    /// The new total.
    pub total: Decimal,
}

/// Emitted when the order moves to another lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    /// The order identifier.
    pub order_id: Uuid,
    /// The new status.
    pub status: OrderStatus,
}

/// Emitted when an order is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    /// The order identifier.
    pub order_id: Uuid,
    /// Why the order was cancelled.
    pub reason: String,
}

/// Event payload variants for the Order context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderEventKind {
    /// The order has been opened.
    OrderCreated(OrderCreated),
    /// A line item has been added.
    ItemAdded(ItemAdded),
    /// A line item has been removed.
    ItemRemoved(ItemRemoved),
    /// The total has been set.
    TotalUpdated(TotalUpdated),
    /// The lifecycle status has changed.
    StatusChanged(StatusChanged),
    /// The order has been cancelled.
    OrderCancelled(OrderCancelled),
    /// A stored event whose type this build does not know. It is carried
    /// through untouched and applies as a no-op.
    #[serde(skip)]
    Unrecognized {
        /// The stored type name.
        event_type: String,
        /// The stored payload.
        payload: serde_json::Value,
    },
}

impl OrderEventKind {
    fn event_type(&self) -> &str {
        match self {
            Self::OrderCreated(_) => ORDER_CREATED_EVENT_TYPE,
            Self::ItemAdded(_) => ITEM_ADDED_EVENT_TYPE,
            Self::ItemRemoved(_) => ITEM_REMOVED_EVENT_TYPE,
            Self::TotalUpdated(_) => TOTAL_UPDATED_EVENT_TYPE,
            Self::StatusChanged(_) => STATUS_CHANGED_EVENT_TYPE,
            Self::OrderCancelled(_) => ORDER_CANCELLED_EVENT_TYPE,
            Self::Unrecognized { event_type, .. } => event_type,
        }
    }
}

/// Domain event envelope for the Order context.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: OrderEventKind,
}

impl OrderEvent {
    /// Builds the event that moves `order_id` to `version`.
    pub fn new(
        order_id: Uuid,
        version: i64,
        kind: OrderEventKind,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: order_id,
                version,
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        }
    }
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        match &self.kind {
            OrderEventKind::Unrecognized { payload, .. } => payload.clone(),
            // Serialization of derived Serialize types to Value is infallible.
            kind => serde_json::to_value(kind).expect("OrderEventKind serialization is infallible"),
        }
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        let kind = if KNOWN_EVENT_TYPES.contains(&stored.event_type.as_str()) {
            let kind: OrderEventKind =
                serde_json::from_value(stored.payload.clone()).map_err(|e| {
                    DomainError::Deserialization(format!(
                        "{} event {} at version {}: {e}",
                        stored.event_type, stored.event_id, stored.version
                    ))
                })?;
            if kind.event_type() != stored.event_type {
                return Err(DomainError::Deserialization(format!(
                    "event {} is typed {} but carries a {} payload",
                    stored.event_id,
                    stored.event_type,
                    kind.event_type()
                )));
            }
            kind
        } else {
            OrderEventKind::Unrecognized {
                event_type: stored.event_type.clone(),
                payload: stored.payload.clone(),
            }
        };
        Ok(Self {
            metadata: EventMetadata::from_stored(stored),
            kind,
        })
    }
}
