//! Commands for the Order context.

use lockstep_core::command::Command;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::aggregates::OrderStatus;

/// Command to open a new order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The order identifier.
    pub order_id: Uuid,
}

/// Command to add a line item.
#[derive(Debug, Clone)]
pub struct AddItem {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The order identifier.
    pub order_id: Uuid,
    /// The item identifier.
    pub item_id: Uuid,
    /// Display name of the item.
    pub name: String,
    /// Unit price of the item.
    pub price: Decimal,
}

/// Command to remove a line item.
#[derive(Debug, Clone)]
pub struct RemoveItem {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The order identifier.
    pub order_id: Uuid,
    /// The item identifier.
    pub item_id: Uuid,
}

/// Command to set the order total to an explicit amount.
#[derive(Debug, Clone)]
pub struct UpdateTotal {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The order identifier.
    pub order_id: Uuid,
    /// The new total.
    pub total: Decimal,
}

/// Command to set the order total to the sum of its items.
#[derive(Debug, Clone)]
pub struct RecalculateTotal {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The order identifier.
    pub order_id: Uuid,
}

/// Command to move an order to a terminal status.
#[derive(Debug, Clone)]
pub struct SetStatus {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The order identifier.
    pub order_id: Uuid,
    /// The target status.
    pub status: OrderStatus,
}

/// Command to cancel an order.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The order identifier.
    pub order_id: Uuid,
    /// Why the order is cancelled.
    pub reason: String,
}

macro_rules! impl_command {
    ($($command:ty => $name:literal),+ $(,)?) => {
        $(
            impl Command for $command {
                fn command_type(&self) -> &'static str {
                    $name
                }

                fn correlation_id(&self) -> Uuid {
                    self.correlation_id
                }

                fn aggregate_id(&self) -> Uuid {
                    self.order_id
                }
            }
        )+
    };
}

impl_command! {
    CreateOrder => "order.create",
    AddItem => "order.add_item",
    RemoveItem => "order.remove_item",
    UpdateTotal => "order.update_total",
    RecalculateTotal => "order.recalculate_total",
    SetStatus => "order.set_status",
    CancelOrder => "order.cancel",
}
