//! `OrderService`: the entry point callers hold on to.
//!
//! Bundles the clock and the order cache so transports do not have to
//! thread them through every handler call.

use std::sync::Arc;

use lockstep_core::clock::Clock;
use lockstep_core::error::DomainError;
use lockstep_core::event_log::EventLog;
use tracing::{info, instrument};
use uuid::Uuid;

use super::command_handlers::{self, OrderCache, OrderOutcome};
use super::query_handlers::{self, OrderView};
use crate::domain::commands::{
    AddItem, CancelOrder, CreateOrder, RecalculateTotal, RemoveItem, SetStatus, UpdateTotal,
};

/// Order commands and queries over one cache and one clock.
#[derive(Clone)]
pub struct OrderService {
    clock: Arc<dyn Clock>,
    cache: Arc<OrderCache>,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl OrderService {
    /// Creates a service with an empty cache writing through to `log`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, log: Arc<dyn EventLog>) -> Self {
        Self {
            clock,
            cache: Arc::new(OrderCache::new(log)),
        }
    }

    /// The underlying order cache.
    #[must_use]
    pub fn cache(&self) -> &OrderCache {
        &self.cache
    }

    /// See [`command_handlers::handle_create_order`].
    ///
    /// # Errors
    ///
    /// Propagates the handler's `DomainError`.
    pub async fn create_order(&self, command: &CreateOrder) -> Result<OrderOutcome, DomainError> {
        command_handlers::handle_create_order(command, self.clock.as_ref(), &self.cache).await
    }

    /// See [`command_handlers::handle_add_item`].
    ///
    /// # Errors
    ///
    /// Propagates the handler's `DomainError`.
    pub async fn add_item(&self, command: &AddItem) -> Result<OrderOutcome, DomainError> {
        command_handlers::handle_add_item(command, self.clock.as_ref(), &self.cache).await
    }

    /// See [`command_handlers::handle_remove_item`].
    ///
    /// # Errors
    ///
    /// Propagates the handler's `DomainError`.
    pub async fn remove_item(&self, command: &RemoveItem) -> Result<OrderOutcome, DomainError> {
        command_handlers::handle_remove_item(command, self.clock.as_ref(), &self.cache).await
    }

    /// See [`command_handlers::handle_update_total`].
    ///
    /// # Errors
    ///
    /// Propagates the handler's `DomainError`.
    pub async fn update_total(&self, command: &UpdateTotal) -> Result<OrderOutcome, DomainError> {
        command_handlers::handle_update_total(command, self.clock.as_ref(), &self.cache).await
    }

    /// See [`command_handlers::handle_recalculate_total`].
    ///
    /// # Errors
    ///
    /// Propagates the handler's `DomainError`.
    pub async fn recalculate_total(
        &self,
        command: &RecalculateTotal,
    ) -> Result<OrderOutcome, DomainError> {
        command_handlers::handle_recalculate_total(command, self.clock.as_ref(), &self.cache).await
    }

    /// See [`command_handlers::handle_set_status`].
    ///
    /// # Errors
    ///
    /// Propagates the handler's `DomainError`.
    pub async fn set_status(&self, command: &SetStatus) -> Result<OrderOutcome, DomainError> {
        command_handlers::handle_set_status(command, self.clock.as_ref(), &self.cache).await
    }

    /// See [`command_handlers::handle_cancel_order`].
    ///
    /// # Errors
    ///
    /// Propagates the handler's `DomainError`.
    pub async fn cancel_order(&self, command: &CancelOrder) -> Result<OrderOutcome, DomainError> {
        command_handlers::handle_cancel_order(command, self.clock.as_ref(), &self.cache).await
    }

    /// See [`query_handlers::get_order_by_id`].
    ///
    /// # Errors
    ///
    /// Propagates the query's `DomainError`.
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderView, DomainError> {
        query_handlers::get_order_by_id(order_id, &self.cache).await
    }

    /// Makes an order resident, rebuilding it from the log on first use.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` for an empty stream and
    /// the replay or log error if the stream cannot be rebuilt.
    #[instrument(skip(self))]
    pub async fn load(&self, order_id: Uuid) -> Result<OrderView, DomainError> {
        let order = self.cache.load(order_id).await?;
        Ok(OrderView::from(order.as_ref()))
    }

    /// Rebuilds a quarantined order from the log and lifts the quarantine.
    ///
    /// # Errors
    ///
    /// Same as [`OrderService::load`]; the order stays quarantined on error.
    #[instrument(skip(self))]
    pub async fn recover(&self, order_id: Uuid) -> Result<OrderView, DomainError> {
        let order = self.cache.recover(order_id).await?;
        info!(%order_id, "order recovered from log");
        Ok(OrderView::from(order.as_ref()))
    }
}
