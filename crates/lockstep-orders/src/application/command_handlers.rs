//! Command handlers for the Order context.
//!
//! Each handler runs one command through the order cache: the cache takes a
//! snapshot, the aggregate decides on the next event, the version gate picks
//! a single winner and the winner's event is appended and published.

use lockstep_core::aggregate::AggregateState;
use lockstep_core::cache::AggregateCache;
use lockstep_core::clock::Clock;
use lockstep_core::command::Command;
use lockstep_core::error::DomainError;
use lockstep_core::outcome::{CommandOutcome, RuleViolation};
use tracing::{info, instrument, warn};

use crate::domain::aggregates::{LineItem, Order};
use crate::domain::commands::{
    AddItem, CancelOrder, CreateOrder, RecalculateTotal, RemoveItem, SetStatus, UpdateTotal,
};
use crate::domain::events::OrderEvent;

/// The cache holding every resident order.
pub type OrderCache = AggregateCache<Order>;

/// Outcome of an order command that reached the cache.
pub type OrderOutcome = CommandOutcome<Order>;

async fn dispatch<C, F>(command: &C, cache: &OrderCache, decide: F) -> Result<OrderOutcome, DomainError>
where
    C: Command,
    F: FnOnce(&Order) -> Result<OrderEvent, RuleViolation> + Send,
{
    let outcome = cache.execute(command.aggregate_id(), decide).await?;
    match &outcome {
        CommandOutcome::Accepted { new_state } => {
            info!(
                command_type = command.command_type(),
                version = new_state.version(),
                "order command accepted"
            );
        }
        CommandOutcome::Conflict {
            attempted_version,
            current_version,
            ..
        } => {
            warn!(
                command_type = command.command_type(),
                attempted_version, current_version, "order command lost a version race"
            );
        }
        CommandOutcome::DomainRuleViolation { reason } => {
            warn!(command_type = command.command_type(), %reason, "order command refused");
        }
    }
    Ok(outcome)
}

/// Handles the `CreateOrder` command.
///
/// # Errors
///
/// Returns `DomainError` if the order cannot be loaded or the event cannot
/// be appended.
#[instrument(skip_all, fields(order_id = %command.order_id, correlation_id = %command.correlation_id))]
pub async fn handle_create_order(
    command: &CreateOrder,
    clock: &dyn Clock,
    cache: &OrderCache,
) -> Result<OrderOutcome, DomainError> {
    dispatch(command, cache, |order| order.create(command.correlation_id, clock)).await
}

/// Handles the `AddItem` command.
///
/// # Errors
///
/// Returns `DomainError` if the order cannot be loaded or the event cannot
/// be appended.
#[instrument(skip_all, fields(order_id = %command.order_id, correlation_id = %command.correlation_id))]
pub async fn handle_add_item(
    command: &AddItem,
    clock: &dyn Clock,
    cache: &OrderCache,
) -> Result<OrderOutcome, DomainError> {
    dispatch(command, cache, |order| {
        let item = LineItem {
            item_id: command.item_id,
            name: command.name.clone(),
            price: command.price,
        };
        order.add_item(item, command.correlation_id, clock)
    })
    .await
}

/// Handles the `RemoveItem` command.
///
/// # Errors
///
/// Returns `DomainError` if the order cannot be loaded or the event cannot
/// be appended.
#[instrument(skip_all, fields(order_id = %command.order_id, correlation_id = %command.correlation_id))]
pub async fn handle_remove_item(
    command: &RemoveItem,
    clock: &dyn Clock,
    cache: &OrderCache,
) -> Result<OrderOutcome, DomainError> {
    dispatch(command, cache, |order| {
        order.remove_item(command.item_id, command.correlation_id, clock)
    })
    .await
}

/// Handles the `UpdateTotal` command.
///
/// # Errors
///
/// Returns `DomainError` if the order cannot be loaded or the event cannot
/// be appended.
#[instrument(skip_all, fields(order_id = %command.order_id, correlation_id = %command.correlation_id))]
pub async fn handle_update_total(
    command: &UpdateTotal,
    clock: &dyn Clock,
    cache: &OrderCache,
) -> Result<OrderOutcome, DomainError> {
    dispatch(command, cache, |order| {
        order.update_total(command.total, command.correlation_id, clock)
    })
    .await
}

/// Handles the `RecalculateTotal` command.
///
/// # Errors
///
/// Returns `DomainError` if the order cannot be loaded or the event cannot
/// be appended.
#[instrument(skip_all, fields(order_id = %command.order_id, correlation_id = %command.correlation_id))]
pub async fn handle_recalculate_total(
    command: &RecalculateTotal,
    clock: &dyn Clock,
    cache: &OrderCache,
) -> Result<OrderOutcome, DomainError> {
    dispatch(command, cache, |order| {
        order.recalculate_total(command.correlation_id, clock)
    })
    .await
}

/// Handles the `SetStatus` command.
///
/// # Errors
///
/// Returns `DomainError` if the order cannot be loaded or the event cannot
/// be appended.
#[instrument(skip_all, fields(order_id = %command.order_id, correlation_id = %command.correlation_id))]
pub async fn handle_set_status(
    command: &SetStatus,
    clock: &dyn Clock,
    cache: &OrderCache,
) -> Result<OrderOutcome, DomainError> {
    dispatch(command, cache, |order| {
        order.set_status(command.status, command.correlation_id, clock)
    })
    .await
}

/// Handles the `CancelOrder` command.
///
/// # Errors
///
/// Returns `DomainError` if the order cannot be loaded or the event cannot
/// be appended.
#[instrument(skip_all, fields(order_id = %command.order_id, correlation_id = %command.correlation_id))]
pub async fn handle_cancel_order(
    command: &CancelOrder,
    clock: &dyn Clock,
    cache: &OrderCache,
) -> Result<OrderOutcome, DomainError> {
    dispatch(command, cache, |order| {
        order.cancel(command.reason.clone(), command.correlation_id, clock)
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use lockstep_core::event_log::EventLog;
    use lockstep_core::replay;
    use lockstep_event_store::in_memory_event_log::InMemoryEventLog;
    use lockstep_test_support::{
        FailingEventLog, FixedClock, PausingEventLog, RecordingEventLog, SteppingClock,
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::*;
    use crate::domain::aggregates::OrderStatus;
    use crate::domain::events::{ORDER_CREATED_EVENT_TYPE, TOTAL_UPDATED_EVENT_TYPE};

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn create(order_id: Uuid) -> CreateOrder {
        CreateOrder {
            correlation_id: Uuid::new_v4(),
            order_id,
        }
    }

    fn add(order_id: Uuid, item_id: Uuid, name: &str, price: Decimal) -> AddItem {
        AddItem {
            correlation_id: Uuid::new_v4(),
            order_id,
            item_id,
            name: name.into(),
            price,
        }
    }

    fn update_total(order_id: Uuid, total: Decimal) -> UpdateTotal {
        UpdateTotal {
            correlation_id: Uuid::new_v4(),
            order_id,
            total,
        }
    }

    /// Creates an order with items A (100.00) and B (50.00), leaving it at
    /// version 3.
    async fn open_order_with_two_items(cache: &OrderCache, order_id: Uuid) -> (Uuid, Uuid) {
        let clock = clock();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        handle_create_order(&create(order_id), &clock, cache).await.unwrap();
        handle_add_item(&add(order_id, a, "A", dec!(100.00)), &clock, cache)
            .await
            .unwrap();
        handle_add_item(&add(order_id, b, "B", dec!(50.00)), &clock, cache)
            .await
            .unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn test_handle_create_order_appends_created_event() {
        // Arrange
        let log = Arc::new(RecordingEventLog::new());
        let cache = OrderCache::new(log.clone());
        let command = create(Uuid::new_v4());

        // Act
        let outcome = handle_create_order(&command, &clock(), &cache).await.unwrap();

        // Assert
        let order = outcome.accepted().unwrap();
        assert_eq!(order.status(), OrderStatus::Open);
        assert_eq!(order.version(), 1);
        let events = log.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, ORDER_CREATED_EVENT_TYPE);
        assert_eq!(events[0].aggregate_id, command.order_id);
        assert_eq!(events[0].correlation_id, command.correlation_id);
        assert_eq!(events[0].occurred_at, clock().0);
        assert_eq!(events[0].version, 1);
    }

    #[tokio::test]
    async fn test_each_event_records_the_clock_reading_at_decision() {
        // Arrange
        let log = Arc::new(RecordingEventLog::new());
        let cache = OrderCache::new(log.clone());
        let start = clock().0;
        let stepping = SteppingClock::new(start, Duration::seconds(1));
        let order_id = Uuid::new_v4();

        // Act
        handle_create_order(&create(order_id), &stepping, &cache).await.unwrap();
        handle_update_total(&update_total(order_id, dec!(9.99)), &stepping, &cache)
            .await
            .unwrap();

        // Assert
        let times: Vec<_> = log.events().iter().map(|e| e.occurred_at).collect();
        assert_eq!(times, vec![start, start + Duration::seconds(1)]);
    }

    #[tokio::test]
    async fn test_create_twice_is_a_rule_violation() {
        let cache = OrderCache::new(Arc::new(InMemoryEventLog::new()));
        let order_id = Uuid::new_v4();
        handle_create_order(&create(order_id), &clock(), &cache).await.unwrap();

        let outcome = handle_create_order(&create(order_id), &clock(), &cache).await.unwrap();

        assert!(matches!(outcome, CommandOutcome::DomainRuleViolation { .. }));
        assert_eq!(cache.gate_version(order_id), Some(1));
    }

    #[tokio::test]
    async fn test_scenario_replays_to_the_published_state() {
        // Arrange
        let log = Arc::new(InMemoryEventLog::new());
        let cache = OrderCache::new(log.clone());
        let clock = clock();
        let order_id = Uuid::new_v4();
        let (a, b) = open_order_with_two_items(&cache, order_id).await;

        // Act
        handle_recalculate_total(
            &RecalculateTotal {
                correlation_id: Uuid::new_v4(),
                order_id,
            },
            &clock,
            &cache,
        )
        .await
        .unwrap();
        let outcome = handle_remove_item(
            &RemoveItem {
                correlation_id: Uuid::new_v4(),
                order_id,
                item_id: a,
            },
            &clock,
            &cache,
        )
        .await
        .unwrap();

        // Assert
        let published = outcome.accepted().unwrap();
        assert_eq!(published.version(), 5);
        assert_eq!(published.items().len(), 1);
        assert_eq!(published.items()[0].item_id, b);
        assert_eq!(published.total(), dec!(150.00));
        assert!(published.needs_recalculation());

        let stored = log.read_all(order_id).await.unwrap();
        let versions: Vec<i64> = stored.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![1, 2, 3, 4, 5]);
        let replayed: Order = replay::rebuild_stored(order_id, &stored).unwrap();
        assert_eq!(replayed, published);
        assert_eq!(*cache.get(order_id).unwrap(), published);
    }

    #[tokio::test]
    async fn test_cold_cache_rebuilds_before_deciding() {
        // Arrange
        let log: Arc<InMemoryEventLog> = Arc::new(InMemoryEventLog::new());
        let order_id = Uuid::new_v4();
        open_order_with_two_items(&OrderCache::new(log.clone()), order_id).await;
        let restarted = OrderCache::new(log.clone());

        // Act
        let outcome = handle_update_total(&update_total(order_id, dec!(175.00)), &clock(), &restarted)
            .await
            .unwrap();

        // Assert
        let order = outcome.accepted().unwrap();
        assert_eq!(order.version(), 4);
        assert_eq!(order.items().len(), 2);
        assert_eq!(order.total(), dec!(175.00));
        assert_eq!(log.stream_len(order_id), 4);
    }

    #[tokio::test]
    async fn test_concurrent_total_updates_have_one_winner() {
        // Arrange
        let pausing = Arc::new(PausingEventLog::new(Arc::new(InMemoryEventLog::new()), 4));
        let cache = Arc::new(OrderCache::new(pausing.clone()));
        let clock = Arc::new(clock());
        let order_id = Uuid::new_v4();
        open_order_with_two_items(&cache, order_id).await;

        let winner = {
            let (cache, clock) = (Arc::clone(&cache), Arc::clone(&clock));
            tokio::spawn(async move {
                handle_update_total(&update_total(order_id, dec!(200.00)), &*clock, &cache).await
            })
        };
        pausing.wait_until_paused().await;

        // Act
        let loser = handle_update_total(&update_total(order_id, dec!(300.00)), &*clock, &cache)
            .await
            .unwrap();
        pausing.release();
        let winner = winner.await.unwrap().unwrap();

        // Assert
        assert_eq!(
            loser,
            CommandOutcome::Conflict {
                aggregate_id: order_id,
                attempted_version: 3,
                current_version: 4,
            }
        );
        let order = winner.accepted().unwrap();
        assert_eq!(order.version(), 4);
        assert_eq!(order.total(), dec!(200.00));
        assert_eq!(cache.get(order_id).unwrap().total(), dec!(200.00));
        let stored = pausing.read_all(order_id).await.unwrap();
        assert_eq!(stored.len(), 4);
        assert_eq!(stored[3].event_type, TOTAL_UPDATED_EVENT_TYPE);
    }

    #[tokio::test]
    async fn test_every_racer_on_the_same_snapshot_but_one_conflicts() {
        let pausing = Arc::new(PausingEventLog::new(Arc::new(InMemoryEventLog::new()), 4));
        let cache = Arc::new(OrderCache::new(pausing.clone()));
        let clock = Arc::new(clock());
        let order_id = Uuid::new_v4();
        open_order_with_two_items(&cache, order_id).await;

        let winner = {
            let (cache, clock) = (Arc::clone(&cache), Arc::clone(&clock));
            tokio::spawn(async move {
                handle_update_total(&update_total(order_id, dec!(1.00)), &*clock, &cache).await
            })
        };
        pausing.wait_until_paused().await;

        let mut racers = Vec::new();
        for n in 2..=10 {
            let (cache, clock) = (Arc::clone(&cache), Arc::clone(&clock));
            racers.push(tokio::spawn(async move {
                handle_update_total(&update_total(order_id, Decimal::from(n)), &*clock, &cache).await
            }));
        }
        for racer in racers {
            let outcome = racer.await.unwrap().unwrap();
            assert!(matches!(
                outcome,
                CommandOutcome::Conflict {
                    attempted_version: 3,
                    ..
                }
            ));
        }
        pausing.release();

        assert_eq!(winner.await.unwrap().unwrap().accepted().unwrap().total(), dec!(1.00));
        assert_eq!(pausing.read_all(order_id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_order_refuses_total_update_without_writing() {
        // Arrange
        let log = Arc::new(InMemoryEventLog::new());
        let cache = OrderCache::new(log.clone());
        let clock = clock();
        let order_id = Uuid::new_v4();
        handle_create_order(&create(order_id), &clock, &cache).await.unwrap();
        handle_cancel_order(
            &CancelOrder {
                correlation_id: Uuid::new_v4(),
                order_id,
                reason: "customer request".into(),
            },
            &clock,
            &cache,
        )
        .await
        .unwrap();

        // Act
        let outcome = handle_update_total(&update_total(order_id, dec!(10.00)), &clock, &cache)
            .await
            .unwrap();

        // Assert
        assert!(matches!(outcome, CommandOutcome::DomainRuleViolation { .. }));
        assert_eq!(log.stream_len(order_id), 2);
        assert_eq!(cache.gate_version(order_id), Some(2));
        assert_eq!(cache.get(order_id).unwrap().status(), OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_set_status_closes_the_order() {
        let cache = OrderCache::new(Arc::new(InMemoryEventLog::new()));
        let order_id = Uuid::new_v4();
        handle_create_order(&create(order_id), &clock(), &cache).await.unwrap();

        let outcome = handle_set_status(
            &SetStatus {
                correlation_id: Uuid::new_v4(),
                order_id,
                status: OrderStatus::Closed,
            },
            &clock(),
            &cache,
        )
        .await
        .unwrap();

        assert_eq!(outcome.accepted().unwrap().status(), OrderStatus::Closed);
    }

    #[tokio::test]
    async fn test_command_on_unknown_order_is_a_rule_violation() {
        let cache = OrderCache::new(Arc::new(InMemoryEventLog::new()));

        let outcome = handle_update_total(&update_total(Uuid::new_v4(), dec!(1.00)), &clock(), &cache)
            .await
            .unwrap();

        assert!(matches!(outcome, CommandOutcome::DomainRuleViolation { .. }));
    }

    #[tokio::test]
    async fn test_failing_log_surfaces_infrastructure_error() {
        let cache = OrderCache::new(Arc::new(FailingEventLog));
        let order_id = Uuid::new_v4();

        let result = handle_create_order(&create(order_id), &clock(), &cache).await;

        assert_eq!(
            result.unwrap_err(),
            DomainError::Infrastructure("connection refused".into())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_contended_adds_produce_a_contiguous_stream() {
        // Arrange
        let log = Arc::new(InMemoryEventLog::new());
        let cache = Arc::new(OrderCache::new(log.clone()));
        let clock = Arc::new(clock());
        let order_id = Uuid::new_v4();
        handle_create_order(&create(order_id), &*clock, &cache).await.unwrap();

        // Act
        let mut writers = Vec::new();
        for n in 0..16_u32 {
            let (cache, clock) = (Arc::clone(&cache), Arc::clone(&clock));
            writers.push(tokio::spawn(async move {
                let command = add(order_id, Uuid::new_v4(), "item", Decimal::from(n));
                loop {
                    let outcome = handle_add_item(&command, &*clock, &cache).await.unwrap();
                    if !outcome.is_conflict() {
                        break outcome;
                    }
                }
            }));
        }
        for writer in writers {
            assert!(matches!(writer.await.unwrap(), CommandOutcome::Accepted { .. }));
        }

        // Assert
        let stored = log.read_all(order_id).await.unwrap();
        let versions: Vec<i64> = stored.iter().map(|e| e.version).collect();
        assert_eq!(versions, (1..=17).collect::<Vec<i64>>());
        let replayed: Order = replay::rebuild_stored(order_id, &stored).unwrap();
        let published = cache.get(order_id).unwrap();
        assert_eq!(replayed, *published);
        assert_eq!(published.items().len(), 16);
        assert_eq!(published.items_sum(), Decimal::from(120));
    }
}
