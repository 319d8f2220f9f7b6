//! Shared application state.

use lockstep_orders::application::service::OrderService;

/// Which event log backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogBackend {
    /// Events live in process memory and are lost on restart.
    InMemory,
    /// Events are appended to the `domain_events` table.
    Postgres,
}

impl LogBackend {
    /// Name reported by the health endpoint.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InMemory => "in_memory",
            Self::Postgres => "postgres",
        }
    }
}

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Order commands and queries.
    pub orders: OrderService,
    /// The log behind `orders`.
    pub log_backend: LogBackend,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(orders: OrderService, log_backend: LogBackend) -> Self {
        Self {
            orders,
            log_backend,
        }
    }
}
