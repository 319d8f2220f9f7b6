//! Route modules.

use axum::Router;

use crate::state::AppState;

pub mod health;
pub mod orders;

/// Returns the full application router, without middleware layers.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/orders", orders::router())
}
