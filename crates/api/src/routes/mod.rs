//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod audit;
pub mod budget;
pub mod health;
pub mod ledger_lock;
pub mod vouchers;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(vouchers::routes())
        .merge(budget::routes())
        .merge(audit::routes())
        .merge(ledger_lock::routes())
}
