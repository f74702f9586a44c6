//! Feature modules implementing the Pricekeep API
//!
//! Each feature is a vertical slice:
//! - `commands/` - Write operations
//! - `queries/` - Read operations
//! - `routes.rs` - HTTP route definitions
//!
//! # Features
//!
//! - **prices**: archive upload into the price store and filtered archive export

pub mod prices;

use axum::Router;

use crate::config::IngestLimits;
use crate::db::SharedStore;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Persistence gateway handle
    pub store: SharedStore,
    /// Upload ceilings
    pub limits: IngestLimits,
}

/// Creates the API router with all feature routes mounted
///
/// - `/prices` - Upload and export of price archives
pub fn router(state: FeatureState) -> Router<()> {
    let limits = state.limits;
    Router::new().nest("/prices", prices::prices_routes(&limits).with_state(state))
}
