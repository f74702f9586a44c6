//! Persistence gateway
//!
//! [`PriceStore`] is the one seam through which the pipeline touches shared
//! state. Handlers receive it as an explicit [`SharedStore`] handle, so the
//! same code runs against PostgreSQL in production and [`MemoryPriceStore`]
//! in tests.
//!
//! # Unit of work
//!
//! [`PriceStore::commit`] attempts a conditional insert for every candidate,
//! keyed on `(date, name, category, price)`, then reads the aggregates over
//! the whole persisted population. Either all of it takes effect or none of
//! it does. A candidate whose key already exists is counted as a duplicate,
//! never surfaced as an error.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use pricekeep_common::{CanonicalRecord, PersistedRecord};
use serde::Serialize;

use crate::models::PriceFilter;

pub use memory::MemoryPriceStore;
pub use postgres::PgPriceStore;

/// Handle threaded through handlers and commands
pub type SharedStore = Arc<dyn PriceStore>;

/// Result of one committed unit of work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitOutcome {
    /// Candidates that became new rows
    pub inserted: usize,
    /// Candidates whose identity key was already persisted
    pub duplicates: usize,
    /// Distinct categories across all persisted rows
    pub total_categories: i64,
    /// Sum of all persisted prices, in minor units
    pub total_price_minor: i128,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unit of work aborted: {0}")]
    Aborted(String),
}

#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Insert `candidates` and compute the aggregates as one atomic unit.
    ///
    /// Candidates are inserted in identity-key order, so surrogate ids within
    /// one upload follow `(date, name, category, price)` rather than file order.
    async fn commit(&self, candidates: Vec<CanonicalRecord>) -> Result<CommitOutcome, StoreError>;

    /// Read records matching `filter`, ordered by date then surrogate id.
    async fn query(&self, filter: &PriceFilter) -> Result<Vec<PersistedRecord>, StoreError>;

    /// Liveness check for the health probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Order candidates by identity key.
///
/// Concurrent commits then take row locks in the same order, which keeps
/// overlapping uploads from deadlocking each other.
pub(crate) fn sort_by_identity(candidates: &mut [CanonicalRecord]) {
    candidates.sort_by(|a, b| {
        (a.date, &a.name, &a.category, a.price_minor).cmp(&(b.date, &b.name, &b.category, b.price_minor))
    });
}
