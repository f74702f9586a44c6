//! In-process [`PriceStore`] used by tests and local runs without a database

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use pricekeep_common::{CanonicalRecord, IdentityKey, PersistedRecord};
use tokio::sync::Mutex;

use super::{sort_by_identity, CommitOutcome, PriceStore, StoreError};
use crate::models::PriceFilter;

#[derive(Debug, Default)]
struct State {
    rows: Vec<PersistedRecord>,
    keys: HashSet<IdentityKey>,
    next_id: i64,
}

/// Mutex-guarded store with the same all-or-nothing commit as PostgreSQL.
///
/// Cloning shares the underlying rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryPriceStore {
    state: Arc<Mutex<State>>,
    fail_after: Option<usize>,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort any commit that would insert more than `inserts` new rows.
    ///
    /// Nothing from the aborted commit is kept.
    pub fn with_failure_after(mut self, inserts: usize) -> Self {
        self.fail_after = Some(inserts);
        self
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn commit(
        &self,
        mut candidates: Vec<CanonicalRecord>,
    ) -> Result<CommitOutcome, StoreError> {
        sort_by_identity(&mut candidates);

        let mut state = self.state.lock().await;

        // Stage against a snapshot of the key set; publish only on success.
        let mut staged_keys = HashSet::new();
        let mut staged = Vec::new();
        let mut next_id = state.next_id;
        for record in candidates.iter() {
            let key = record.identity();
            if state.keys.contains(&key) || !staged_keys.insert(key) {
                continue;
            }
            if self.fail_after.is_some_and(|limit| staged.len() >= limit) {
                return Err(StoreError::Aborted(format!(
                    "injected failure after {} inserts",
                    staged.len()
                )));
            }
            next_id += 1;
            staged.push(PersistedRecord {
                id: next_id,
                name: record.name.clone(),
                category: record.category.clone(),
                price_minor: record.price_minor,
                date: record.date,
            });
        }

        // Aggregates cover the population as it will be after publishing
        let population = || state.rows.iter().chain(staged.iter());
        let total_categories = population()
            .map(|r| r.category.as_str())
            .collect::<BTreeSet<_>>()
            .len() as i64;
        let total_price_minor = population()
            .try_fold(0i128, |sum, r| sum.checked_add(i128::from(r.price_minor)))
            .ok_or_else(|| StoreError::Aborted("price total is out of range".to_string()))?;

        let inserted = staged.len();
        state.keys.extend(staged_keys);
        state.rows.extend(staged);
        state.next_id = next_id;

        Ok(CommitOutcome {
            inserted,
            duplicates: candidates.len() - inserted,
            total_categories,
            total_price_minor,
        })
    }

    async fn query(&self, filter: &PriceFilter) -> Result<Vec<PersistedRecord>, StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<PersistedRecord> =
            state.rows.iter().filter(|r| filter.matches(r)).cloned().collect();
        rows.sort_by_key(|r| (r.date, r.id));
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
