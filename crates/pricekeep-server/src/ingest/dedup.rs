//! In-upload deduplication
//!
//! Tracks identity keys already seen in the current upload. Rows must be fed
//! in file order: the first occurrence of a key is the one kept.
//!
//! This only saves work within one upload. Cross-upload duplicates are
//! decided by the store's unique constraint.

use std::collections::HashSet;

use pricekeep_common::{CanonicalRecord, IdentityKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Novel,
    Duplicate,
}

#[derive(Debug, Default)]
pub struct IngestDeduplicator {
    seen: HashSet<IdentityKey>,
    duplicates: usize,
}

impl IngestDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `record` against everything accepted so far.
    pub fn accept(&mut self, record: &CanonicalRecord) -> Verdict {
        if self.seen.insert(record.identity()) {
            Verdict::Novel
        } else {
            self.duplicates += 1;
            Verdict::Duplicate
        }
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn distinct(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(external_id: &str, name: &str, price_minor: i64) -> CanonicalRecord {
        CanonicalRecord {
            external_id: external_id.to_string(),
            name: name.to_string(),
            category: "Dairy".to_string(),
            price_minor,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        }
    }

    #[test]
    fn test_first_occurrence_is_novel() {
        let mut dedup = IngestDeduplicator::new();
        assert_eq!(dedup.accept(&record("1", "Milk", 100)), Verdict::Novel);
        assert_eq!(dedup.accept(&record("1", "Milk", 100)), Verdict::Duplicate);
        assert_eq!(dedup.duplicates(), 1);
        assert_eq!(dedup.distinct(), 1);
    }

    #[test]
    fn test_external_id_is_not_part_of_identity() {
        let mut dedup = IngestDeduplicator::new();
        assert_eq!(dedup.accept(&record("1", "Milk", 100)), Verdict::Novel);
        assert_eq!(dedup.accept(&record("2", "Milk", 100)), Verdict::Duplicate);
    }

    #[test]
    fn test_business_fields_distinguish() {
        let mut dedup = IngestDeduplicator::new();
        assert_eq!(dedup.accept(&record("1", "Milk", 100)), Verdict::Novel);
        assert_eq!(dedup.accept(&record("1", "Milk", 101)), Verdict::Novel);
        assert_eq!(dedup.accept(&record("1", "Kefir", 100)), Verdict::Novel);
        assert_eq!(dedup.duplicates(), 0);
        assert_eq!(dedup.distinct(), 3);
    }
}
