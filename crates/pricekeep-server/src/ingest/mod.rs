//! Upload ingestion
//!
//! The upload path is a single sequential fold over the rows of `data.csv`:
//!
//! ```text
//! archive bytes -> archive::unwrap_payload -> csv records
//!     -> normalize::normalize (per row) -> dedup::IngestDeduplicator (per row)
//!     -> PreparedUpload { novel records, tallies }
//! ```
//!
//! The result is handed to a [`crate::db::PriceStore`] for the atomic commit.
//! Nothing here touches shared state, so the whole fold can run on a
//! blocking thread.

pub mod archive;
pub mod dedup;
pub mod export;
pub mod normalize;

use std::collections::BTreeMap;

use pricekeep_common::CanonicalRecord;
use tracing::trace;

use crate::config::IngestLimits;
use archive::ArchiveKind;
use dedup::{IngestDeduplicator, Verdict};
use normalize::{normalize, RawRecord, RejectReason};

/// Request-level ingestion failures; any of these aborts the upload
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Invalid archive: {0}")]
    ArchiveFormat(String),

    #[error("{0} not found in archive")]
    PayloadNotFound(&'static str),

    #[error("Archive exceeds the {limit} byte limit")]
    ArchiveTooLarge { limit: usize },

    #[error("Extracted payload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    #[error("Upload exceeds the {limit} row limit")]
    TooManyRows { limit: usize },

    #[error("Invalid CSV: {0}")]
    MalformedPayload(String),
}

/// Per-reason counts of rejected rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectTally {
    counts: BTreeMap<RejectReason, usize>,
}

impl RejectTally {
    pub fn record(&mut self, reason: RejectReason) {
        *self.counts.entry(reason).or_default() += 1;
    }

    pub fn get(&self, reason: RejectReason) -> usize {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RejectReason, usize)> + '_ {
        self.counts.iter().map(|(reason, count)| (*reason, *count))
    }
}

impl std::fmt::Display for RejectTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (reason, count) in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}={}", reason, count)?;
            first = false;
        }
        Ok(())
    }
}

/// Outcome of the in-memory half of an upload
#[derive(Debug, Clone, Default)]
pub struct PreparedUpload {
    /// Data rows read, header excluded
    pub total_rows: usize,
    pub rejected: RejectTally,
    pub in_upload_duplicates: usize,
    /// First occurrences in file order, ready for the store
    pub novel: Vec<CanonicalRecord>,
}

/// Unwrap the archive and fold its rows.
pub fn prepare_upload(
    archive_bytes: &[u8],
    kind: ArchiveKind,
    limits: &IngestLimits,
) -> Result<PreparedUpload, IngestError> {
    let payload = archive::unwrap_payload(archive_bytes, kind, limits)?;
    fold_rows(&payload, limits.max_rows)
}

/// Validate and deduplicate the rows of a CSV payload.
///
/// The first record is a header and is skipped. Blank lines are ignored.
pub fn fold_rows(payload: &[u8], max_rows: usize) -> Result<PreparedUpload, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(payload);

    let mut dedup = IngestDeduplicator::new();
    let mut prepared = PreparedUpload::default();

    for result in reader.records() {
        let record = result.map_err(|e| IngestError::MalformedPayload(e.to_string()))?;

        prepared.total_rows += 1;
        if prepared.total_rows > max_rows {
            return Err(IngestError::TooManyRows { limit: max_rows });
        }

        match normalize(&RawRecord::from(&record)) {
            Ok(canonical) => {
                if dedup.accept(&canonical) == Verdict::Novel {
                    prepared.novel.push(canonical);
                }
            },
            Err(reason) => {
                trace!(
                    line = record.position().map(|p| p.line()),
                    %reason,
                    "Row rejected"
                );
                prepared.rejected.record(reason);
            },
        }
    }

    prepared.in_upload_duplicates = dedup.duplicates();
    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "id,name,category,price,create_date\n";

    fn fold(body: &str) -> PreparedUpload {
        fold_rows(format!("{HEADER}{body}").as_bytes(), 1_000).unwrap()
    }

    #[test]
    fn test_malformed_and_duplicate_rows() {
        let prepared = fold(
            "1,Milk,Dairy,12.50,2024-01-15\n\
             2,Bread,Bakery,3.00\n\
             3,Milk,Dairy,12.50,2024-01-15\n",
        );
        assert_eq!(prepared.total_rows, 3);
        assert_eq!(prepared.rejected.get(RejectReason::FieldCount), 1);
        assert_eq!(prepared.in_upload_duplicates, 1);
        assert_eq!(prepared.novel.len(), 1);
        assert_eq!(prepared.novel[0].external_id, "1");
    }

    #[test]
    fn test_first_occurrence_kept_in_file_order() {
        let prepared = fold(
            "10,B,Cat,1,2024-01-02\n\
             11,A,Cat,1,2024-01-01\n\
             12,B,Cat,1.00,2024-01-02\n",
        );
        let ids: Vec<_> = prepared.novel.iter().map(|r| r.external_id.as_str()).collect();
        assert_eq!(ids, ["10", "11"]);
        assert_eq!(prepared.in_upload_duplicates, 1);
    }

    #[test]
    fn test_comma_price_duplicates_period_price() {
        let prepared = fold(
            "1,Milk,Dairy,\"12,50\",2024-01-15\n\
             2,Milk,Dairy,12.50,2024-01-15\n",
        );
        assert_eq!(prepared.novel.len(), 1);
        assert_eq!(prepared.novel[0].price_minor, 1250);
        assert_eq!(prepared.in_upload_duplicates, 1);
    }

    #[test]
    fn test_header_only_and_blank_lines() {
        let prepared = fold("\n\n");
        assert_eq!(prepared.total_rows, 0);
        assert!(prepared.novel.is_empty());

        let empty = fold_rows(b"", 10).unwrap();
        assert_eq!(empty.total_rows, 0);
    }

    #[test]
    fn test_reject_tally_by_reason() {
        let prepared = fold(
            "1,Milk,Dairy,abc,2024-01-15\n\
             2,Milk,Dairy,0,2024-01-15\n\
             3,Milk,Dairy,1,2024-99-15\n\
             4,,Dairy,1,2024-01-15\n",
        );
        assert_eq!(prepared.rejected.total(), 4);
        assert_eq!(prepared.rejected.get(RejectReason::InvalidPrice), 1);
        assert_eq!(prepared.rejected.get(RejectReason::NonPositivePrice), 1);
        assert_eq!(prepared.rejected.get(RejectReason::InvalidDate), 1);
        assert_eq!(prepared.rejected.get(RejectReason::EmptyField), 1);
        assert_eq!(
            prepared.rejected.to_string(),
            "empty_field=1,invalid_price=1,non_positive_price=1,invalid_date=1"
        );
    }

    #[test]
    fn test_unstorable_rows_are_tallied_not_fatal() {
        let prepared = fold(
            "1,Mi\0lk,Dairy,1.00,2024-01-15
             2,Rye,Bakery,1.00,2024-01-15
             3,Gold,Metal,50000000000000000,2024-01-15
",
        );
        assert_eq!(prepared.total_rows, 3);
        assert_eq!(prepared.novel.len(), 1);
        assert_eq!(prepared.novel[0].name, "Rye");
        assert_eq!(prepared.rejected.get(RejectReason::ControlCharacter), 1);
        assert_eq!(prepared.rejected.get(RejectReason::InvalidPrice), 1);
    }

    #[test]
    fn test_row_ceiling() {
        let body = format!("{HEADER}1,A,C,1,2024-01-01\n2,B,C,1,2024-01-01\n3,C,C,1,2024-01-01\n");
        assert!(matches!(
            fold_rows(body.as_bytes(), 2),
            Err(IngestError::TooManyRows { limit: 2 })
        ));
        assert!(fold_rows(body.as_bytes(), 3).is_ok());
    }

    #[test]
    fn test_invalid_utf8_aborts() {
        let mut body = HEADER.as_bytes().to_vec();
        body.extend_from_slice(b"1,Mi\xff\xfek,Dairy,1,2024-01-01\n");
        assert!(matches!(
            fold_rows(&body, 10),
            Err(IngestError::MalformedPayload(_))
        ));
    }
}
