//! Upload prices command
//!
//! Runs one archive through the ingestion fold and commits the surviving
//! records to the store as a single unit of work.
//!
//! # Flow
//!
//! 1. Unwrap the archive, validate and deduplicate rows (blocking thread)
//! 2. Commit novel records; the store reclassifies already-persisted keys
//! 3. Combine the tallies into the response
//!
//! Row-level problems are counted, never thrown. Archive-level and
//! persistence-level problems fail the whole command with no partial result.

use pricekeep_common::money::minor_to_major;
use serde::{Deserialize, Serialize};

use crate::config::IngestLimits;
use crate::db::{SharedStore, StoreError};
use crate::ingest::archive::{ArchiveKind, UnknownArchiveKind};
use crate::ingest::{prepare_upload, IngestError};

/// Command to ingest one uploaded archive
#[derive(Debug, Clone, Default)]
pub struct UploadPricesCommand {
    /// Declared container format
    pub kind: ArchiveKind,
    /// Raw archive bytes
    pub archive: Vec<u8>,
}

/// Response from an upload
///
/// `total_categories` and `total_price` describe the whole persisted
/// population after this upload, not just its own rows. `total_price` is in
/// major units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadPricesResponse {
    /// Data rows read from the payload, header excluded
    pub total_count: usize,
    /// Rejected rows plus duplicates, in-upload and already persisted
    pub duplicates_count: usize,
    /// Rows newly persisted by this upload
    pub total_items: usize,
    pub total_categories: i64,
    pub total_price: f64,
}

/// Errors that can occur when uploading prices
#[derive(Debug, thiserror::Error)]
pub enum UploadPricesError {
    #[error("Archive content is required and cannot be empty")]
    ContentRequired,

    #[error("Multipart body has no file part")]
    FilePartMissing,

    #[error("Failed to read request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    UnsupportedKind(#[from] UnknownArchiveKind),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UploadPricesCommand {
    pub fn new(kind: ArchiveKind, archive: Vec<u8>) -> Self {
        Self { kind, archive }
    }

    pub fn validate(&self) -> Result<(), UploadPricesError> {
        if self.archive.is_empty() {
            return Err(UploadPricesError::ContentRequired);
        }
        Ok(())
    }
}

/// Handler function for uploads
///
/// # Errors
///
/// - `ContentRequired` for an empty body
/// - `Ingest` when the archive is unreadable, lacks `data.csv`, or breaks a ceiling
/// - `Persistence` when the unit of work aborts; nothing was written
#[tracing::instrument(
    skip(store, limits, command),
    fields(kind = %command.kind, bytes = command.archive.len())
)]
pub async fn handle(
    store: SharedStore,
    limits: IngestLimits,
    command: UploadPricesCommand,
) -> Result<UploadPricesResponse, UploadPricesError> {
    command.validate()?;

    let UploadPricesCommand { kind, archive } = command;
    let prepared = tokio::task::spawn_blocking(move || prepare_upload(&archive, kind, &limits))
        .await
        .map_err(|e| UploadPricesError::Internal(format!("ingest task failed: {}", e)))??;

    let rejected = prepared.rejected.total();
    if rejected > 0 {
        tracing::info!(rejected, reasons = %prepared.rejected, "Rows rejected");
    }

    let total_rows = prepared.total_rows;
    let in_upload_duplicates = prepared.in_upload_duplicates;
    let outcome = store.commit(prepared.novel).await?;

    tracing::info!(
        total_rows,
        rejected,
        in_upload_duplicates,
        store_duplicates = outcome.duplicates,
        inserted = outcome.inserted,
        "Upload committed"
    );

    Ok(UploadPricesResponse {
        total_count: total_rows,
        duplicates_count: rejected + in_upload_duplicates + outcome.duplicates,
        total_items: outcome.inserted,
        total_categories: outcome.total_categories,
        total_price: minor_to_major(outcome.total_price_minor),
    })
}
