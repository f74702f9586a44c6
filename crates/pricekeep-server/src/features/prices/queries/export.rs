//! Export prices query
//!
//! Reads persisted records inside four optional inclusive bounds and
//! serializes them into a `data.csv` archive. Bounds are parsed and checked
//! for inversion before the store is touched.

use pricekeep_common::money::parse_minor_units;
use pricekeep_common::types::parse_calendar_date;
use serde::{Deserialize, Serialize};

use crate::db::{SharedStore, StoreError};
use crate::ingest::archive::{ArchiveKind, UnknownArchiveKind};
use crate::ingest::export::{serialize, ExportError};
use crate::models::{InputRangeError, PriceFilter};

/// Query parameters of `GET /prices`
///
/// Dates are `YYYY-MM-DD`; prices are major units with `.` or `,` as the
/// decimal separator. Blank values count as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportPricesQuery {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub min: Option<String>,
    #[serde(default)]
    pub max: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Serialized archive ready to be sent
#[derive(Debug, Clone)]
pub struct ExportPricesResponse {
    pub kind: ArchiveKind,
    pub records: usize,
    pub archive: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportPricesError {
    #[error("Invalid {field}: '{value}'")]
    Validation { field: &'static str, value: String },

    #[error(transparent)]
    UnsupportedKind(#[from] UnknownArchiveKind),

    #[error(transparent)]
    Range(#[from] InputRangeError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] ExportError),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ExportPricesQuery {
    /// Parse the bounds into a filter; inverted pairs are rejected here.
    pub fn filter(&self) -> Result<PriceFilter, ExportPricesError> {
        let date = |field: &'static str, value: &Option<String>| {
            present(value)
                .map(|text| {
                    parse_calendar_date(text).map_err(|_| ExportPricesError::Validation {
                        field,
                        value: text.to_string(),
                    })
                })
                .transpose()
        };
        let price = |field: &'static str, value: &Option<String>| {
            present(value)
                .map(|text| {
                    parse_minor_units(text).map_err(|_| ExportPricesError::Validation {
                        field,
                        value: text.to_string(),
                    })
                })
                .transpose()
        };

        Ok(PriceFilter::new(
            date("start", &self.start)?,
            date("end", &self.end)?,
            price("min", &self.min)?,
            price("max", &self.max)?,
        )?)
    }

    pub fn archive_kind(&self) -> Result<ArchiveKind, ExportPricesError> {
        Ok(ArchiveKind::from_param(self.kind.as_deref())?)
    }
}

#[tracing::instrument(skip(store))]
pub async fn handle(
    store: SharedStore,
    query: ExportPricesQuery,
) -> Result<ExportPricesResponse, ExportPricesError> {
    let kind = query.archive_kind()?;
    let filter = query.filter()?;

    let rows = store.query(&filter).await?;
    let records = rows.len();

    let archive = tokio::task::spawn_blocking(move || serialize(&rows, kind))
        .await
        .map_err(|e| ExportPricesError::Internal(format!("export task failed: {}", e)))??;

    tracing::debug!(records, bytes = archive.len(), "Export serialized");

    Ok(ExportPricesResponse {
        kind,
        records,
        archive,
    })
}
