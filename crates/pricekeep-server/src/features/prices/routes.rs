//! Price API routes
//!
//! # Route Structure
//!
//! - `POST /api/v0/prices?type=zip|tar` - Upload an archive holding `data.csv`
//! - `GET /api/v0/prices?start=&end=&min=&max=&type=zip|tar` - Export an archive
//!
//! The upload body is either the raw archive or a `multipart/form-data`
//! submission whose `file` part (or first part with a filename) is the archive.

use crate::api::response::ErrorResponse;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::{
    commands::{UploadPricesCommand, UploadPricesError},
    queries::{ExportPricesError, ExportPricesQuery},
};
use crate::config::IngestLimits;
use crate::features::FeatureState;
use crate::ingest::archive::ArchiveKind;
use crate::ingest::IngestError;

/// Room for multipart boundaries and part headers on top of the archive ceiling.
const MULTIPART_OVERHEAD_BYTES: usize = 64 << 10;

// ============================================================================
// Router Configuration
// ============================================================================

pub fn prices_routes(limits: &IngestLimits) -> Router<FeatureState> {
    Router::new()
        .route("/", post(upload_prices).get(export_prices))
        .layer(DefaultBodyLimit::max(
            limits.max_archive_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
}

// ============================================================================
// Request Body
// ============================================================================

/// Archive bytes taken from a raw or multipart request body
#[derive(Debug)]
pub struct ArchiveBody(pub Vec<u8>);

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| {
            ct.trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        })
}

fn body_error(status: StatusCode, text: String, limits: &IngestLimits) -> UploadPricesError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        UploadPricesError::Ingest(IngestError::ArchiveTooLarge {
            limit: limits.max_archive_bytes,
        })
    } else {
        UploadPricesError::InvalidBody(text)
    }
}

#[async_trait]
impl FromRequest<FeatureState> for ArchiveBody {
    type Rejection = PriceApiError;

    async fn from_request(req: Request, state: &FeatureState) -> Result<Self, Self::Rejection> {
        let limits = state.limits;

        if !is_multipart(&req) {
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(|e| body_error(e.status(), e.body_text(), &limits))?;
            return Ok(Self(bytes.to_vec()));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| body_error(e.status(), e.body_text(), &limits))?;

        let mut fallback: Option<Vec<u8>> = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| body_error(e.status(), e.body_text(), &limits))?
        {
            let named_file = field.name() == Some("file");
            if !named_file && (field.file_name().is_none() || fallback.is_some()) {
                continue;
            }

            let data = field
                .bytes()
                .await
                .map_err(|e| body_error(e.status(), e.body_text(), &limits))?;
            if named_file {
                return Ok(Self(data.to_vec()));
            }
            fallback = Some(data.to_vec());
        }

        fallback
            .map(Self)
            .ok_or_else(|| UploadPricesError::FilePartMissing.into())
    }
}

#[derive(Debug, Default, Deserialize)]
struct UploadParams {
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Upload an archive
///
/// # Response
///
/// - `200 OK` - `{"total_count", "duplicates_count", "total_items", "total_categories", "total_price"}`
/// - `400 Bad Request` - Unreadable archive, missing `data.csv`, invalid CSV, bad `type`
/// - `413 Payload Too Large` - Archive, payload or row ceiling exceeded
/// - `503 Service Unavailable` - The unit of work aborted; nothing was stored
#[tracing::instrument(skip(state, body), fields(kind = ?params.kind, bytes = body.0.len()))]
async fn upload_prices(
    State(state): State<FeatureState>,
    Query(params): Query<UploadParams>,
    body: ArchiveBody,
) -> Result<Response, PriceApiError> {
    let kind = ArchiveKind::from_param(params.kind.as_deref()).map_err(UploadPricesError::from)?;
    let command = UploadPricesCommand::new(kind, body.0);

    let response = super::commands::upload::handle(state.store, state.limits, command).await?;

    tracing::info!(
        total_count = response.total_count,
        total_items = response.total_items,
        "Prices uploaded via API"
    );

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Export persisted prices as an archive
///
/// # Response
///
/// - `200 OK` - Archive with `data.csv`, ordered by date then id
/// - `400 Bad Request` - Malformed or inverted bounds, bad `type`
/// - `503 Service Unavailable` - Store unreachable
#[tracing::instrument(skip(state))]
async fn export_prices(
    State(state): State<FeatureState>,
    Query(query): Query<ExportPricesQuery>,
) -> Result<Response, PriceApiError> {
    let response = super::queries::export::handle(state.store, query).await?;

    tracing::debug!(
        records = response.records,
        kind = %response.kind,
        "Prices exported via API"
    );

    let headers = [
        (header::CONTENT_TYPE, response.kind.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", response.kind.download_name()),
        ),
    ];
    Ok((StatusCode::OK, headers, response.archive).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for price API endpoints
#[derive(Debug)]
pub enum PriceApiError {
    UploadError(UploadPricesError),
    ExportError(ExportPricesError),
}

impl From<UploadPricesError> for PriceApiError {
    fn from(err: UploadPricesError) -> Self {
        Self::UploadError(err)
    }
}

impl From<ExportPricesError> for PriceApiError {
    fn from(err: ExportPricesError) -> Self {
        Self::ExportError(err)
    }
}

fn ingest_status(err: &IngestError) -> (StatusCode, &'static str) {
    match err {
        IngestError::ArchiveFormat(_) => (StatusCode::BAD_REQUEST, "INVALID_ARCHIVE"),
        IngestError::PayloadNotFound(_) => (StatusCode::BAD_REQUEST, "PAYLOAD_NOT_FOUND"),
        IngestError::ArchiveTooLarge { .. }
        | IngestError::PayloadTooLarge { .. }
        | IngestError::TooManyRows { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
        IngestError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, "INVALID_CSV"),
    }
}

fn persistence_unavailable(context: &str, err: &dyn std::fmt::Display) -> Response {
    tracing::error!("Persistence error during {}: {}", context, err);
    let error = ErrorResponse::new(
        "PERSISTENCE_ERROR",
        "The price store is unavailable, nothing was changed. Retry later",
    );
    (StatusCode::SERVICE_UNAVAILABLE, Json(error)).into_response()
}

fn internal(context: &str, err: &dyn std::fmt::Display) -> Response {
    tracing::error!("Internal error during {}: {}", context, err);
    let error = ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
}

impl IntoResponse for PriceApiError {
    fn into_response(self) -> Response {
        match self {
            // Upload errors
            PriceApiError::UploadError(
                UploadPricesError::ContentRequired
                | UploadPricesError::FilePartMissing
                | UploadPricesError::InvalidBody(_)
                | UploadPricesError::UnsupportedKind(_),
            ) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            PriceApiError::UploadError(UploadPricesError::Ingest(ref err)) => {
                let (status, code) = ingest_status(err);
                tracing::warn!(code, "Upload refused: {}", err);
                (status, Json(ErrorResponse::new(code, err.to_string()))).into_response()
            },
            PriceApiError::UploadError(UploadPricesError::Persistence(ref err)) => {
                persistence_unavailable("upload", err)
            },
            PriceApiError::UploadError(UploadPricesError::Internal(ref msg)) => {
                internal("upload", msg)
            },

            // Export errors
            PriceApiError::ExportError(
                ExportPricesError::Validation { .. } | ExportPricesError::UnsupportedKind(_),
            ) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            PriceApiError::ExportError(ExportPricesError::Range(_)) => {
                let error = ErrorResponse::new("INPUT_RANGE_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            PriceApiError::ExportError(ExportPricesError::Persistence(ref err)) => {
                persistence_unavailable("export", err)
            },
            PriceApiError::ExportError(ExportPricesError::Serialize(ref err)) => {
                internal("export", err)
            },
            PriceApiError::ExportError(ExportPricesError::Internal(ref msg)) => {
                internal("export", msg)
            },
        }
    }
}

impl std::fmt::Display for PriceApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UploadError(e) => write!(f, "{}", e),
            Self::ExportError(e) => write!(f, "{}", e),
        }
    }
}
