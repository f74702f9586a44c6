//! Export serialization
//!
//! Renders persisted records as `data.csv` and wraps it in a zip or tar
//! container. The CSV bytes are a pure function of the ordered input; the
//! containers use fixed timestamps so repeated exports are byte-identical too.

use std::io::{Cursor, Write};

use pricekeep_common::money::format_minor_units;
use pricekeep_common::types::DATE_FORMAT;
use pricekeep_common::PersistedRecord;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::archive::{ArchiveKind, PAYLOAD_FILENAME};

/// Header row of every exported payload.
pub const EXPORT_HEADER: [&str; 5] = ["id", "name", "category", "price", "create_date"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for ExportError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

/// Render `records` as CSV with the fixed header and `\n` line endings.
pub fn write_payload(records: &[PersistedRecord]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(EXPORT_HEADER)?;
    for record in records {
        let id = record.id.to_string();
        let price = format_minor_units(record.price_minor);
        let date = record.date.format(DATE_FORMAT).to_string();
        writer.write_record([
            id.as_str(),
            record.name.as_str(),
            record.category.as_str(),
            price.as_str(),
            date.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

/// Serialize `records` into an archive of the requested kind.
pub fn serialize(records: &[PersistedRecord], kind: ArchiveKind) -> Result<Vec<u8>, ExportError> {
    let payload = write_payload(records)?;
    match kind {
        ArchiveKind::Zip => zip_payload(&payload),
        ArchiveKind::Tar => tar_payload(&payload),
    }
}

fn zip_payload(payload: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        writer.start_file(PAYLOAD_FILENAME, options)?;
        writer.write_all(payload)?;
        writer.finish()?;
    }
    Ok(cursor.into_inner())
}

fn tar_payload(payload: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(payload.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);

    builder.append_data(&mut header, PAYLOAD_FILENAME, payload)?;
    Ok(builder.into_inner()?)
}
