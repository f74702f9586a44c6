//! Archive unwrapping
//!
//! Locates the single `data.csv` payload inside an uploaded archive.
//!
//! # Supported Formats
//!
//! - **Zip** (.zip): Using the zip crate
//! - **Tar** (.tar): Using the tar crate
//!
//! The first entry whose base name equals `data.csv` (ASCII case-insensitive)
//! wins and scanning stops there. Directory entries and zero-length entries
//! are skipped. There is no fallback to "some other .csv".
//!
//! ```rust,ignore
//! use pricekeep_server::ingest::archive::{unwrap_payload, ArchiveKind};
//!
//! let csv = unwrap_payload(&upload_bytes, ArchiveKind::Zip, &limits)?;
//! ```

use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use std::str::FromStr;
use tracing::debug;

use super::IngestError;
use crate::config::IngestLimits;

/// Name of the tabular payload inside every archive.
pub const PAYLOAD_FILENAME: &str = "data.csv";

/// Container format of an upload or export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    #[default]
    Zip,
    Tar,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Archive type must be zip or tar, got '{0}'")]
pub struct UnknownArchiveKind(pub String);

impl ArchiveKind {
    /// Interpret the optional `type` request parameter; blank means zip.
    pub fn from_param(param: Option<&str>) -> Result<Self, UnknownArchiveKind> {
        match param.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(value) => value.parse(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::Tar => "tar",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ArchiveKind::Zip => "application/zip",
            ArchiveKind::Tar => "application/x-tar",
        }
    }

    /// Download name offered in `Content-Disposition`.
    pub fn download_name(self) -> &'static str {
        match self {
            ArchiveKind::Zip => "data.zip",
            ArchiveKind::Tar => "data.tar",
        }
    }
}

impl FromStr for ArchiveKind {
    type Err = UnknownArchiveKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zip" => Ok(ArchiveKind::Zip),
            "tar" => Ok(ArchiveKind::Tar),
            _ => Err(UnknownArchiveKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn is_payload(path: &str) -> bool {
    base_name(path).eq_ignore_ascii_case(PAYLOAD_FILENAME)
}

/// Read at most `limit` bytes, failing if the entry holds more.
fn read_bounded(entry: impl Read, limit: u64, path: &str) -> Result<Vec<u8>, IngestError> {
    let mut contents = Vec::new();
    entry
        .take(limit.saturating_add(1))
        .read_to_end(&mut contents)
        .map_err(|e| IngestError::ArchiveFormat(format!("failed to read {}: {}", path, e)))?;

    if contents.len() as u64 > limit {
        return Err(IngestError::PayloadTooLarge { limit });
    }

    debug!(entry = %path, bytes = contents.len(), "Extracted payload");
    Ok(contents)
}

/// Extract the `data.csv` payload from `bytes` interpreted as `kind`.
///
/// The archive size ceiling is checked before any parsing starts.
pub fn unwrap_payload(
    bytes: &[u8],
    kind: ArchiveKind,
    limits: &IngestLimits,
) -> Result<Vec<u8>, IngestError> {
    if bytes.len() > limits.max_archive_bytes {
        return Err(IngestError::ArchiveTooLarge {
            limit: limits.max_archive_bytes,
        });
    }

    match kind {
        ArchiveKind::Zip => from_zip(bytes, limits.max_payload_bytes),
        ArchiveKind::Tar => from_tar(bytes, limits.max_payload_bytes),
    }
}

fn from_zip(bytes: &[u8], limit: u64) -> Result<Vec<u8>, IngestError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| IngestError::ArchiveFormat(format!("invalid zip archive: {}", e)))?;

    for i in 0..archive.len() {
        let file = archive.by_index(i).map_err(|e| {
            IngestError::ArchiveFormat(format!("failed to read zip entry at index {}: {}", i, e))
        })?;

        if file.is_dir() || file.size() == 0 {
            continue;
        }

        let path = file.name().to_string();
        if is_payload(&path) {
            return read_bounded(file, limit, &path);
        }
    }

    Err(IngestError::PayloadNotFound(PAYLOAD_FILENAME))
}

fn from_tar(bytes: &[u8], limit: u64) -> Result<Vec<u8>, IngestError> {
    let mut archive = tar::Archive::new(Cursor::new(bytes));
    let entries = archive
        .entries()
        .map_err(|e| IngestError::ArchiveFormat(format!("invalid tar archive: {}", e)))?;

    for entry in entries {
        let entry =
            entry.map_err(|e| IngestError::ArchiveFormat(format!("invalid tar archive: {}", e)))?;

        if !entry.header().entry_type().is_file() || entry.size() == 0 {
            continue;
        }

        let path = entry
            .path()
            .map_err(|e| IngestError::ArchiveFormat(format!("invalid tar entry path: {}", e)))?
            .to_string_lossy()
            .into_owned();

        if is_payload(&path) {
            return read_bounded(entry, limit, &path);
        }
    }

    Err(IngestError::PayloadNotFound(PAYLOAD_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            for (name, data) in entries {
                if name.ends_with('/') {
                    writer
                        .add_directory(*name, SimpleFileOptions::default())
                        .unwrap();
                } else {
                    writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                    writer.write_all(data).unwrap();
                }
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn tar_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            if name.ends_with('/') {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
            } else {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(data.len() as u64);
            }
            header.set_mode(0o644);
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn limits() -> IngestLimits {
        IngestLimits::default()
    }

    #[test]
    fn test_kind_from_param() {
        assert_eq!(ArchiveKind::from_param(None).unwrap(), ArchiveKind::Zip);
        assert_eq!(ArchiveKind::from_param(Some("  ")).unwrap(), ArchiveKind::Zip);
        assert_eq!(ArchiveKind::from_param(Some("TAR")).unwrap(), ArchiveKind::Tar);
        assert!(ArchiveKind::from_param(Some("rar")).is_err());
    }

    #[test]
    fn test_zip_finds_nested_payload_case_insensitively() {
        let bytes = zip_of(&[
            ("readme.txt", b"hello"),
            ("export/DATA.CSV", b"id,name\n1,x\n"),
        ]);
        let payload = unwrap_payload(&bytes, ArchiveKind::Zip, &limits()).unwrap();
        assert_eq!(payload, b"id,name\n1,x\n");
    }

    #[test]
    fn test_zip_skips_empty_and_directory_entries() {
        let bytes = zip_of(&[
            ("data.csv/", b""),
            ("empty/data.csv", b""),
            ("real/data.csv", b"payload"),
            ("later/data.csv", b"ignored"),
        ]);
        let payload = unwrap_payload(&bytes, ArchiveKind::Zip, &limits()).unwrap();
        assert_eq!(payload, b"payload");
    }

    #[test]
    fn test_zip_without_payload() {
        let bytes = zip_of(&[("prices.csv", b"1,2,3")]);
        let err = unwrap_payload(&bytes, ArchiveKind::Zip, &limits()).unwrap_err();
        assert!(matches!(err, IngestError::PayloadNotFound("data.csv")));
    }

    #[test]
    fn test_garbage_is_archive_format_error() {
        let garbage = vec![b'x'; 2048];
        assert!(matches!(
            unwrap_payload(&garbage, ArchiveKind::Zip, &limits()),
            Err(IngestError::ArchiveFormat(_))
        ));
        assert!(matches!(
            unwrap_payload(&garbage, ArchiveKind::Tar, &limits()),
            Err(IngestError::ArchiveFormat(_))
        ));
    }

    #[test]
    fn test_zip_declared_as_tar_fails() {
        let bytes = zip_of(&[("data.csv", b"a,b,c,d,e\n")]);
        assert!(unwrap_payload(&bytes, ArchiveKind::Tar, &limits()).is_err());
    }

    #[test]
    fn test_tar_finds_payload() {
        let bytes = tar_of(&[
            ("dir/", b""),
            ("dir/notes.txt", b"n"),
            ("dir/data.csv", b"header\nrow\n"),
        ]);
        let payload = unwrap_payload(&bytes, ArchiveKind::Tar, &limits()).unwrap();
        assert_eq!(payload, b"header\nrow\n");
    }

    #[test]
    fn test_tar_skips_zero_length_payload() {
        let bytes = tar_of(&[("data.csv", b""), ("nested/Data.csv", b"x")]);
        let payload = unwrap_payload(&bytes, ArchiveKind::Tar, &limits()).unwrap();
        assert_eq!(payload, b"x");
    }

    #[test]
    fn test_tar_without_payload() {
        let bytes = tar_of(&[("data.csv.bak", b"x")]);
        assert!(matches!(
            unwrap_payload(&bytes, ArchiveKind::Tar, &limits()),
            Err(IngestError::PayloadNotFound(_))
        ));
    }

    #[test]
    fn test_archive_ceiling_checked_first() {
        let tight = IngestLimits {
            max_archive_bytes: 16,
            ..IngestLimits::default()
        };
        let bytes = vec![0u8; 17];
        assert!(matches!(
            unwrap_payload(&bytes, ArchiveKind::Zip, &tight),
            Err(IngestError::ArchiveTooLarge { limit: 16 })
        ));
    }

    #[test]
    fn test_payload_ceiling() {
        let tight = IngestLimits {
            max_payload_bytes: 4,
            ..IngestLimits::default()
        };
        let bytes = zip_of(&[("data.csv", b"12345")]);
        assert!(matches!(
            unwrap_payload(&bytes, ArchiveKind::Zip, &tight),
            Err(IngestError::PayloadTooLarge { limit: 4 })
        ));
    }
}
