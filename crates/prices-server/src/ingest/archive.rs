//! ZIP handling for price lists
//!
//! Import side: find the table file in an uploaded archive.
//! Export side: wrap a CSV body as the only entry of a new archive.

use std::io::{Cursor, Read, Write};
use tracing::debug;
use zip::{result::ZipError, write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

use super::IngestError;

/// Canonical name of the table file inside an archive
pub const TABLE_FILE_NAME: &str = "data.csv";

/// Entry names accepted on import, matched against the last path segment
pub const TABLE_FILE_NAMES: &[&str] = &[TABLE_FILE_NAME, "test_data.csv"];

/// Largest decompressed table file accepted on import (256 MiB)
pub const MAX_TABLE_BYTES: u64 = 256 * 1024 * 1024;

/// Final path segment of an archive entry name
fn base_name(entry_name: &str) -> &str {
    entry_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(entry_name)
}

/// Return the contents of the first allow-listed table file in `bytes`
///
/// Entries are scanned in stored order. Matching is exact and
/// case-sensitive on the base name, so `Data.csv` or `prices.csv` do not
/// qualify.
pub fn locate(bytes: &[u8]) -> Result<Vec<u8>, IngestError> {
    locate_with_limit(bytes, MAX_TABLE_BYTES)
}

/// [`locate`] with an explicit cap on the decompressed table size
///
/// The size declared in the archive is never trusted; the entry is read
/// until it ends or passes `limit`.
pub fn locate_with_limit(bytes: &[u8], limit: u64) -> Result<Vec<u8>, IngestError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| IngestError::Format(format!("invalid ZIP archive: {}", e)))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| IngestError::Format(format!("unreadable ZIP entry {}: {}", i, e)))?;

        if entry.is_dir() || !TABLE_FILE_NAMES.contains(&base_name(entry.name())) {
            continue;
        }

        let name = entry.name().to_string();
        let mut contents = Vec::new();
        (&mut entry)
            .take(limit.saturating_add(1))
            .read_to_end(&mut contents)
            .map_err(|e| IngestError::Format(format!("failed to read {}: {}", name, e)))?;
        if contents.len() as u64 > limit {
            return Err(IngestError::Format(format!(
                "{} decompresses to more than {} bytes",
                name, limit
            )));
        }
        debug!(entry = %name, bytes = contents.len(), "Located table file");
        return Ok(contents);
    }

    Err(IngestError::NotFound {
        expected: TABLE_FILE_NAMES.join(", "),
    })
}

/// Build an in-memory archive holding exactly one entry
pub fn write_single_entry(entry_name: &str, contents: &[u8]) -> Result<Vec<u8>, ZipError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(entry_name, options)?;
    writer.write_all(contents)?;
    Ok(writer.finish()?.into_inner())
}
