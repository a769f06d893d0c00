//! Export coordinator
//!
//! Reads every stored row in id order, writes it as CSV in the active
//! column layout and wraps the text as the only entry of a ZIP archive.

use csv::WriterBuilder;
use tracing::info;
use zip::result::ZipError;

use crate::db::{PriceStore, StoreError};
use crate::ingest::{archive, ColumnLayout};
use crate::models::StoredPrice;

/// File name offered to clients downloading an export
pub const DOWNLOAD_FILE_NAME: &str = "data.zip";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Database error: {0}")]
    Database(#[from] StoreError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Archive error: {0}")]
    Archive(#[from] ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A finished export, ready to send
#[derive(Debug, Clone)]
pub struct ExportedArchive {
    pub bytes: Vec<u8>,
    pub rows: usize,
}

/// Two decimal places, e.g. `4.5` becomes `4.50`
fn format_price(row: &StoredPrice) -> String {
    row.price.round(2).with_scale(2).to_string()
}

fn record(row: &StoredPrice, layout: ColumnLayout) -> Vec<String> {
    let mut fields = Vec::with_capacity(layout.columns().len());
    if layout.has_id_column() {
        fields.push(row.id.to_string());
    }
    fields.push(row.name.clone());
    fields.push(row.category.clone());
    fields.push(format_price(row));
    fields.push(row.create_date.format("%Y-%m-%d").to_string());
    fields
}

/// Render rows as CSV text with a header matching `layout`
pub fn serialize_csv(rows: &[StoredPrice], layout: ColumnLayout) -> Result<Vec<u8>, ExportError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(layout.columns())?;
    for row in rows {
        writer.write_record(record(row, layout))?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

#[tracing::instrument(skip(store))]
pub async fn export_archive(
    store: &dyn PriceStore,
    layout: ColumnLayout,
) -> Result<ExportedArchive, ExportError> {
    let rows = store.fetch_all().await?;
    let csv = serialize_csv(&rows, layout)?;
    let bytes = archive::write_single_entry(archive::TABLE_FILE_NAME, &csv)?;

    info!(rows = rows.len(), bytes = bytes.len(), "Export archive built");
    Ok(ExportedArchive {
        bytes,
        rows: rows.len(),
    })
}
