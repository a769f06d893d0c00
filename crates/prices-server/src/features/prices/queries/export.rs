use serde::{Deserialize, Serialize};

use crate::db::PriceStore;
use crate::export::{self, ExportError};
use crate::ingest::ColumnLayout;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExportPricesQuery {
    pub layout: ColumnLayout,
}

#[derive(Debug, Clone)]
pub struct ExportPricesResponse {
    pub archive: Vec<u8>,
    pub rows: usize,
    pub filename: &'static str,
}

#[tracing::instrument(skip(store))]
pub async fn handle(
    store: &dyn PriceStore,
    query: ExportPricesQuery,
) -> Result<ExportPricesResponse, ExportError> {
    let exported = export::export_archive(store, query.layout).await?;

    Ok(ExportPricesResponse {
        archive: exported.bytes,
        rows: exported.rows,
        filename: export::DOWNLOAD_FILE_NAME,
    })
}
