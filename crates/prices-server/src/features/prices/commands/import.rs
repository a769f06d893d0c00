use serde::{Deserialize, Serialize};

use crate::ingest::{IngestError, IngestPipeline};
use crate::models::Summary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPricesCommand {
    /// Raw ZIP archive holding the price table
    #[serde(skip)]
    pub content: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportPricesError {
    #[error("Content is required and cannot be empty")]
    ContentRequired,
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl ImportPricesCommand {
    pub fn validate(&self) -> Result<(), ImportPricesError> {
        if self.content.is_empty() {
            return Err(ImportPricesError::ContentRequired);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(pipeline, command), fields(bytes = command.content.len()))]
pub async fn handle(
    pipeline: &IngestPipeline,
    command: ImportPricesCommand,
) -> Result<Summary, ImportPricesError> {
    command.validate()?;

    let summary = pipeline.ingest_archive(&command.content).await?;

    Ok(summary)
}
