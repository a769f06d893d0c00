//! Ingest coordinator
//!
//! Runs the records of one parsed table through validation and a single
//! store transaction, and accumulates the [`Summary`] of accepted rows.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{archive, parser, validator, ColumnLayout, DateFormats, HeaderDetection, IngestError, ParsedTable};
use crate::db::{PriceBatch, PriceStore};
use crate::models::{Summary, SummaryBuilder};

/// What happens when the store refuses one accepted row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertFailurePolicy {
    /// Leave the row out and keep the transaction going
    #[default]
    Skip,
    /// Roll back the whole call
    Abort,
}

impl std::str::FromStr for InsertFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(InsertFailurePolicy::Skip),
            "abort" => Ok(InsertFailurePolicy::Abort),
            _ => Err(anyhow::anyhow!("Invalid insert failure policy: {}", s)),
        }
    }
}

/// What happens when no row survives validation and insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyBatchPolicy {
    /// Fail with [`IngestError::NoValidRows`]
    #[default]
    Reject,
    /// Commit nothing and return a zero summary
    Allow,
}

impl std::str::FromStr for EmptyBatchPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(EmptyBatchPolicy::Reject),
            "allow" => Ok(EmptyBatchPolicy::Allow),
            _ => Err(anyhow::anyhow!("Invalid empty batch policy: {}", s)),
        }
    }
}

/// Deployment-wide import behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IngestSettings {
    pub layout: ColumnLayout,
    pub header_detection: HeaderDetection,
    pub dates: DateFormats,
    pub insert_failure: InsertFailurePolicy,
    pub empty_batch: EmptyBatchPolicy,
}

/// Counters for one ingest call. Only the summary leaves the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub summary: Summary,
    /// Records dropped by validation
    pub skipped_invalid: u64,
    /// Valid rows the store refused
    pub skipped_rejected: u64,
}

impl IngestReport {
    pub fn skipped(&self) -> u64 {
        self.skipped_invalid + self.skipped_rejected
    }
}

#[derive(Clone)]
pub struct IngestPipeline {
    store: Arc<dyn PriceStore>,
    settings: IngestSettings,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn PriceStore>, settings: IngestSettings) -> Self {
        if settings.layout == ColumnLayout::Heuristic {
            warn!("Heuristic column layout enabled; records may be misclassified");
        }
        Self { store, settings }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Locate, parse and ingest the table file of an uploaded archive
    pub async fn ingest_archive(&self, bytes: &[u8]) -> Result<Summary, IngestError> {
        let table = archive::locate(bytes)?;
        let parsed = parser::parse(&table, self.settings.layout, self.settings.header_detection)?;
        self.ingest(&parsed).await
    }

    pub async fn ingest(&self, table: &ParsedTable) -> Result<Summary, IngestError> {
        self.ingest_with_report(table).await.map(|report| report.summary)
    }

    /// Insert every valid record of `table` in one transaction
    ///
    /// Nothing from this call is visible unless it returns `Ok`.
    #[tracing::instrument(skip(self, table), fields(records = table.data_records().len()))]
    pub async fn ingest_with_report(&self, table: &ParsedTable) -> Result<IngestReport, IngestError> {
        let mut batch = self.store.begin().await?;

        let mut builder = SummaryBuilder::new();
        let mut skipped_invalid = 0u64;
        let mut skipped_rejected = 0u64;

        for (offset, record) in table.data_records().iter().enumerate() {
            let line = table.data_start + offset + 1;

            let Some(row) = validator::validate(record, self.settings.layout, self.settings.dates)
            else {
                debug!(line, fields = record.len(), "Skipping invalid record");
                skipped_invalid += 1;
                continue;
            };

            if let Err(e) = batch.insert(&row).await {
                match self.settings.insert_failure {
                    InsertFailurePolicy::Skip => {
                        warn!(line, error = %e, "Insert failed, skipping row");
                        skipped_rejected += 1;
                        continue;
                    },
                    InsertFailurePolicy::Abort => {
                        warn!(line, error = %e, "Insert failed, aborting import");
                        discard(batch).await;
                        return Err(e.into());
                    },
                }
            }

            builder.accept(&row);
        }

        if builder.items() == 0 && self.settings.empty_batch == EmptyBatchPolicy::Reject {
            info!(skipped_invalid, skipped_rejected, "No valid rows to insert");
            discard(batch).await;
            return Err(IngestError::NoValidRows);
        }

        batch.commit().await?;

        let report = IngestReport {
            summary: builder.finish(),
            skipped_invalid,
            skipped_rejected,
        };
        info!(
            items = report.summary.total_items,
            categories = report.summary.total_categories,
            total_price = %report.summary.total_price,
            skipped = report.skipped(),
            "Import committed"
        );
        Ok(report)
    }
}

async fn discard(batch: Box<dyn PriceBatch>) {
    if let Err(e) = batch.rollback().await {
        warn!(error = %e, "Rollback failed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::db::MemoryPriceStore;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    const HEADER: &str = "id,name,category,price,create_date\n";

    fn table(body: &str) -> ParsedTable {
        parser::parse(body.as_bytes(), ColumnLayout::Full, HeaderDetection::FirstField).unwrap()
    }

    fn pipeline(store: &MemoryPriceStore, settings: IngestSettings) -> IngestPipeline {
        IngestPipeline::new(Arc::new(store.clone()), settings)
    }

    fn decimal(text: &str) -> BigDecimal {
        BigDecimal::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_two_valid_rows() {
        let store = MemoryPriceStore::new();
        let body = format!(
            "{}1,Widget,Tools,9.99,2024-01-15\n2,Gadget,Tools,4.50,2024-02-20\n",
            HEADER
        );

        let summary = pipeline(&store, IngestSettings::default())
            .ingest(&table(&body))
            .await
            .unwrap();

        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.total_categories, 1);
        assert_eq!(summary.total_price, decimal("14.49"));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_bad_price_is_skipped() {
        let store = MemoryPriceStore::new();
        let body = format!(
            "{}1,Widget,Tools,9.99,2024-01-15\n2,Gadget,Tools,abc,2024-02-20\n",
            HEADER
        );

        let report = pipeline(&store, IngestSettings::default())
            .ingest_with_report(&table(&body))
            .await
            .unwrap();

        assert_eq!(report.summary.total_items, 1);
        assert_eq!(report.summary.total_categories, 1);
        assert_eq!(report.summary.total_price, decimal("9.99"));
        assert_eq!(report.skipped_invalid, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_insert_failure_skip_keeps_other_rows() {
        let store = MemoryPriceStore::with_rejected_names(["Gadget"]);
        let body = format!(
            "{}1,Widget,Tools,9.99,2024-01-15\n2,Gadget,Garden,4.50,2024-02-20\n",
            HEADER
        );

        let report = pipeline(&store, IngestSettings::default())
            .ingest_with_report(&table(&body))
            .await
            .unwrap();

        assert_eq!(report.summary.total_items, 1);
        assert_eq!(report.summary.total_categories, 1);
        assert_eq!(report.skipped_rejected, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_insert_failure_abort_rolls_back() {
        let store = MemoryPriceStore::with_rejected_names(["Gadget"]);
        let settings = IngestSettings {
            insert_failure: InsertFailurePolicy::Abort,
            ..IngestSettings::default()
        };
        let body = format!(
            "{}1,Widget,Tools,9.99,2024-01-15\n2,Gadget,Garden,4.50,2024-02-20\n",
            HEADER
        );

        let result = pipeline(&store, settings).ingest(&table(&body)).await;

        assert!(matches!(result, Err(IngestError::Database(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected_by_default() {
        let store = MemoryPriceStore::new();
        let body = format!("{}1,Widget,Tools,oops,2024-01-15\n", HEADER);

        let result = pipeline(&store, IngestSettings::default()).ingest(&table(&body)).await;

        assert!(matches!(result, Err(IngestError::NoValidRows)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_batch_allowed_returns_zero_summary() {
        let store = MemoryPriceStore::new();
        let settings = IngestSettings {
            empty_batch: EmptyBatchPolicy::Allow,
            ..IngestSettings::default()
        };

        let summary = pipeline(&store, settings).ingest(&table(HEADER)).await.unwrap();

        assert_eq!(summary.total_items, 0);
        assert_eq!(summary.total_categories, 0);
        assert_eq!(summary.total_price, BigDecimal::from(0));
    }

    #[tokio::test]
    async fn test_commit_failure_leaves_store_unchanged() {
        let store = MemoryPriceStore::new();
        store.fail_commit(true);
        let body = format!("{}1,Widget,Tools,9.99,2024-01-15\n", HEADER);

        let result = pipeline(&store, IngestSettings::default()).ingest(&table(&body)).await;

        assert!(matches!(result, Err(IngestError::Database(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_begin_failure_is_database_error() {
        let store = MemoryPriceStore::new();
        store.fail_begin(true);
        let body = format!("{}1,Widget,Tools,9.99,2024-01-15\n", HEADER);

        let result = pipeline(&store, IngestSettings::default()).ingest(&table(&body)).await;

        assert!(matches!(result, Err(IngestError::Database(_))));
    }

    #[tokio::test]
    async fn test_ingest_archive_runs_every_stage() {
        let store = MemoryPriceStore::new();
        let body = format!("{}1,Widget,Tools,9.99,2024-01-15\n", HEADER);
        let zip = archive::write_single_entry("nested/data.csv", body.as_bytes()).unwrap();

        let summary = pipeline(&store, IngestSettings::default())
            .ingest_archive(&zip)
            .await
            .unwrap();

        assert_eq!(summary.total_items, 1);
        let rows = store.fetch_all().await.unwrap();
        assert_eq!(rows[0].product_id, Some(1));
        assert_eq!(rows[0].name, "Widget");
    }

    #[tokio::test]
    async fn test_ingest_archive_propagates_locator_errors() {
        let store = MemoryPriceStore::new();
        let zip = archive::write_single_entry("prices.csv", b"x").unwrap();

        let result = pipeline(&store, IngestSettings::default()).ingest_archive(&zip).await;

        assert!(matches!(result, Err(IngestError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_no_id_layout_with_marker_header() {
        let store = MemoryPriceStore::new();
        let settings = IngestSettings {
            layout: ColumnLayout::NoId,
            header_detection: HeaderDetection::Markers,
            ..IngestSettings::default()
        };
        let body = "name,category,price,create_date\nWidget,Tools,9.99,2024-01-15\n";
        let parsed = parser::parse(body.as_bytes(), settings.layout, settings.header_detection)
            .unwrap();

        let summary = pipeline(&store, settings).ingest(&parsed).await.unwrap();

        assert_eq!(summary.total_items, 1);
        assert_eq!(store.fetch_all().await.unwrap()[0].product_id, None);
    }

    #[test]
    fn test_policies_from_str() {
        assert_eq!("ABORT".parse::<InsertFailurePolicy>().unwrap(), InsertFailurePolicy::Abort);
        assert_eq!("skip".parse::<InsertFailurePolicy>().unwrap(), InsertFailurePolicy::Skip);
        assert_eq!("allow".parse::<EmptyBatchPolicy>().unwrap(), EmptyBatchPolicy::Allow);
        assert!("maybe".parse::<EmptyBatchPolicy>().is_err());
    }
}
