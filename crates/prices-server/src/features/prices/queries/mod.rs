pub mod export;

pub use export::{ExportPricesQuery, ExportPricesResponse};
