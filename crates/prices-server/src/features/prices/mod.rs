pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{ImportPricesCommand, ImportPricesError};

pub use queries::{ExportPricesQuery, ExportPricesResponse};

pub use routes::prices_routes;
