pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{UploadPricesCommand, UploadPricesError, UploadPricesResponse};

pub use queries::{ExportPricesError, ExportPricesQuery, ExportPricesResponse};

pub use routes::prices_routes;
