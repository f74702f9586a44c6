pub mod upload;

pub use upload::{UploadPricesCommand, UploadPricesError, UploadPricesResponse};
