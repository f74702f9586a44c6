//! Pricekeep Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, money handling, and logging for the Pricekeep workspace.
//!
//! # Overview
//!
//! - **Types**: canonical price records and the identity key used for deduplication
//! - **Money**: exact conversion between price text and integer minor units
//! - **Logging**: `tracing` subscriber bootstrap shared by every binary
//! - **Error Handling**: common error and result types
//!
//! # Example
//!
//! ```
//! use pricekeep_common::money::{format_minor_units, parse_minor_units};
//!
//! let cents = parse_minor_units("12,50").unwrap();
//! assert_eq!(cents, 1250);
//! assert_eq!(format_minor_units(cents), "12.50");
//! ```

pub mod error;
pub mod logging;
pub mod money;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
pub use types::{CanonicalRecord, IdentityKey, PersistedRecord};
