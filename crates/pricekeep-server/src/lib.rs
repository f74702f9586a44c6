//! Pricekeep Server Library
//!
//! HTTP service that ingests archived price lists and exports them again.
//!
//! # Overview
//!
//! - **Upload**: `POST /api/v0/prices` takes a zip or tar archive holding
//!   `data.csv`, validates and deduplicates its rows, and commits the novel
//!   ones atomically
//! - **Export**: `GET /api/v0/prices` returns persisted rows inside optional
//!   date and price bounds as a `data.csv` archive
//! - **Health**: `GET /health` pings the store
//!
//! # Architecture
//!
//! Ingestion is a sequential fold (`ingest`) that never touches shared state.
//! The only shared state is behind the [`db::PriceStore`] trait, passed to
//! handlers as an explicit handle: PostgreSQL in production, an in-memory
//! store in tests.
//!
//! ## Framework Stack
//!
//! - **Axum**: HTTP routing and extraction
//! - **SQLx**: PostgreSQL access and migrations
//! - **Tower**: middleware and service abstractions
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pricekeep_server::{api, config::Config, db::MemoryPriceStore};
//!
//! let config = Config::default();
//! let app = api::create_router(Arc::new(MemoryPriceStore::new()), &config);
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod models;
pub mod shutdown;

// Re-export commonly used types
pub use db::{PriceStore, SharedStore};
pub use error::AppError;
