//! # cpdl-ingest - Choral catalogue page import
//!
//! Turns one rendered catalogue page (title, markup, attached file names)
//! into a normalized record graph: one work, its editions, and every edition
//! file with a resolved download URL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Envelope   │────▶│   Extract   │────▶│   Resolve   │────▶│ ImportResult│
//! │ (parse API) │     │ (labels +   │     │ (1 batched  │     │ (work +     │
//! │             │     │  manifest)  │     │  call)      │     │  editions)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cpdl_ingest::{import_file, ImportOptions, MediaWikiClient};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = MediaWikiClient::from_env().unwrap();
//!     let result = import_file(Path::new("page.json"), &client, &ImportOptions::default())
//!         .await
//!         .unwrap();
//!     println!("Imported {} editions", result.editions.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Settings and per-import options
//! - [`models`] - Domain records (WorkRecord, Edition, ResolvedFile)
//! - [`parser`] - Envelope decoding and the markup tree
//! - [`extract`] - Labeled facts and per-edition lists
//! - [`transform`] - Manifest partitioning, correlation and the pipeline
//! - [`resolve`] - URL resolution and the wiki client
//! - [`cache`] - Resolved URL cache
//! - [`validation`] - Schema validation of results
//! - [`export`] - CSV file table
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod extract;
pub mod parser;

// Transformation
pub mod transform;

// Resolution
pub mod cache;
pub mod resolve;

// Output
pub mod export;
pub mod validation;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    CacheError, EnvelopeError, ExtractError, ImportError, ResolveError, ServerError,
};

// =============================================================================
// Re-exports - Config and models
// =============================================================================

pub use config::{ImportOptions, Settings};

pub use models::{
    Edition, EditionGroup, EditionIndex, EditionMetadata, FileType, ImportResult, ImportWarning,
    ManifestEntry, ResolvedFile, WorkRecord,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use parser::PageDocument;

pub use transform::{
    correlate, extract_page, import_file, import_json, import_page, partition_manifest,
    ExtractedPage,
};

// =============================================================================
// Re-exports - Resolution
// =============================================================================

pub use cache::{CachingResolver, UrlCache};
pub use resolve::{MediaWikiClient, ResolvedUrls, SearchHit, UrlResolutionAdapter, UrlResolver};

// =============================================================================
// Re-exports - Output
// =============================================================================

pub use export::write_files_csv;
pub use validation::{validate_import_json, validate_import_result};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
