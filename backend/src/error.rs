//! Error types for the CPDL import pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`EnvelopeError`] - The page envelope could not be decoded
//! - [`ExtractError`] - A labeled field has an unexpected shape
//! - [`ResolveError`] - The URL resolver collaborator failed
//! - [`CacheError`] - URL cache I/O errors
//! - [`ImportError`] - Top-level failure of one parse call
//! - [`ServerError`] - HTTP surface errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Resolution gaps are not errors: they travel as warnings on the
//! successful [`crate::models::ImportResult`].

use thiserror::Error;

// =============================================================================
// Envelope Errors
// =============================================================================

/// Errors while decoding the page envelope JSON.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Body is not valid JSON or does not have the expected shape.
    #[error("Invalid page envelope: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Failed to read the envelope from disk.
    #[error("Failed to read envelope: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Extraction Errors
// =============================================================================

/// Errors raised by the field and list extractors.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A labeled value does not match its expected shape.
    #[error("Invalid value for '{label}' ('{value}'): {message}")]
    InvalidValue {
        label: String,
        value: String,
        message: String,
    },

    /// The page has no title.
    #[error("Page has no title")]
    MissingTitle,
}

// =============================================================================
// Resolver Errors
// =============================================================================

/// Errors from the URL resolver collaborator.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Non-success status from the wiki API.
    #[error("Wiki API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not have the expected shape.
    #[error("Invalid wiki API response: {0}")]
    InvalidResponse(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for ResolveError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ResolveError::Timeout
        } else if e.is_decode() {
            ResolveError::InvalidResponse(e.to_string())
        } else {
            ResolveError::Http(e.to_string())
        }
    }
}

// =============================================================================
// Cache Errors
// =============================================================================

/// Errors from the URL cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// IO error.
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Cache JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Import Errors (top-level)
// =============================================================================

/// Top-level failure of one page import.
///
/// This is the error type returned by [`crate::transform::pipeline::import_page`].
/// No partial record graph survives an `ImportError`.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Envelope decoding error.
    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// A core fact could not be parsed.
    #[error("Parse error: {0}")]
    Extract(#[from] ExtractError),

    /// Parallel lists cannot be aligned with the file manifest.
    #[error("Data inconsistency: {0}")]
    DataInconsistency(String),

    /// The resolver call failed or timed out.
    #[error("URL resolution failed: {0}")]
    Resolve(#[from] ResolveError),
}

impl ImportError {
    /// Message suitable for end users.
    pub fn user_message(&self) -> &'static str {
        match self {
            ImportError::Resolve(_) => "could not reach the catalogue, try again later",
            _ => "could not import this page",
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Import error.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for envelope decoding.
pub type EnvelopeResult<T> = Result<T, EnvelopeError>;

/// Result type for extraction.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for resolver calls.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type for a whole import.
pub type ImportOutcome<T> = Result<T, ImportError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
