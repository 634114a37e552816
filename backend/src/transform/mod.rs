//! Transformation module.
//!
//! This module turns an extracted page into the normalized record graph:
//! - Partition: flat manifest to edition groups
//! - Correlate: groups + per-edition lists + URLs to editions
//! - Pipeline: the end-to-end import

pub mod correlate;
pub mod partition;
pub mod pipeline;

pub use correlate::{correlate, Correlation};
pub use partition::partition_manifest;
pub use pipeline::*;
