//! High-level import API: one page in, one normalized record graph out.
//!
//! The pipeline runs in two phases:
//! 1. Extraction (synchronous): markup → work record, per-edition lists,
//!    edition groups
//! 2. Resolution (asynchronous): one batched resolver call, then the
//!    index-keyed join into editions
//!
//! Nothing is shared between calls; two pages can be imported concurrently.
//!
//! # Example
//!
//! ```rust,ignore
//! use cpdl_ingest::{import_json, ImportOptions, MediaWikiClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MediaWikiClient::from_env()?;
//!     let envelope = client.fetch_page(3788).await?;
//!     let result = import_json(&envelope, &client, &ImportOptions::default()).await?;
//!     println!("Imported {} editions", result.editions.len());
//!     Ok(())
//! }
//! ```

use std::path::Path;

use super::correlate::correlate;
use super::partition::partition_manifest;
use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::config::ImportOptions;
use crate::error::{EnvelopeError, ImportOutcome};
use crate::extract::{extract_lists, extract_work, EditionLists, LabelIndex};
use crate::models::{EditionGroup, ImportResult, ImportWarning, WorkRecord};
use crate::parser::PageDocument;
use crate::resolve::{ResolvedUrls, UrlResolutionAdapter, UrlResolver};
use crate::validation::validate_import_result;

/// Everything read from a page before any URL is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPage {
    pub work: WorkRecord,
    pub lists: EditionLists,
    pub groups: Vec<EditionGroup>,
    /// Manifest entries after the page furniture.
    pub media_files: Vec<String>,
    pub warnings: Vec<ImportWarning>,
}

/// Run the extraction phase.
///
/// Fails when a labeled value is malformed or when media files cannot be
/// aligned with any edition identifier.
pub fn extract_page(doc: &PageDocument, options: &ImportOptions) -> ImportOutcome<ExtractedPage> {
    log_info(format!("📖 Reading page \"{}\"...", doc.title));
    let tree = doc.tree();
    let labels = LabelIndex::build(&tree);

    let work = extract_work(doc, &tree, &labels)?;
    log_success(format!(
        "Work: {} ({})",
        work.title,
        work.composer.as_deref().unwrap_or("unknown composer")
    ));

    let lists = extract_lists(&tree, &labels);
    let media_files = doc.media_files(options.furniture_count).to_vec();
    let groups = partition_manifest(&media_files, &options.primary_extension);
    log_info(format!(
        "📦 {} media files in {} editions, {} identifiers",
        media_files.len(),
        groups.len(),
        lists.identifiers.len()
    ));

    let warnings = lists.check_alignment(groups.len(), media_files.len())?;

    Ok(ExtractedPage {
        work,
        lists,
        groups,
        media_files,
        warnings,
    })
}

/// Import one page.
///
/// A page without media files yields a result with no editions and makes
/// no resolver call.
pub async fn import_page<R: UrlResolver + ?Sized>(
    doc: &PageDocument,
    resolver: &R,
    options: &ImportOptions,
) -> ImportOutcome<ImportResult> {
    let extracted = extract_page(doc, options)?;

    let urls = if options.offline {
        log_info("(URL resolution skipped)");
        ResolvedUrls::unresolved(&extracted.media_files)
    } else {
        UrlResolutionAdapter::new(resolver, &options.namespace)
            .resolve(&extracted.media_files)
            .await?
    };

    let correlation = correlate(&extracted.groups, &extracted.lists, &urls);

    let mut warnings = extracted.warnings;
    warnings.extend(correlation.warnings);

    let result = ImportResult {
        work: extracted.work,
        editions: correlation.editions,
        resolution_gaps: correlation.resolution_gaps,
        warnings,
    };

    if result.is_empty() {
        log_warning("No sheet music attached to this page yet");
    } else {
        log_success(format!(
            "{} editions, {} files, {} without URL",
            result.editions.len(),
            result.file_count(),
            result.resolution_gaps
        ));
    }

    if !options.skip_validation {
        check_schema(&result);
    }

    Ok(result)
}

/// Import a page from its JSON envelope.
pub async fn import_json<R: UrlResolver + ?Sized>(
    json: &str,
    resolver: &R,
    options: &ImportOptions,
) -> ImportOutcome<ImportResult> {
    let doc = PageDocument::from_json(json)?;
    import_page(&doc, resolver, options).await
}

/// Import a page from an envelope file on disk.
pub async fn import_file<R: UrlResolver + ?Sized>(
    path: &Path,
    resolver: &R,
    options: &ImportOptions,
) -> ImportOutcome<ImportResult> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(EnvelopeError::Io)?;
    import_json(&json, resolver, options).await
}

/// Log schema violations. They never fail the import.
fn check_schema(result: &ImportResult) {
    log_info("✔️  Validating result...");
    match validate_import_result(result) {
        Ok(()) => log_success("Result matches the import schema"),
        Err(errors) => {
            for error in errors.iter().take(3) {
                log_error(error.clone());
            }
            log_warning(format!("{} schema violations", errors.len()));
        }
    }
}
