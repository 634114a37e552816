//! REST API types.
//!
//! The import result is returned as-is under `result`; the envelope adds a
//! job id, a coarse status and summary counts.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::ImportOptions;
use crate::error::ImportError;
use crate::models::ImportResult;
use crate::resolve::SearchHit;

/// Coarse outcome of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    /// Every file has a URL and nothing was reported.
    Ready,
    /// Imported, with warnings or unresolved files.
    Warning,
    /// The page has no sheet music yet.
    Empty,
}

impl ImportStatus {
    pub fn of(result: &ImportResult) -> Self {
        if result.is_empty() {
            ImportStatus::Empty
        } else if result.warnings.is_empty() && result.resolution_gaps == 0 {
            ImportStatus::Ready
        } else {
            ImportStatus::Warning
        }
    }
}

/// Response sent after an import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    /// Unique job identifier
    pub job_id: String,
    pub status: ImportStatus,
    /// Shown to end users when there is nothing to import
    pub message: Option<String>,
    /// The normalized record graph
    pub result: ImportResult,
    pub metadata: ResponseMetadata,
}

/// Summary counts of an import
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub edition_count: usize,
    pub file_count: usize,
    pub resolution_gaps: usize,
    pub warning_count: usize,
    /// RFC 3339 timestamp
    pub imported_at: String,
}

/// Message for a page without sheet music.
pub const EMPTY_MESSAGE: &str = "no sheet music available yet";

impl From<ImportResult> for ImportResponse {
    fn from(result: ImportResult) -> Self {
        let status = ImportStatus::of(&result);
        ImportResponse {
            job_id: Uuid::new_v4().to_string(),
            status,
            message: (status == ImportStatus::Empty).then(|| EMPTY_MESSAGE.to_string()),
            metadata: ResponseMetadata {
                edition_count: result.editions.len(),
                file_count: result.file_count(),
                resolution_gaps: result.resolution_gaps,
                warning_count: result.warnings.len(),
                imported_at: chrono::Utc::now().to_rfc3339(),
            },
            result,
        }
    }
}

/// Query parameters of the import endpoints.
///
/// Unset fields fall back to [`ImportOptions::default`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportParams {
    pub offline: Option<bool>,
    pub skip_validation: Option<bool>,
    pub furniture_count: Option<usize>,
    pub primary_extension: Option<String>,
}

impl ImportParams {
    pub fn apply(self, mut options: ImportOptions) -> ImportOptions {
        if let Some(offline) = self.offline {
            options.offline = offline;
        }
        if let Some(skip) = self.skip_validation {
            options.skip_validation = skip;
        }
        if let Some(count) = self.furniture_count {
            options.furniture_count = count;
        }
        if let Some(ext) = self.primary_extension {
            options.primary_extension = ext;
        }
        options
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
}

/// Create an error response
pub fn error_response(error: &str, message: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "message": message,
        "result": null
    })
}

/// Error body for a failed import; `message` is safe to show to end users.
pub fn import_error_response(error: &ImportError) -> Value {
    error_response(&error.to_string(), error.user_message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Edition, EditionIndex, EditionMetadata, FileType, ImportWarning, ResolvedFile, WorkRecord};

    fn result_with(url: Option<&str>, warnings: Vec<ImportWarning>) -> ImportResult {
        ImportResult {
            work: WorkRecord::new("Ecco"),
            editions: vec![Edition {
                index: EditionIndex(0),
                metadata: EditionMetadata::default(),
                primary: ResolvedFile {
                    edition: EditionIndex(0),
                    name: "A.pdf".into(),
                    file_type: FileType::from_name("A.pdf"),
                    url: url.map(String::from),
                },
                files: vec![],
            }],
            resolution_gaps: usize::from(url.is_none()),
            warnings,
        }
    }

    #[test]
    fn test_status() {
        assert_eq!(ImportStatus::of(&result_with(Some("https://x/A.pdf"), vec![])), ImportStatus::Ready);
        assert_eq!(ImportStatus::of(&result_with(None, vec![])), ImportStatus::Warning);

        let empty = ImportResult {
            work: WorkRecord::new("Ecco"),
            editions: vec![],
            resolution_gaps: 0,
            warnings: vec![],
        };
        assert_eq!(ImportStatus::of(&empty), ImportStatus::Empty);

        let response = ImportResponse::from(empty);
        assert_eq!(response.message.as_deref(), Some("no sheet music available yet"));
    }

    #[test]
    fn test_response_metadata() {
        let response = ImportResponse::from(result_with(Some("https://x/A.pdf"), vec![]));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "ready");
        assert!(json["message"].is_null());
        assert_eq!(json["metadata"]["editionCount"], 1);
        assert_eq!(json["metadata"]["fileCount"], 1);
        assert_eq!(json["result"]["work"]["title"], "Ecco");
        assert!(Uuid::parse_str(&response.job_id).is_ok());
    }

    #[test]
    fn test_params_override_defaults() {
        let params = ImportParams {
            offline: Some(true),
            primary_extension: Some("PDF".into()),
            ..Default::default()
        };
        let options = params.apply(ImportOptions::default());
        assert!(options.offline);
        assert_eq!(options.primary_extension, "PDF");
        assert_eq!(options.furniture_count, 2);
    }

    #[test]
    fn test_import_error_response_hides_details() {
        let err = ImportError::DataInconsistency("3 media files but no edition identifiers".into());
        let body = import_error_response(&err);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "could not import this page");
        assert!(body["error"].as_str().unwrap().contains("3 media files"));
    }
}
