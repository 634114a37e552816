//! Domain models for the CPDL import pipeline.
//!
//! This module contains the records derived from one page:
//!
//! - [`WorkRecord`] - The piece itself (exactly one per page)
//! - [`EditionIndex`] - The positional key joining every per-edition list
//! - [`ManifestEntry`] / [`FileType`] - One attached file name and its type
//! - [`EditionGroup`] - Manifest entries sharing one primary document
//! - [`EditionMetadata`] - Identifier, editor, notes and license of an edition
//! - [`ResolvedFile`] - A file with its download URL (if resolved)
//! - [`Edition`] - Metadata plus files of one edition
//! - [`ImportResult`] - Everything handed to the persistence layer
//!
//! All records are plain values built during one parse call. Optional fields
//! serialize as explicit `null`, never as a missing key.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PROVIDER;

// =============================================================================
// Work
// =============================================================================

/// The piece described by a catalogue page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkRecord {
    /// Page title.
    pub title: String,
    /// Catalogue that the page comes from.
    pub provider: String,
    /// External page identifier, used downstream for deduplication.
    pub page_id: Option<u64>,
    pub composer: Option<String>,
    pub lyricist: Option<String>,
    /// Year taken from the "<year> works" category link.
    pub publication_year: Option<u16>,
    pub original_num_voices: Option<u32>,
    pub original_voicing: Option<String>,
    pub original_instrumentation: Option<String>,
    pub original_language: Option<String>,
    /// Text in the original language.
    pub original_text: Option<String>,
    /// English translation of the text.
    pub translated_text: Option<String>,
    pub description: Option<String>,
    pub genres: Vec<String>,
}

impl WorkRecord {
    /// Create a work with only a title; every other field is absent.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            provider: PROVIDER.to_string(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Cross-reference index
// =============================================================================

/// Position of an edition on the page.
///
/// The only key that joins edition groups, per-edition metadata lists and
/// resolved files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditionIndex(pub usize);

impl EditionIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for EditionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Manifest
// =============================================================================

/// File type, taken from the lowercased extension of the file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileType(String);

impl FileType {
    /// Classify a file name by its extension (empty when there is none).
    pub fn from_name(name: &str) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .unwrap_or_default();
        Self(ext)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive extension comparison.
    pub fn is(&self, extension: &str) -> bool {
        self.0.eq_ignore_ascii_case(extension.trim_start_matches('.'))
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One media file name from the page manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub name: String,
    pub file_type: FileType,
}

impl ManifestEntry {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let file_type = FileType::from_name(&name);
        Self { name, file_type }
    }
}

/// Manifest entries belonging to one edition.
///
/// The primary document always opens the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditionGroup {
    pub index: EditionIndex,
    pub primary: ManifestEntry,
    pub secondary: Vec<ManifestEntry>,
}

impl EditionGroup {
    /// All entries of the group, primary first.
    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        std::iter::once(&self.primary).chain(self.secondary.iter())
    }
}

// =============================================================================
// Editions
// =============================================================================

/// Per-edition facts taken from the parallel lists at one index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditionMetadata {
    /// Catalogue number of the edition (e.g. "28188").
    pub identifier: Option<String>,
    pub editor: Option<String>,
    pub edition_notes: Option<String>,
    /// Copyright / license text.
    pub license: Option<String>,
}

/// A manifest entry with its download URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFile {
    pub edition: EditionIndex,
    pub name: String,
    pub file_type: FileType,
    pub url: Option<String>,
}

/// One published edition of the work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edition {
    pub index: EditionIndex,
    pub metadata: EditionMetadata,
    /// The primary document (score).
    pub primary: ResolvedFile,
    /// Auxiliary files (audio, notation sources, ...).
    pub files: Vec<ResolvedFile>,
}

impl Edition {
    /// Primary and secondary files, primary first.
    pub fn all_files(&self) -> impl Iterator<Item = &ResolvedFile> {
        std::iter::once(&self.primary).chain(self.files.iter())
    }
}

// =============================================================================
// Warnings and result
// =============================================================================

/// Non-fatal diagnostics attached to a successful import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ImportWarning {
    /// The resolver returned no URL for this file.
    UnresolvedFile { name: String },
    /// The same file name appears more than once in the manifest.
    DuplicateFileName { name: String },
    /// Several returned URLs match one file name; the first in sort order won.
    AmbiguousUrl { name: String, candidates: Vec<String> },
    /// A per-edition list has more entries than there are editions.
    SurplusListEntries {
        list: String,
        entries: usize,
        editions: usize,
    },
    /// The page lists edition identifiers but has no media files.
    IdentifiersWithoutFiles { identifiers: usize },
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportWarning::UnresolvedFile { name } => write!(f, "No URL for file '{}'", name),
            ImportWarning::DuplicateFileName { name } => {
                write!(f, "File name '{}' appears more than once", name)
            }
            ImportWarning::AmbiguousUrl { name, candidates } => write!(
                f,
                "{} URLs match '{}', using {}",
                candidates.len(),
                name,
                candidates.first().map(String::as_str).unwrap_or("none")
            ),
            ImportWarning::SurplusListEntries {
                list,
                entries,
                editions,
            } => write!(
                f,
                "List '{}' has {} entries for {} editions",
                list, entries, editions
            ),
            ImportWarning::IdentifiersWithoutFiles { identifiers } => write!(
                f,
                "{} edition identifiers but no media files",
                identifiers
            ),
        }
    }
}

/// The normalized record graph for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub work: WorkRecord,
    /// Editions in manifest order.
    pub editions: Vec<Edition>,
    /// Number of files left without a URL.
    pub resolution_gaps: usize,
    pub warnings: Vec<ImportWarning>,
}

impl ImportResult {
    /// A page with no sheet music attached yet.
    pub fn is_empty(&self) -> bool {
        self.editions.is_empty()
    }

    /// Every resolved file, in manifest order.
    pub fn files(&self) -> impl Iterator<Item = &ResolvedFile> {
        self.editions.iter().flat_map(Edition::all_files)
    }

    pub fn file_count(&self) -> usize {
        self.editions.iter().map(|e| 1 + e.files.len()).sum()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_name() {
        assert_eq!(FileType::from_name("Work-A.pdf").as_str(), "pdf");
        assert_eq!(FileType::from_name("Work-A.MID").as_str(), "mid");
        assert_eq!(FileType::from_name("Gesualdo.Ecco.mxl").as_str(), "mxl");
        assert_eq!(FileType::from_name("README").as_str(), "");
    }

    #[test]
    fn test_file_type_is() {
        let ty = FileType::from_name("Score.PDF");
        assert!(ty.is("pdf"));
        assert!(ty.is(".pdf"));
        assert!(!ty.is("mid"));
    }

    #[test]
    fn test_work_record_serializes_nulls() {
        let work = WorkRecord::new("Ecco, moriro dunque");
        let json = serde_json::to_value(&work).unwrap();
        assert_eq!(json["title"], "Ecco, moriro dunque");
        assert_eq!(json["provider"], "CPDL");
        // absent fields are explicit nulls
        assert!(json.get("composer").is_some());
        assert!(json["composer"].is_null());
        assert!(json["originalNumVoices"].is_null());
        assert_eq!(json["genres"], serde_json::json!([]));
    }

    #[test]
    fn test_edition_group_entries_primary_first() {
        let group = EditionGroup {
            index: EditionIndex(0),
            primary: ManifestEntry::new("A.pdf"),
            secondary: vec![ManifestEntry::new("A.mid"), ManifestEntry::new("A.mxl")],
        };
        let names: Vec<_> = group.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A.pdf", "A.mid", "A.mxl"]);
    }

    #[test]
    fn test_warning_display() {
        let w = ImportWarning::SurplusListEntries {
            list: "editors".into(),
            entries: 3,
            editions: 2,
        };
        assert_eq!(w.to_string(), "List 'editors' has 3 entries for 2 editions");
    }
}
