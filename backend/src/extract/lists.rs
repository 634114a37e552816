//! Per-edition lists.
//!
//! Identifiers, editors, edition notes and license texts are scraped as four
//! independent sequences. The Nth entry of each belongs to the Nth edition;
//! a short list leaves later editions without that field. Every occurrence
//! of a label takes a slot, even when its value is empty.

use once_cell::sync::Lazy;
use regex::Regex;

use super::fields::{first_value, joined_value};
use super::{FieldLabel, LabelIndex};
use crate::api::logs::log_warning;
use crate::error::{ImportError, ImportOutcome};
use crate::models::{EditionIndex, EditionMetadata, ImportWarning};
use crate::parser::PageTree;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digits pattern"));

/// The four per-edition sequences of a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditionLists {
    /// Edition identifiers in document order; the authoritative edition order.
    pub identifiers: Vec<String>,
    pub editors: Vec<Option<String>>,
    pub edition_notes: Vec<Option<String>>,
    pub licenses: Vec<Option<String>>,
}

/// Scrape the per-edition lists.
pub fn extract_lists(tree: &PageTree, labels: &LabelIndex) -> EditionLists {
    let identifiers = tree
        .elements("font")
        .map(|id| tree.text(id))
        .filter(|caption| !caption.is_empty())
        .map(|caption| identifier_token(&caption))
        .collect();

    let every = |label: FieldLabel, read: fn(&PageTree, usize) -> Option<String>| {
        labels.all(label).map(|id| read(tree, id)).collect::<Vec<_>>()
    };

    EditionLists {
        identifiers,
        editors: every(FieldLabel::Editor, first_value),
        edition_notes: every(FieldLabel::EditionNotes, joined_value),
        licenses: every(FieldLabel::Copyright, first_value),
    }
}

/// Catalogue number inside a caption ("CPDL #28188:" -> "28188").
fn identifier_token(caption: &str) -> String {
    DIGITS
        .find(caption)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| caption.trim().to_string())
}

impl EditionLists {
    /// Metadata of the edition at `index`. Never reads another index.
    pub fn metadata_at(&self, index: EditionIndex) -> EditionMetadata {
        let i = index.get();
        EditionMetadata {
            identifier: self.identifiers.get(i).cloned(),
            editor: self.editors.get(i).cloned().flatten(),
            edition_notes: self.edition_notes.get(i).cloned().flatten(),
            license: self.licenses.get(i).cloned().flatten(),
        }
    }

    fn lengths(&self) -> [(&'static str, usize); 4] {
        [
            ("identifiers", self.identifiers.len()),
            ("editors", self.editors.len()),
            ("editionNotes", self.edition_notes.len()),
            ("licenses", self.licenses.len()),
        ]
    }

    /// Check that the lists can be joined with `editions` edition groups
    /// built from `media_files` manifest entries.
    ///
    /// Media files without any identifier cannot be aligned and fail the
    /// import. Lists longer than the edition count are reported, not trimmed.
    pub fn check_alignment(
        &self,
        editions: usize,
        media_files: usize,
    ) -> ImportOutcome<Vec<ImportWarning>> {
        if self.identifiers.is_empty() && media_files > 0 {
            return Err(ImportError::DataInconsistency(format!(
                "{} media files but no edition identifiers",
                media_files
            )));
        }

        let mut warnings = Vec::new();

        if editions == 0 {
            if !self.identifiers.is_empty() {
                warnings.push(ImportWarning::IdentifiersWithoutFiles {
                    identifiers: self.identifiers.len(),
                });
            }
        } else {
            for (list, entries) in self.lengths() {
                if entries <= editions {
                    continue;
                }
                warnings.push(ImportWarning::SurplusListEntries {
                    list: list.to_string(),
                    entries,
                    editions,
                });
            }
        }

        for warning in &warnings {
            log_warning(warning.to_string());
        }

        Ok(warnings)
    }
}
