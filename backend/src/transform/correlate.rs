//! Join edition groups, per-edition lists and resolved URLs.
//!
//! Every piece is keyed by [`EditionIndex`]: group `i` takes the metadata at
//! list position `i` and URLs are looked up by file name, so no step depends
//! on the order in which another step produced its output.

use std::collections::{BTreeSet, HashMap};

use crate::api::logs::log_warning;
use crate::extract::EditionLists;
use crate::models::{Edition, EditionGroup, EditionIndex, ImportWarning, ManifestEntry, ResolvedFile};
use crate::resolve::ResolvedUrls;

/// Editions built from one page, with their diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Correlation {
    pub editions: Vec<Edition>,
    /// Distinct file names left without a URL.
    pub resolution_gaps: usize,
    pub warnings: Vec<ImportWarning>,
}

/// Build one [`Edition`] per group.
pub fn correlate(groups: &[EditionGroup], lists: &EditionLists, urls: &ResolvedUrls) -> Correlation {
    let mut warnings = duplicate_names(groups);

    let editions: Vec<Edition> = groups
        .iter()
        .map(|group| Edition {
            index: group.index,
            metadata: lists.metadata_at(group.index),
            primary: resolve_file(group.index, &group.primary, urls),
            files: group
                .secondary
                .iter()
                .map(|entry| resolve_file(group.index, entry, urls))
                .collect(),
        })
        .collect();

    // one warning per distinct unresolved name, in manifest order
    let mut seen = BTreeSet::new();
    for file in editions.iter().flat_map(Edition::all_files) {
        if file.url.is_none() && seen.insert(file.name.as_str()) {
            warnings.push(ImportWarning::UnresolvedFile {
                name: file.name.clone(),
            });
        }
    }
    let resolution_gaps = seen.len();

    for warning in &warnings {
        log_warning(warning.to_string());
    }
    warnings.extend(urls.warnings.iter().cloned());

    Correlation {
        editions,
        resolution_gaps,
        warnings,
    }
}

fn resolve_file(edition: EditionIndex, entry: &ManifestEntry, urls: &ResolvedUrls) -> ResolvedFile {
    ResolvedFile {
        edition,
        name: entry.name.clone(),
        file_type: entry.file_type.clone(),
        url: urls.url_for(&entry.name).map(String::from),
    }
}

/// Names listed more than once in the manifest, once each.
fn duplicate_names(groups: &[EditionGroup]) -> Vec<ImportWarning> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();
    for entry in groups.iter().flat_map(EditionGroup::entries) {
        let count = counts.entry(entry.name.as_str()).or_insert(0);
        *count += 1;
        if *count == 2 {
            order.push(entry.name.as_str());
        }
    }
    order
        .into_iter()
        .map(|name| ImportWarning::DuplicateFileName {
            name: name.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::partition_manifest;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn slots(list: &[&str]) -> Vec<Option<String>> {
        list.iter().map(|s| Some(s.to_string())).collect()
    }

    fn lists(identifiers: &[&str], editors: &[&str]) -> EditionLists {
        EditionLists {
            identifiers: names(identifiers),
            editors: slots(editors),
            ..Default::default()
        }
    }

    #[test]
    fn test_scenario_c_metadata_by_index() {
        let media = names(&["A.pdf", "A.mid", "B.pdf"]);
        let groups = partition_manifest(&media, "pdf");
        let urls = ResolvedUrls::unresolved(&media);

        let result = correlate(&groups, &lists(&["100", "200"], &["Ed1", "Ed2"]), &urls);

        assert_eq!(result.editions.len(), 2);
        let second = &result.editions[1];
        assert_eq!(second.index, EditionIndex(1));
        assert_eq!(second.metadata.identifier.as_deref(), Some("200"));
        assert_eq!(second.metadata.editor.as_deref(), Some("Ed2"));
        assert_eq!(second.primary.name, "B.pdf");
    }

    #[test]
    fn test_files_carry_their_edition_index() {
        let media = names(&["A.pdf", "A.mid", "A.mxl", "B.pdf", "B.mp3"]);
        let groups = partition_manifest(&media, "pdf");
        let result = correlate(&groups, &lists(&["1", "2"], &[]), &ResolvedUrls::unresolved(&media));

        for edition in &result.editions {
            for file in edition.all_files() {
                assert_eq!(file.edition, edition.index);
            }
        }
        assert_eq!(result.editions[0].files.len(), 2);
        assert_eq!(result.editions[1].files[0].name, "B.mp3");
    }

    #[test]
    fn test_unresolved_files_counted_once() {
        let media = names(&["A.pdf", "A.mid"]);
        let groups = partition_manifest(&media, "pdf");
        let result = correlate(&groups, &lists(&["1"], &[]), &ResolvedUrls::unresolved(&media));

        assert_eq!(result.resolution_gaps, 2);
        let unresolved = result
            .warnings
            .iter()
            .filter(|w| matches!(w, ImportWarning::UnresolvedFile { .. }))
            .count();
        assert_eq!(unresolved, 2);
        assert!(result.editions[0].primary.url.is_none());
    }

    #[test]
    fn test_duplicate_names_warned() {
        let media = names(&["A.pdf", "A.mid", "B.pdf", "A.mid"]);
        let groups = partition_manifest(&media, "pdf");
        let result = correlate(&groups, &lists(&["1", "2"], &[]), &ResolvedUrls::unresolved(&media));

        assert!(result.warnings.contains(&ImportWarning::DuplicateFileName {
            name: "A.mid".to_string()
        }));
        // both occurrences are kept, the gap is counted once
        assert_eq!(result.editions[1].files[0].name, "A.mid");
        assert_eq!(result.resolution_gaps, 3);
    }

    #[test]
    fn test_short_list_leaves_later_edition_blank() {
        let media = names(&["A.pdf", "B.pdf"]);
        let groups = partition_manifest(&media, "pdf");
        let result = correlate(&groups, &lists(&["1", "2"], &["Only"]), &ResolvedUrls::unresolved(&media));

        assert_eq!(result.editions[0].metadata.editor.as_deref(), Some("Only"));
        assert!(result.editions[1].metadata.editor.is_none());
    }

    #[test]
    fn test_secondary_order_keeps_metadata() {
        let lists = EditionLists {
            identifiers: names(&["100", "200", "300"]),
            editors: slots(&["Ed1", "Ed2", "Ed3"]),
            licenses: slots(&["CPDL", "Personal", "CC BY"]),
            ..Default::default()
        };
        let summary = |media: &[String]| {
            let groups = partition_manifest(media, "pdf");
            correlate(&groups, &lists, &ResolvedUrls::unresolved(media))
                .editions
                .into_iter()
                .map(|e| (e.primary.name, e.metadata))
                .collect::<Vec<_>>()
        };

        let ordered = summary(&names(&["A.pdf", "A.mid", "A.mxl", "B.pdf", "B.mp3", "C.pdf"]));
        let shuffled = summary(&names(&["A.pdf", "A.mxl", "A.mid", "B.pdf", "B.mp3", "C.pdf"]));

        assert_eq!(ordered, shuffled);
        assert_eq!(ordered[2].0, "C.pdf");
        assert_eq!(ordered[2].1.identifier.as_deref(), Some("300"));
        assert_eq!(ordered[2].1.editor.as_deref(), Some("Ed3"));
        assert_eq!(ordered[2].1.license.as_deref(), Some("CC BY"));
    }
}
