//! Split the flat file manifest into per-edition groups.
//!
//! The manifest lists every file of every edition back to back. Editions
//! carry no key, so groups are recovered from ordering alone: a primary
//! document (by default a PDF score) opens a new group and every other file
//! belongs to the group opened last.
//!
//! # Architecture
//!
//! ```text
//! Manifest (flat)                    Edition groups
//! ┌──────────────────────┐          ┌──────────────────────────────┐
//! │ Work-A.pdf           │          │ #0 Work-A.pdf                │
//! │ Work-A.mid           │    →     │    [Work-A.mid, Work-A.mxl]  │
//! │ Work-A.mxl           │          ├──────────────────────────────┤
//! │ Work-B.pdf           │          │ #1 Work-B.pdf  []            │
//! └──────────────────────┘          └──────────────────────────────┘
//! ```

use crate::models::{EditionGroup, EditionIndex, ManifestEntry};

/// Partition media file names (furniture already dropped) into edition groups.
///
/// The first file always opens group 0, whatever its type. An empty
/// manifest yields no groups.
pub fn partition_manifest(media_files: &[String], primary_extension: &str) -> Vec<EditionGroup> {
    let mut groups: Vec<EditionGroup> = Vec::new();

    for name in media_files {
        let entry = ManifestEntry::new(name.as_str());

        match groups.last_mut() {
            Some(current) if !entry.file_type.is(primary_extension) => {
                current.secondary.push(entry);
            }
            _ => {
                groups.push(EditionGroup {
                    index: EditionIndex(groups.len()),
                    primary: entry,
                    secondary: Vec::new(),
                });
            }
        }
    }

    groups
}
