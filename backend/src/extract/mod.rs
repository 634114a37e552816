//! Extraction of labeled facts from page markup.
//!
//! - [`fields`]: piece-level facts (first occurrence of each label)
//! - [`lists`]: per-edition lists (every occurrence of a label)
//!
//! Both work from one [`LabelIndex`] built over the parsed tree.

pub mod fields;
pub mod lists;

use crate::parser::{NodeId, PageTree};

pub use fields::{extract_work, parse_voice_count};
pub use lists::{extract_lists, EditionLists};

/// Labels recognized on catalogue pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldLabel {
    Composer,
    Lyricist,
    NumberOfVoices,
    Voicing,
    Genre,
    Language,
    Instruments,
    Description,
    Editor,
    EditionNotes,
    Copyright,
}

impl FieldLabel {
    pub const ALL: [FieldLabel; 11] = [
        FieldLabel::Composer,
        FieldLabel::Lyricist,
        FieldLabel::NumberOfVoices,
        FieldLabel::Voicing,
        FieldLabel::Genre,
        FieldLabel::Language,
        FieldLabel::Instruments,
        FieldLabel::Description,
        FieldLabel::Editor,
        FieldLabel::EditionNotes,
        FieldLabel::Copyright,
    ];

    /// Label text as it appears on the page, without the colon.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldLabel::Composer => "Composer",
            FieldLabel::Lyricist => "Lyricist",
            FieldLabel::NumberOfVoices => "Number of voices",
            FieldLabel::Voicing => "Voicing",
            FieldLabel::Genre => "Genre",
            FieldLabel::Language => "Language",
            FieldLabel::Instruments => "Instruments",
            FieldLabel::Description => "Description",
            FieldLabel::Editor => "Editor",
            FieldLabel::EditionNotes => "Edition notes",
            FieldLabel::Copyright => "Copyright",
        }
    }

    /// Match a label name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

/// Known label nodes of a page, in document order.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    entries: Vec<(FieldLabel, NodeId)>,
}

impl LabelIndex {
    pub fn build(tree: &PageTree) -> Self {
        let entries = tree
            .labels()
            .into_iter()
            .filter_map(|(id, name)| FieldLabel::from_name(&name).map(|label| (label, id)))
            .collect();
        Self { entries }
    }

    /// First node carrying this label.
    pub fn first(&self, label: FieldLabel) -> Option<NodeId> {
        self.all(label).next()
    }

    /// Every node carrying this label.
    pub fn all(&self, label: FieldLabel) -> impl Iterator<Item = NodeId> + '_ {
        self.entries
            .iter()
            .filter(move |(l, _)| *l == label)
            .map(|(_, id)| *id)
    }
}
