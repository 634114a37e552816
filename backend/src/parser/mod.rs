//! Page envelope decoding.
//!
//! A page arrives as the JSON returned by the wiki's `action=parse` call:
//! a title, the rendered markup and the flat list of attached file names.
//! Both the legacy (`"text": {"*": "..."}`) and the `formatversion=2`
//! (`"text": "..."`) shapes are accepted.

pub mod tree;

use serde::Deserialize;
use std::path::Path;

use crate::error::EnvelopeResult;

pub use tree::{normalize_ws, NodeId, PageTree, ValueFragment};

#[derive(Debug, Deserialize)]
struct Envelope {
    parse: ParsedPage,
}

#[derive(Debug, Deserialize)]
struct ParsedPage {
    title: String,
    #[serde(default)]
    pageid: Option<u64>,
    text: PageText,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PageText {
    Plain(String),
    Legacy {
        #[serde(rename = "*")]
        content: String,
    },
}

/// One catalogue page, as delivered by the page-fetch collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    pub title: String,
    pub page_id: Option<u64>,
    /// Rendered HTML of the page.
    pub markup: String,
    /// Attached file names in page order, page furniture included.
    pub manifest: Vec<String>,
}

impl PageDocument {
    pub fn new(title: impl Into<String>, markup: impl Into<String>, manifest: Vec<String>) -> Self {
        Self {
            title: title.into(),
            page_id: None,
            markup: markup.into(),
            manifest,
        }
    }

    pub fn with_page_id(mut self, page_id: u64) -> Self {
        self.page_id = Some(page_id);
        self
    }

    /// Decode a parse envelope.
    ///
    /// # Example
    /// ```ignore
    /// let doc = PageDocument::from_json(r#"{"parse": {"title": "Ecco", "text": {"*": "<p/>"}, "images": []}}"#)?;
    /// assert_eq!(doc.title, "Ecco");
    /// ```
    pub fn from_json(json: &str) -> EnvelopeResult<Self> {
        let envelope: Envelope = serde_json::from_str(json)?;
        let page = envelope.parse;
        let markup = match page.text {
            PageText::Plain(s) => s,
            PageText::Legacy { content } => content,
        };
        Ok(Self {
            title: page.title,
            page_id: page.pageid,
            markup,
            manifest: page.images,
        })
    }

    /// Read and decode an envelope file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> EnvelopeResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Manifest entries after the leading page furniture.
    pub fn media_files(&self, furniture_count: usize) -> &[String] {
        self.manifest.get(furniture_count..).unwrap_or(&[])
    }

    /// Parse the rendered markup.
    pub fn tree(&self) -> PageTree {
        PageTree::parse(&self.markup)
    }
}
