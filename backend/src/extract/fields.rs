//! Piece-level facts.
//!
//! Every fact is a bold label followed by text or link nodes. The first
//! occurrence of each label wins; anything missing stays `None`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{FieldLabel, LabelIndex};
use crate::error::{ExtractError, ExtractResult};
use crate::models::WorkRecord;
use crate::parser::{normalize_ws, NodeId, PageDocument, PageTree};

static YEAR_CATEGORY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Category:(\d{4}) works").expect("valid year pattern"));

/// Build the work record of a page.
pub fn extract_work(
    doc: &PageDocument,
    tree: &PageTree,
    labels: &LabelIndex,
) -> ExtractResult<WorkRecord> {
    let title = normalize_ws(&doc.title);
    if title.is_empty() {
        return Err(ExtractError::MissingTitle);
    }

    let single = |label: FieldLabel| labels.first(label).and_then(|id| first_value(tree, id));

    let original_num_voices = match single(FieldLabel::NumberOfVoices) {
        Some(raw) => Some(parse_voice_count(&raw)?),
        None => None,
    };
    let original_language = single(FieldLabel::Language);
    let (original_text, translated_text) = extract_texts(tree, original_language.as_deref());

    let mut work = WorkRecord::new(title);
    work.page_id = doc.page_id;
    work.composer = single(FieldLabel::Composer);
    work.lyricist = single(FieldLabel::Lyricist);
    work.publication_year = extract_year(tree);
    work.original_num_voices = original_num_voices;
    work.original_voicing = single(FieldLabel::Voicing);
    work.original_instrumentation = single(FieldLabel::Instruments);
    work.original_language = original_language;
    work.original_text = original_text;
    work.translated_text = translated_text;
    work.description = labels
        .first(FieldLabel::Description)
        .and_then(|id| block_value(tree, id));
    work.genres = labels
        .first(FieldLabel::Genre)
        .map(|id| genres(tree, id))
        .unwrap_or_default();

    Ok(work)
}

/// First non-empty text or link after a label.
pub(crate) fn first_value(tree: &PageTree, label: NodeId) -> Option<String> {
    tree.values_after(label)
        .into_iter()
        .map(|v| v.text().to_string())
        .find(|t| !t.is_empty())
}

/// All value fragments after a label, joined.
pub(crate) fn joined_value(tree: &PageTree, label: NodeId) -> Option<String> {
    let mut joined = String::new();
    for fragment in tree.values_after(label) {
        let text = fragment.text();
        if !joined.is_empty() && !text.starts_with(['.', ',', ';', ':', '!', '?', ')']) {
            joined.push(' ');
        }
        joined.push_str(text);
    }
    let joined = normalize_ws(&joined);
    (!joined.is_empty()).then_some(joined)
}

/// Text of the label's enclosing block, minus the label itself.
fn block_value(tree: &PageTree, label: NodeId) -> Option<String> {
    let block = tree.enclosing_block(label)?;
    let label_text = tree.text(label);
    let text = tree.block_text(block).replacen(&label_text, "", 1);
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Genre tags: every link after the label, or comma-separated text.
fn genres(tree: &PageTree, label: NodeId) -> Vec<String> {
    let values = tree.values_after(label);
    let links: Vec<String> = values
        .iter()
        .filter(|v| v.is_link())
        .map(|v| v.text().to_string())
        .collect();
    if !links.is_empty() {
        return links;
    }
    values
        .iter()
        .flat_map(|v| v.text().split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a voice count such as "5vv", "4v" or "8".
pub fn parse_voice_count(raw: &str) -> ExtractResult<u32> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_suffix("vv")
        .or_else(|| trimmed.strip_suffix('v'))
        .unwrap_or(trimmed)
        .trim();

    digits.parse::<u32>().map_err(|e| ExtractError::InvalidValue {
        label: FieldLabel::NumberOfVoices.as_str().to_string(),
        value: raw.to_string(),
        message: e.to_string(),
    })
}

/// Year from the first "<year> works" category link.
fn extract_year(tree: &PageTree) -> Option<u16> {
    tree.elements("a")
        .filter_map(|id| tree.attr(id, "title"))
        .find_map(|title| YEAR_CATEGORY.captures(title))
        .and_then(|caps| caps[1].parse().ok())
}

fn is_english(marker: &str) -> bool {
    marker
        .split_whitespace()
        .next()
        .is_some_and(|w| w.eq_ignore_ascii_case("english"))
}

/// Original text and English translation.
///
/// Each `big` marker names a language and owns the first `div.poem` after
/// it. The first non-English block is the original, the first English one
/// the translation. A single block is always the original.
fn extract_texts(tree: &PageTree, language: Option<&str>) -> (Option<String>, Option<String>) {
    let markers: Vec<(NodeId, String)> = tree
        .elements("big")
        .map(|id| (id, tree.text(id)))
        .filter(|(_, text)| !text.is_empty())
        .collect();
    let poems: Vec<NodeId> = tree
        .elements("div")
        .filter(|&id| tree.has_class(id, "poem"))
        .collect();

    let blocks: Vec<(&str, Option<String>)> = markers
        .iter()
        .enumerate()
        .map(|(i, (start, name))| {
            let end = markers.get(i + 1).map(|(id, _)| *id).unwrap_or(usize::MAX);
            let text = poems
                .iter()
                .find(|&&p| p > *start && p < end)
                .map(|&p| tree.block_text(p))
                .filter(|t| !t.is_empty());
            (name.as_str(), text)
        })
        .collect();

    match blocks.as_slice() {
        [] => (None, None),
        [(_, only)] => (only.clone(), None),
        _ => match blocks.iter().find(|(name, _)| !is_english(name)) {
            Some((_, original)) => {
                let translation = if language.is_some_and(is_english) {
                    None
                } else {
                    blocks
                        .iter()
                        .find(|(name, _)| is_english(name))
                        .and_then(|(_, text)| text.clone())
                };
                (original.clone(), translation)
            }
            None => (blocks[0].1.clone(), None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work_from(markup: &str) -> ExtractResult<WorkRecord> {
        let doc = PageDocument::new("Ecco, moriro dunque (Carlo Gesualdo)", markup, vec![]);
        let tree = doc.tree();
        let labels = LabelIndex::build(&tree);
        extract_work(&doc, &tree, &labels)
    }

    #[test]
    fn test_voice_count() {
        assert_eq!(parse_voice_count("5v").unwrap(), 5);
        assert_eq!(parse_voice_count("4vv").unwrap(), 4);
        assert_eq!(parse_voice_count(" 8 ").unwrap(), 8);
        assert!(parse_voice_count("SATB").is_err());
        assert!(parse_voice_count("").is_err());
    }

    #[test]
    fn test_scenario_a_fields() {
        let work = work_from(
            "<p><b>Composer:</b> Gesualdo<br/><b>Number of voices:</b> 5v <b>Voicing:</b> SSATB</p>",
        )
        .unwrap();
        assert_eq!(work.composer.as_deref(), Some("Gesualdo"));
        assert_eq!(work.original_num_voices, Some(5));
        assert_eq!(work.original_voicing.as_deref(), Some("SSATB"));
        assert!(work.lyricist.is_none());
        assert!(work.publication_year.is_none());
    }

    #[test]
    fn test_invalid_voice_count_fails() {
        let err = work_from("<p><b>Number of voices:</b> many</p>").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidValue { .. }));
        assert!(err.to_string().contains("many"));
    }

    #[test]
    fn test_missing_title() {
        let doc = PageDocument::new("  ", "<p/>", vec![]);
        let tree = doc.tree();
        let labels = LabelIndex::build(&tree);
        assert!(matches!(
            extract_work(&doc, &tree, &labels),
            Err(ExtractError::MissingTitle)
        ));
    }

    #[test]
    fn test_genres_from_links() {
        let work = work_from(
            "<p><b>Genre:</b> <a>Secular</a>, <a>Madrigals</a><br/><b>Language:</b> <a>Italian</a></p>",
        )
        .unwrap();
        assert_eq!(work.genres, vec!["Secular", "Madrigals"]);
        assert_eq!(work.original_language.as_deref(), Some("Italian"));
    }

    #[test]
    fn test_genres_from_text() {
        let work = work_from("<p><b>Genre:</b> Sacred, Motets</p>").unwrap();
        assert_eq!(work.genres, vec!["Sacred", "Motets"]);
    }

    #[test]
    fn test_description_strips_label() {
        let work = work_from("<p><b>Description:</b> From the <i>Sixth book</i> of madrigals.</p>").unwrap();
        assert_eq!(
            work.description.as_deref(),
            Some("From the Sixth book of madrigals.")
        );
    }

    #[test]
    fn test_publication_year() {
        let work = work_from(
            r#"<p><a title="Category:Madrigals">M</a> <a title="Category:1611 works">1611</a></p>"#,
        )
        .unwrap();
        assert_eq!(work.publication_year, Some(1611));
    }

    #[test]
    fn test_original_and_translation() {
        let work = work_from(
            r#"<p><b><big>Italian</big> text</b></p><div class="poem"><p>Ecco, morirò dunque</p></div>
               <p><b><big>English</big> translation</b></p><div class="poem"><p>Lo, I shall die</p></div>"#,
        )
        .unwrap();
        assert_eq!(work.original_text.as_deref(), Some("Ecco, morirò dunque"));
        assert_eq!(work.translated_text.as_deref(), Some("Lo, I shall die"));
    }

    #[test]
    fn test_single_marker_has_no_translation() {
        let work = work_from(
            r#"<p><b><big>English</big></b></p><div class="poem"><p>Sing we merrily</p></div>"#,
        )
        .unwrap();
        assert_eq!(work.original_text.as_deref(), Some("Sing we merrily"));
        assert!(work.translated_text.is_none());
    }

    #[test]
    fn test_english_listed_first() {
        let work = work_from(
            r#"<big>English</big><div class="poem">Lo</div><big>Latin</big><div class="poem">Ecce</div><big>German</big><div class="poem">Siehe</div>"#,
        )
        .unwrap();
        assert_eq!(work.original_text.as_deref(), Some("Ecce"));
        assert_eq!(work.translated_text.as_deref(), Some("Lo"));
    }
}
