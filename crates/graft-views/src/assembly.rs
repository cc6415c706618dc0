//! Initial document assembly
//!
//! Turns plain text into paragraph-tagged text, and tagged text plus a node
//! table into a marker-annotated document.

use crate::table::NodeTable;
use crate::text::{AnnotatedDocument, Section};
use indexmap::IndexMap;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

const PARAGRAPH_BREAK: &str = "\n\n";

fn paragraph_tag() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"\[(para-\d+)\]").expect("paragraph tag pattern is valid"))
}

/// Prefix every non-empty paragraph with `[para-N]`
///
/// Paragraphs are separated by blank lines; `N` is the paragraph's 1-based
/// position counting empty ones, so numbering is stable under whitespace-only
/// edits elsewhere.
#[must_use]
pub fn tag_paragraphs(text: &str) -> String {
    text.split(PARAGRAPH_BREAK)
        .enumerate()
        .map(|(i, paragraph)| {
            let trimmed = paragraph.trim();
            if trimmed.is_empty() {
                paragraph.to_string()
            } else {
                format!("[para-{}] {trimmed}", i + 1)
            }
        })
        .collect::<Vec<_>>()
        .join(PARAGRAPH_BREAK)
}

/// Split tagged text into `para-N` → content, in document order
#[must_use]
pub fn paragraph_map(tagged: &str) -> IndexMap<String, String> {
    let tags: Vec<_> = paragraph_tag().captures_iter(tagged).collect();
    let mut paragraphs = IndexMap::new();

    for (i, caps) in tags.iter().enumerate() {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = tags
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(tagged.len(), |m| m.start());
        let content = tagged[whole.end()..end].trim();
        if !content.is_empty() {
            paragraphs.insert(name.as_str().to_string(), content.to_string());
        }
    }
    paragraphs
}

/// Build the marker-annotated document for a node table
///
/// Each table entry becomes a section (in table order) holding the tagged
/// paragraphs it references. Unknown paragraph references are skipped.
/// Paragraphs no entry references are kept in the preamble so no source text
/// is lost.
#[must_use]
pub fn build_annotated_document(tagged: &str, table: &NodeTable) -> AnnotatedDocument {
    let paragraphs = paragraph_map(tagged);
    let mut assigned = BTreeSet::new();
    let mut doc = AnnotatedDocument::default();

    for (id, entry) in table.iter() {
        let parts: Vec<String> = entry
            .paragraph_ids
            .iter()
            .filter_map(|para| {
                let content = paragraphs.get(para)?;
                assigned.insert(para.as_str());
                Some(format!("[{para}] {content}"))
            })
            .collect();

        let body = if parts.is_empty() {
            "\n".to_string()
        } else {
            format!("\n{}{PARAGRAPH_BREAK}", parts.join(PARAGRAPH_BREAK))
        };
        doc.sections.push(Section::new(id.clone(), body));
    }

    let orphans: Vec<String> = paragraphs
        .iter()
        .filter(|(para, _)| !assigned.contains(para.as_str()))
        .map(|(para, content)| format!("[{para}] {content}"))
        .collect();
    if !orphans.is_empty() {
        tracing::warn!(count = orphans.len(), "paragraphs not referenced by any node");
        doc.preamble = format!("{}{PARAGRAPH_BREAK}", orphans.join(PARAGRAPH_BREAK));
    }

    if let Some(last) = doc.sections.last_mut() {
        let trimmed = last.body.trim_end().len();
        last.body.truncate(trimmed);
        last.body.push('\n');
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::NodeEntry;
    use graft_ident::NodeId;
    use pretty_assertions::assert_eq;

    const TEXT: &str = "First paragraph.\n\n  Second one.  \n\n\n\nFourth after gap.";

    #[test]
    fn tags_non_empty_paragraphs() {
        assert_eq!(
            tag_paragraphs(TEXT),
            "[para-1] First paragraph.\n\n[para-2] Second one.\n\n\n\n[para-4] Fourth after gap."
        );
    }

    #[test]
    fn paragraph_map_extracts_content() {
        let map = paragraph_map(&tag_paragraphs(TEXT));
        assert_eq!(map.len(), 3);
        assert_eq!(map["para-2"], "Second one.");
        assert_eq!(map["para-4"], "Fourth after gap.");
    }

    #[test]
    fn builds_sections_in_table_order() {
        let tagged = tag_paragraphs(TEXT);
        let table: NodeTable = [
            ("1", NodeEntry::new("Opening", "intro").with_paragraphs(["para-1", "para-2"])),
            ("1.1", NodeEntry::new("Empty", "note")),
            ("2", NodeEntry::new("End", "conclusion").with_paragraphs(["para-4", "para-9"])),
        ]
        .into_iter()
        .map(|(id, entry)| (id.parse::<NodeId>().unwrap(), entry))
        .collect();

        let doc = build_annotated_document(&tagged, &table);
        assert_eq!(
            doc.render(),
            "--- 1 ---\n[para-1] First paragraph.\n\n[para-2] Second one.\n\n\
--- 1.1 ---\n\
--- 2 ---\n[para-4] Fourth after gap.\n"
        );
        assert!(doc.preamble.is_empty());
    }

    #[test]
    fn unreferenced_paragraphs_kept_in_preamble() {
        let tagged = tag_paragraphs(TEXT);
        let table: NodeTable = std::iter::once((
            "1".parse::<NodeId>().unwrap(),
            NodeEntry::new("Only", "intro").with_paragraphs(["para-2"]),
        ))
        .collect();

        let doc = build_annotated_document(&tagged, &table);
        assert_eq!(
            doc.preamble,
            "[para-1] First paragraph.\n\n[para-4] Fourth after gap.\n\n"
        );
        // the rendered text parses back to the same sections
        assert_eq!(AnnotatedDocument::parse(&doc.render()), doc);
    }
}
