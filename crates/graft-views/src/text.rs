//! Marker-annotated source text
//!
//! Each outline node owns a region of text introduced by a marker line of the
//! form `--- <id> ---`. The region runs until the next marker or the end of
//! the document. Text before the first marker is kept as a preamble.

use crate::error::SyncError;
use crate::synchronizer::ViewSynchronizer;
use graft_ident::NodeId;
use graft_tree::{InsertionPlan, Placement, RenameMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const MARKER_OPEN: &str = "--- ";
const MARKER_CLOSE: &str = " ---";

/// Body given to a freshly inserted section
const NEW_SECTION_BODY: &str = "\n\n";

/// Render the marker line for `id` (without line terminator)
#[must_use]
pub fn marker(id: &NodeId) -> String {
    format!("{MARKER_OPEN}{id}{MARKER_CLOSE}")
}

/// Recognize a marker line
///
/// The line must consist solely of `--- <id> ---` (surrounding whitespace
/// allowed) and `<id>` must be a well-formed identifier. Lines such as
/// `--- Intro ---` are ordinary text.
#[must_use]
pub fn parse_marker(line: &str) -> Option<NodeId> {
    line.trim()
        .strip_prefix(MARKER_OPEN)?
        .strip_suffix(MARKER_CLOSE)?
        .trim()
        .parse()
        .ok()
}

/// One marker and the text it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Identifier carried by the marker
    pub id: NodeId,
    /// Everything after the marker text up to the next marker, including the
    /// marker line's own terminator
    pub body: String,
}

impl Section {
    /// Create a section
    #[inline]
    #[must_use]
    pub fn new(id: NodeId, body: impl Into<String>) -> Self {
        Self {
            id,
            body: body.into(),
        }
    }
}

/// Text view split at its marker lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedDocument {
    /// Text before the first marker
    pub preamble: String,
    /// Sections in document order
    pub sections: Vec<Section>,
}

impl AnnotatedDocument {
    /// Split text into preamble and sections
    ///
    /// Rendering the result reproduces the input exactly as long as every
    /// marker line is written in canonical form.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::default();

        for line in text.split_inclusive('\n') {
            let content = line.trim_end_matches(['\n', '\r']);
            if let Some(id) = parse_marker(content) {
                let terminator = &line[content.len()..];
                doc.sections.push(Section::new(id, terminator));
                continue;
            }

            match doc.sections.last_mut() {
                Some(section) => section.body.push_str(line),
                None => doc.preamble.push_str(line),
            }
        }

        doc
    }

    /// Reassemble the text
    #[must_use]
    pub fn render(&self) -> String {
        let capacity = self.preamble.len()
            + self
                .sections
                .iter()
                .map(|s| s.body.len() + 16)
                .sum::<usize>();
        let mut out = String::with_capacity(capacity);
        out.push_str(&self.preamble);
        for section in &self.sections {
            out.push_str(&marker(&section.id));
            out.push_str(&section.body);
        }
        out
    }

    /// Marker ids in document order (duplicates included)
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.sections.iter().map(|s| s.id.clone())
    }

    /// Set of marker ids
    #[must_use]
    pub fn id_set(&self) -> BTreeSet<NodeId> {
        self.ids().collect()
    }

    /// Ids carried by more than one marker
    #[must_use]
    pub fn duplicate_ids(&self) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        self.sections
            .iter()
            .filter(|s| !seen.insert(&s.id))
            .map(|s| s.id.clone())
            .collect()
    }

    /// Number of sections
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Check if there are no sections
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Body text of the section carrying `id`
    #[must_use]
    pub fn body_of(&self, id: &NodeId) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| &s.id == id)
            .map(|s| s.body.as_str())
    }

    /// Index of the unique section carrying `id`
    fn position_of(&self, id: &NodeId) -> Result<usize, SyncError> {
        let mut hits = self
            .sections
            .iter()
            .enumerate()
            .filter(|(_, s)| &s.id == id)
            .map(|(i, _)| i);

        match (hits.next(), hits.count()) {
            (Some(index), 0) => Ok(index),
            (first, rest) => Err(SyncError::InsertionPointNotFound {
                id: id.clone(),
                occurrences: usize::from(first.is_some()) + rest,
            }),
        }
    }

    /// Index one past the last section whose id descends from the section at `index`
    fn subtree_end(&self, index: usize) -> usize {
        let root = &self.sections[index].id;
        let mut end = index + 1;
        while end < self.sections.len() && root.is_ancestor_of(&self.sections[end].id) {
            end += 1;
        }
        end
    }

    /// Make the text preceding section slot `index` end on a line boundary
    fn break_line_before(&mut self, index: usize) {
        let preceding = match index.checked_sub(1) {
            Some(prev) => &mut self.sections[prev].body,
            None => &mut self.preamble,
        };
        if !preceding.is_empty() && !preceding.ends_with('\n') {
            preceding.push('\n');
        }
    }
}

/// Where a right-sibling insertion lands in the text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingAnchor {
    /// After the source and every descendant marker that follows it
    #[default]
    SubtreeEnd,
    /// Directly after the source's own body, before any descendant markers
    RegionEnd,
}

/// Synchronizer for [`AnnotatedDocument`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSynchronizer {
    sibling_anchor: SiblingAnchor,
}

impl TextSynchronizer {
    /// Create text synchronizer
    #[inline]
    #[must_use]
    pub fn new(sibling_anchor: SiblingAnchor) -> Self {
        Self { sibling_anchor }
    }

    /// Configured right-sibling anchor
    #[inline]
    #[must_use]
    pub fn sibling_anchor(&self) -> SiblingAnchor {
        self.sibling_anchor
    }
}

impl ViewSynchronizer for TextSynchronizer {
    type View = AnnotatedDocument;

    fn name(&self) -> &'static str {
        "text"
    }

    fn apply_renames(
        &self,
        view: &AnnotatedDocument,
        renames: &RenameMap,
    ) -> Result<AnnotatedDocument, SyncError> {
        let sections = view
            .sections
            .iter()
            .map(|s| Section::new(renames.apply(&s.id), s.body.clone()))
            .collect();

        Ok(AnnotatedDocument {
            preamble: view.preamble.clone(),
            sections,
        })
    }

    fn insert(
        &self,
        view: &AnnotatedDocument,
        plan: &InsertionPlan,
    ) -> Result<AnnotatedDocument, SyncError> {
        let anchor = view.position_of(plan.placement.anchor())?;
        if view.sections.iter().any(|s| s.id == plan.new_id) {
            return Err(SyncError::AlreadyPresent {
                view: self.name(),
                id: plan.new_id.clone(),
            });
        }

        let slot = match (&plan.placement, self.sibling_anchor) {
            (Placement::LeftSibling { .. }, _) => anchor,
            (Placement::RightSibling { .. }, SiblingAnchor::RegionEnd) => anchor + 1,
            (Placement::Child { .. } | Placement::RightSibling { .. }, _) => {
                view.subtree_end(anchor)
            }
        };

        let mut updated = view.clone();
        updated.break_line_before(slot);
        updated
            .sections
            .insert(slot, Section::new(plan.new_id.clone(), NEW_SECTION_BODY));

        tracing::trace!(new_id = %plan.new_id, slot, "inserted text marker");
        Ok(updated)
    }

    fn node_ids(&self, view: &AnnotatedDocument) -> BTreeSet<NodeId> {
        view.id_set()
    }
}
