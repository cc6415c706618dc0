//! Presentation graph
//!
//! A node/edge graph derived from the outline and stored as Mermaid
//! flowchart text. Outline nodes appear under their identifiers; any other
//! node (such as the top-level anchor `ROOT`) is carried along untouched.

use crate::error::SyncError;
use crate::synchronizer::ViewSynchronizer;
use graft_ident::NodeId;
use graft_tree::{InsertionPlan, Placement, RenameMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Parent used for top-level nodes that have no incoming edge
pub const DEFAULT_TOP_LEVEL_ANCHOR: &str = "ROOT";

const DEFAULT_DIRECTION: &str = "TD";
const DIRECTIONS: [&str; 5] = ["TD", "TB", "BT", "LR", "RL"];
const DIRECTIVE_KEYWORDS: [&str; 5] = ["style", "classDef", "class", "linkStyle", "click"];
const INDENT: &str = "    ";

/// Node outline drawn around a label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeShape {
    /// `id[label]`
    #[default]
    Rectangle,
    /// `id(label)`
    Rounded,
    /// `id((label))`
    Circle,
    /// `id{label}`
    Diamond,
    /// `id[[label]]`
    Subroutine,
}

impl NodeShape {
    const ALL: [Self; 5] = [
        Self::Circle,
        Self::Subroutine,
        Self::Rectangle,
        Self::Rounded,
        Self::Diamond,
    ];

    fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            Self::Rectangle => ("[", "]"),
            Self::Rounded => ("(", ")"),
            Self::Circle => ("((", "))"),
            Self::Diamond => ("{", "}"),
            Self::Subroutine => ("[[", "]]"),
        }
    }

    /// Split `[label]`-style text into shape and label
    fn parse(spec: &str) -> Option<(Self, &str)> {
        // double delimiters are checked before their single counterparts
        Self::ALL.into_iter().find_map(|shape| {
            let (open, close) = shape.delimiters();
            let inner = spec.strip_prefix(open)?.strip_suffix(close)?;
            Some((shape, inner.trim()))
        })
    }
}

/// Graph node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Mermaid identifier (an outline id or an auxiliary name)
    pub id: String,
    /// Display label
    pub label: String,
    /// Outline shape
    #[serde(default)]
    pub shape: NodeShape,
}

impl GraphNode {
    /// Create rectangle node
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            shape: NodeShape::Rectangle,
        }
    }

    /// Outline identifier, if the node id is one
    #[must_use]
    pub fn outline_id(&self) -> Option<NodeId> {
        self.id.parse().ok()
    }
}

/// Edge line style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// `-->`
    #[default]
    Solid,
    /// `-.->`
    Dashed,
}

impl EdgeKind {
    // dashed first so `-.->` is never read as a solid arrow
    const PATTERNS: [(&'static str, Self); 2] = [("-.->", Self::Dashed), ("-->", Self::Solid)];

    fn arrow(self) -> &'static str {
        match self {
            Self::Solid => "-->",
            Self::Dashed => "-.->",
        }
    }

    /// Earliest top-level arrow in `line`: (offset, arrow length, kind)
    ///
    /// Text inside node labels, quotes and `|edge labels|` is skipped.
    fn find(line: &str) -> Option<(usize, usize, Self)> {
        let mut depth = 0usize;
        let mut quoted = false;
        let mut piped = false;

        for (at, ch) in line.char_indices() {
            match ch {
                '"' => quoted = !quoted,
                _ if quoted => {}
                '[' | '(' | '{' => depth += 1,
                ']' | ')' | '}' => depth = depth.saturating_sub(1),
                '|' if depth == 0 => piped = !piped,
                '-' if depth == 0 && !piped => {
                    let found = Self::PATTERNS
                        .into_iter()
                        .find(|(pattern, _)| line[at..].starts_with(pattern));
                    if let Some((pattern, kind)) = found {
                        return Some((at, pattern.len(), kind));
                    }
                }
                _ => {}
            }
        }
        None
    }
}

/// Directed edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Optional edge label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Line style
    #[serde(default)]
    pub kind: EdgeKind,
}

impl GraphEdge {
    /// Create solid unlabeled edge
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: None,
            kind: EdgeKind::Solid,
        }
    }
}

/// Flowchart with nodes in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineGraph {
    /// Layout direction from the header (`TD`, `LR`, ...)
    pub direction: String,
    /// Nodes in first-mention order
    pub nodes: Vec<GraphNode>,
    /// Edges in declaration order
    pub edges: Vec<GraphEdge>,
    /// Styling lines (`style`, `classDef`, ...) kept verbatim apart from renames
    #[serde(default)]
    pub directives: Vec<String>,
}

impl Default for OutlineGraph {
    fn default() -> Self {
        Self {
            direction: DEFAULT_DIRECTION.to_string(),
            nodes: Vec::new(),
            edges: Vec::new(),
            directives: Vec::new(),
        }
    }
}

impl OutlineGraph {
    /// Parse Mermaid flowchart text
    ///
    /// Blank input yields an empty `graph TD`. `%%` comments are dropped.
    ///
    /// # Errors
    /// Returns [`SyncError::MalformedGraph`] on a bad header, a subgraph
    /// block, or a line that is neither a node, an edge nor a styling directive
    pub fn parse_mermaid(definition: &str) -> Result<Self, SyncError> {
        let mut lines = definition
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with("%%"));

        let mut graph = Self::default();
        let Some((header_line, header)) = lines.next() else {
            return Ok(graph);
        };
        graph.direction = parse_graph_header(header_line, header)?;

        for (number, line) in lines {
            let keyword = line.split_whitespace().next().unwrap_or_default();
            if keyword == "subgraph" || keyword == "end" {
                return Err(SyncError::malformed_graph(
                    number,
                    "subgraph blocks are not supported",
                ));
            }
            if DIRECTIVE_KEYWORDS.contains(&keyword) {
                graph.directives.push(line.to_string());
                continue;
            }
            if graph.parse_edge_line(number, line)? {
                continue;
            }
            let spec = NodeSpec::parse(number, line)?;
            graph.intern(spec);
        }

        Ok(graph)
    }

    /// Render as Mermaid text (node declarations, then edges, then directives)
    #[must_use]
    pub fn to_mermaid(&self) -> String {
        let mut out = format!("graph {}\n", self.direction);
        for node in &self.nodes {
            let (open, close) = node.shape.delimiters();
            let _ = writeln!(out, "{INDENT}{}{open}{}{close}", node.id, escape_label(&node.label));
        }
        for edge in &self.edges {
            let arrow = edge.kind.arrow();
            let _ = match &edge.label {
                Some(label) => writeln!(
                    out,
                    "{INDENT}{} {arrow}|{}| {}",
                    edge.source,
                    encode_entities(label, &['|', '"', '\n', '\r']),
                    edge.target
                ),
                None => writeln!(out, "{INDENT}{} {arrow} {}", edge.source, edge.target),
            };
        }
        for directive in &self.directives {
            let _ = writeln!(out, "{INDENT}{directive}");
        }
        out
    }

    /// Look up a node
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Source of the first edge pointing at `id`
    #[must_use]
    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.edges
            .iter()
            .find(|e| e.target == id)
            .map(|e| e.source.as_str())
    }

    /// Outline ids among the node set
    #[must_use]
    pub fn outline_ids(&self) -> BTreeSet<NodeId> {
        self.nodes.iter().filter_map(GraphNode::outline_id).collect()
    }

    /// Add a node unless one with the same id exists
    ///
    /// An explicit label replaces an implicit one (a node first seen as a
    /// bare edge endpoint).
    fn intern(&mut self, spec: NodeSpec<'_>) {
        match self.nodes.iter_mut().find(|n| n.id == spec.id) {
            Some(existing) => {
                if let Some((shape, label)) = spec.shape {
                    existing.shape = shape;
                    existing.label = label;
                }
            }
            None => {
                let (shape, label) = spec
                    .shape
                    .unwrap_or_else(|| (NodeShape::Rectangle, spec.id.to_string()));
                self.nodes.push(GraphNode {
                    id: spec.id.to_string(),
                    label,
                    shape,
                });
            }
        }
    }

    /// Parse `a --> b`, `a -->|label| b` and chains; returns false if `line` has no arrow
    fn parse_edge_line(&mut self, number: usize, line: &str) -> Result<bool, SyncError> {
        let Some((at, len, mut kind)) = EdgeKind::find(line) else {
            return Ok(false);
        };

        let mut source = NodeSpec::parse(number, &line[..at])?;
        let mut rest = &line[at + len..];
        loop {
            let mut label = None;
            if let Some(after) = rest.trim_start().strip_prefix('|') {
                let end = after.find('|').ok_or_else(|| {
                    SyncError::malformed_graph(number, "edge label missing closing '|'")
                })?;
                label = Some(decode_entities(after[..end].trim()));
                rest = &after[end + 1..];
            }

            let next = EdgeKind::find(rest);
            let target_text = next.map_or(rest, |(at, _, _)| &rest[..at]);
            let target = NodeSpec::parse(number, target_text)?;

            let edge = GraphEdge {
                source: source.id.to_string(),
                target: target.id.to_string(),
                label,
                kind,
            };
            self.intern(source);
            self.intern(target.clone());
            self.edges.push(edge);

            match next {
                Some((at, len, next_kind)) => {
                    source = target;
                    kind = next_kind;
                    rest = &rest[at + len..];
                }
                None => return Ok(true),
            }
        }
    }

    /// Ensure a node with `id` exists, labelled with its own id if new
    fn ensure_node(&mut self, id: &str) {
        if self.node(id).is_none() {
            self.nodes.push(GraphNode::new(id, id));
        }
    }
}

/// Node reference: identifier plus optional shape/label
#[derive(Debug, Clone)]
struct NodeSpec<'a> {
    id: &'a str,
    shape: Option<(NodeShape, String)>,
}

impl<'a> NodeSpec<'a> {
    fn parse(number: usize, raw: &'a str) -> Result<Self, SyncError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SyncError::malformed_graph(number, "empty node reference"));
        }

        let id_end = trimmed
            .find(['[', '(', '{'])
            .unwrap_or(trimmed.len());
        let id = trimmed[..id_end].trim();
        if id.is_empty() || id.contains(char::is_whitespace) {
            return Err(SyncError::malformed_graph(
                number,
                format!("invalid node reference '{trimmed}'"),
            ));
        }

        let remainder = trimmed[id_end..].trim();
        if remainder.is_empty() {
            return Ok(Self { id, shape: None });
        }
        let (shape, label) = NodeShape::parse(remainder).ok_or_else(|| {
            SyncError::malformed_graph(number, format!("unterminated label in '{trimmed}'"))
        })?;

        Ok(Self {
            id,
            shape: Some((shape, unescape_label(label))),
        })
    }
}

fn parse_graph_header(number: usize, line: &str) -> Result<String, SyncError> {
    let mut parts = line.split_whitespace();
    let keyword = parts.next().unwrap_or_default();
    if keyword != "graph" && keyword != "flowchart" {
        return Err(SyncError::malformed_graph(
            number,
            format!("expected 'graph' header, found '{keyword}'"),
        ));
    }

    let direction = parts
        .next()
        .unwrap_or(DEFAULT_DIRECTION)
        .to_ascii_uppercase();
    if !DIRECTIONS.contains(&direction.as_str()) {
        return Err(SyncError::malformed_graph(
            number,
            format!("unsupported direction '{direction}'"),
        ));
    }
    Ok(direction)
}

/// Characters written as `#name;` entities; `#` itself comes first
const ENTITIES: [(char, &str); 5] = [
    ('#', "#35;"),
    ('"', "#quot;"),
    ('|', "#124;"),
    ('\n', "#10;"),
    ('\r', "#13;"),
];

/// Quote a node label unless it is plain text that parses back unchanged
fn escape_label(label: &str) -> String {
    let plain = label == label.trim()
        && !label.contains(['[', ']', '(', ')', '{', '}', '|', '"', '#', '\n', '\r'])
        && EdgeKind::PATTERNS
            .iter()
            .all(|(arrow, _)| !label.contains(arrow));
    if plain {
        label.to_string()
    } else {
        format!("\"{}\"", encode_entities(label, &['"', '\n', '\r']))
    }
}

fn unescape_label(label: &str) -> String {
    label
        .strip_prefix('"')
        .and_then(|l| l.strip_suffix('"'))
        .map_or_else(|| label.to_string(), decode_entities)
}

/// Replace `#` and every char in `special` with its entity
fn encode_entities(text: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ENTITIES
            .iter()
            .find(|(c, _)| *c == ch && (ch == '#' || special.contains(c)))
        {
            Some((_, entity)) => out.push_str(entity),
            None => out.push(ch),
        }
    }
    out
}

/// Single pass, so a decoded `#` never starts another entity
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find('#') {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];
        match ENTITIES.iter().find(|(_, entity)| tail.starts_with(entity)) {
            Some((ch, entity)) => {
                out.push(*ch);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('#');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Rename whitespace/comma separated tokens that are outline ids
fn rename_tokens(line: &str, renames: &RenameMap) -> String {
    let mut out = String::with_capacity(line.len());
    let mut token = String::new();
    let flush = |token: &mut String, out: &mut String| {
        out.push_str(&rename_str(token, renames));
        token.clear();
    };
    for ch in line.chars() {
        if ch.is_whitespace() || ch == ',' {
            flush(&mut token, &mut out);
            out.push(ch);
        } else {
            token.push(ch);
        }
    }
    flush(&mut token, &mut out);
    out
}

fn rename_str(id: &str, renames: &RenameMap) -> String {
    match id.parse::<NodeId>() {
        Ok(parsed) => renames
            .get(&parsed)
            .map_or_else(|| id.to_string(), ToString::to_string),
        Err(_) => id.to_string(),
    }
}

/// Synchronizer for [`OutlineGraph`]
#[derive(Debug, Clone)]
pub struct GraphSynchronizer {
    top_level_anchor: String,
}

impl GraphSynchronizer {
    /// Create graph synchronizer using `top_level_anchor` as the parent of
    /// top-level nodes with no incoming edge
    #[must_use]
    pub fn new(top_level_anchor: impl Into<String>) -> Self {
        Self {
            top_level_anchor: top_level_anchor.into(),
        }
    }

    fn parent_for(&self, graph: &OutlineGraph, placement: &Placement) -> String {
        match placement {
            Placement::Child { parent } => parent.to_string(),
            Placement::LeftSibling { before: anchor } | Placement::RightSibling { after: anchor } => graph
                .parent_of(&anchor.to_string())
                .map_or_else(|| self.top_level_anchor.clone(), ToString::to_string),
        }
    }
}

impl Default for GraphSynchronizer {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_LEVEL_ANCHOR)
    }
}

impl ViewSynchronizer for GraphSynchronizer {
    type View = OutlineGraph;

    fn name(&self) -> &'static str {
        "graph"
    }

    fn apply_renames(
        &self,
        view: &OutlineGraph,
        renames: &RenameMap,
    ) -> Result<OutlineGraph, SyncError> {
        let nodes: Vec<GraphNode> = view
            .nodes
            .iter()
            .map(|n| GraphNode {
                id: rename_str(&n.id, renames),
                ..n.clone()
            })
            .collect();

        let distinct: BTreeSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        if distinct.len() != nodes.len() {
            return Err(SyncError::RenameCollapsed {
                view: self.name(),
                expected: nodes.len(),
                actual: distinct.len(),
            });
        }

        let edges = view
            .edges
            .iter()
            .map(|e| GraphEdge {
                source: rename_str(&e.source, renames),
                target: rename_str(&e.target, renames),
                ..e.clone()
            })
            .collect();

        let directives = view
            .directives
            .iter()
            .map(|d| rename_tokens(d, renames))
            .collect();

        Ok(OutlineGraph {
            direction: view.direction.clone(),
            nodes,
            edges,
            directives,
        })
    }

    fn insert(&self, view: &OutlineGraph, plan: &InsertionPlan) -> Result<OutlineGraph, SyncError> {
        let new_id = plan.new_id.to_string();
        if view.node(&new_id).is_some() {
            return Err(SyncError::AlreadyPresent {
                view: self.name(),
                id: plan.new_id.clone(),
            });
        }

        let parent = self.parent_for(view, &plan.placement);
        let mut updated = view.clone();
        updated.ensure_node(&parent);
        updated.nodes.push(GraphNode::new(new_id.clone(), plan.label.clone()));
        updated.edges.push(GraphEdge::new(parent.clone(), new_id));

        tracing::trace!(new_id = %plan.new_id, %parent, "inserted graph node");
        Ok(updated)
    }

    fn node_ids(&self, view: &OutlineGraph) -> BTreeSet<NodeId> {
        view.outline_ids()
    }
}
