//! Dotted-sequence node identifiers
//!
//! Provides [`NodeId`] plus the [`parse`] / [`compose`] pair used by the
//! outline tree and the view synchronizers.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Identifier of an outline node
///
/// A non-empty sequence of positive integers. The last component is the
/// node's sequence among its siblings; everything before it is the parent
/// prefix.
///
/// # Examples
/// - `[2]` → `2` (top-level)
/// - `[2, 1, 3]` → `2.1.3` (third child of `2.1`)
///
/// Ordering is numeric and component-wise, so `2.9` sorts before `2.10`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(Vec<u32>);

impl NodeId {
    /// Create a top-level identifier
    ///
    /// # Errors
    /// Returns error if `sequence` is zero
    pub fn top_level(sequence: u32) -> Result<Self, IdentError> {
        Self::from_components(vec![sequence])
    }

    /// Create identifier from raw components
    ///
    /// # Errors
    /// Returns error if `components` is empty or contains a zero
    pub fn from_components(components: Vec<u32>) -> Result<Self, IdentError> {
        if components.is_empty() {
            return Err(IdentError::Empty);
        }
        if components.contains(&0) {
            return Err(IdentError::NotPositive(
                components
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join("."),
            ));
        }
        Ok(Self(components))
    }

    /// Get components from root to leaf
    #[inline]
    #[must_use]
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Number of components (1 for top-level nodes)
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Check if this is a top-level identifier
    #[inline]
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.0.len() == 1
    }

    /// Sequence number among siblings (last component)
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> u32 {
        // Non-empty by construction
        self.0[self.0.len() - 1]
    }

    /// Parent prefix, `None` for top-level identifiers
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> Option<Self> {
        if self.is_top_level() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Append a child sequence, returning new identifier
    ///
    /// # Errors
    /// Returns error if `sequence` is zero
    pub fn child(&self, sequence: u32) -> Result<Self, IdentError> {
        if sequence == 0 {
            return Err(IdentError::NotPositive(format!("{self}.0")));
        }
        let mut components = self.0.clone();
        components.push(sequence);
        Ok(Self(components))
    }

    /// Same prefix, sequence shifted by `delta`
    ///
    /// # Errors
    /// Returns error if the shifted sequence overflows
    pub fn shifted(&self, delta: u32) -> Result<Self, IdentError> {
        let sequence = self
            .sequence()
            .checked_add(delta)
            .ok_or_else(|| IdentError::SequenceOverflow(self.to_string()))?;
        compose(self.prefix().as_ref(), sequence)
    }

    /// Check if this identifier is a prefix of another (or equal to it)
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Check if this identifier is a strict ancestor of another
    ///
    /// `2.1` is an ancestor of `2.1.3` but not of `2.10` or of itself.
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

impl FromStr for NodeId {
    type Err = IdentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdentError::Empty);
        }

        let components = s
            .split('.')
            .map(|seg| parse_component(s, seg))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(components))
    }
}

impl TryFrom<String> for NodeId {
    type Error = IdentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<&str> for NodeId {
    type Error = IdentError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.to_string()
    }
}

fn parse_component(whole: &str, seg: &str) -> Result<u32, IdentError> {
    if seg.is_empty() {
        return Err(IdentError::EmptySegment(whole.to_string()));
    }
    if !seg.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IdentError::InvalidSegment {
            id: whole.to_string(),
            segment: seg.to_string(),
        });
    }
    if seg.len() > 1 && seg.starts_with('0') {
        return Err(IdentError::LeadingZero(whole.to_string()));
    }
    let value: u32 = seg.parse().map_err(|_| IdentError::InvalidSegment {
        id: whole.to_string(),
        segment: seg.to_string(),
    })?;
    if value == 0 {
        return Err(IdentError::NotPositive(whole.to_string()));
    }
    Ok(value)
}

/// Split an identifier into parent prefix and sequence
///
/// # Errors
/// Returns [`IdentError`] if any component is not a positive integer
pub fn parse(id: &str) -> Result<(Option<NodeId>, u32), IdentError> {
    let id: NodeId = id.parse()?;
    Ok((id.prefix(), id.sequence()))
}

/// Build an identifier from parent prefix and sequence
///
/// `compose(Some("2.1"), 4)` is `2.1.4`; `compose(None, 4)` is `4`.
///
/// # Errors
/// Returns [`IdentError::NotPositive`] if `sequence` is zero
pub fn compose(prefix: Option<&NodeId>, sequence: u32) -> Result<NodeId, IdentError> {
    match prefix {
        Some(prefix) => prefix.child(sequence),
        None => NodeId::top_level(sequence),
    }
}

/// Errors related to node identifiers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentError {
    /// Empty identifier string
    #[error("identifier is empty")]
    Empty,

    /// Empty segment such as `2..1`
    #[error("identifier '{0}' contains an empty segment")]
    EmptySegment(String),

    /// Segment is not a decimal number
    #[error("identifier '{id}' has non-numeric segment '{segment}'")]
    InvalidSegment { id: String, segment: String },

    /// Segment written with leading zeros
    #[error("identifier '{0}' has a segment with leading zeros")]
    LeadingZero(String),

    /// Segment is zero
    #[error("identifier '{0}' has a non-positive segment")]
    NotPositive(String),

    /// Sequence increment overflowed
    #[error("sequence overflow shifting '{0}'")]
    SequenceOverflow(String),
}

impl IdentError {
    /// The offending identifier text, when there is one
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::EmptySegment(id)
            | Self::LeadingZero(id)
            | Self::NotPositive(id)
            | Self::SequenceOverflow(id)
            | Self::InvalidSegment { id, .. } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(s: &str) -> NodeId {
        s.parse().unwrap()
    }

    #[test]
    fn parse_top_level() {
        let (prefix, seq) = parse("3").unwrap();
        assert!(prefix.is_none());
        assert_eq!(seq, 3);
    }

    #[test]
    fn parse_nested() {
        let (prefix, seq) = parse("2.1.3").unwrap();
        assert_eq!(prefix, Some(id("2.1")));
        assert_eq!(seq, 3);
    }

    #[test]
    fn parse_rejects_non_numeric() {
        let result = parse("2.a");
        assert!(matches!(result, Err(IdentError::InvalidSegment { .. })));
    }

    #[test]
    fn parse_rejects_zero() {
        assert!(matches!(parse("2.0"), Err(IdentError::NotPositive(_))));
        assert!(matches!(parse("0"), Err(IdentError::NotPositive(_))));
    }

    #[test]
    fn parse_rejects_empty_segments() {
        assert!(matches!(parse(""), Err(IdentError::Empty)));
        assert!(matches!(parse("2..1"), Err(IdentError::EmptySegment(_))));
        assert!(matches!(parse("2."), Err(IdentError::EmptySegment(_))));
        assert!(matches!(parse(".2"), Err(IdentError::EmptySegment(_))));
    }

    #[test]
    fn parse_rejects_leading_zero_and_sign() {
        assert!(matches!(parse("02"), Err(IdentError::LeadingZero(_))));
        assert!(matches!(parse("+2"), Err(IdentError::InvalidSegment { .. })));
        assert!(matches!(parse("-1"), Err(IdentError::InvalidSegment { .. })));
        assert!(matches!(parse(" 1"), Err(IdentError::InvalidSegment { .. })));
    }

    #[test]
    fn compose_with_and_without_prefix() {
        assert_eq!(compose(Some(&id("2.1")), 4).unwrap().to_string(), "2.1.4");
        assert_eq!(compose(None, 12).unwrap().to_string(), "12");
    }

    #[test]
    fn compose_rejects_zero_sequence() {
        assert_eq!(
            compose(Some(&id("2.1")), 0),
            Err(IdentError::NotPositive("2.1.0".to_string()))
        );
        assert!(matches!(compose(None, 0), Err(IdentError::NotPositive(_))));
    }

    #[test]
    fn ordering_is_numeric() {
        let mut ids = vec![id("2.10"), id("2.9"), id("10"), id("2"), id("2.1")];
        ids.sort();
        let rendered: Vec<_> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["2", "2.1", "2.9", "2.10", "10"]);
    }

    #[test]
    fn ancestor_is_component_wise() {
        assert!(id("2.1").is_ancestor_of(&id("2.1.3")));
        assert!(!id("2.1").is_ancestor_of(&id("2.10")));
        assert!(!id("2.1").is_ancestor_of(&id("2.1")));
        assert!(id("2.1").is_prefix_of(&id("2.1")));
    }

    #[test]
    fn shifted_keeps_prefix() {
        assert_eq!(id("2.2").shifted(1).unwrap(), id("2.3"));
        assert_eq!(id("3").shifted(1).unwrap(), id("4"));
        let max = NodeId::top_level(u32::MAX).unwrap();
        assert!(matches!(max.shifted(1), Err(IdentError::SequenceOverflow(_))));
    }

    #[test]
    fn child_and_prefix() {
        let child = id("2").child(5).unwrap();
        assert_eq!(child, id("2.5"));
        assert_eq!(child.prefix(), Some(id("2")));
        assert!(id("2").child(0).is_err());
    }

    #[test]
    fn serde_as_string() {
        let json = serde_json::to_string(&id("1.2")).unwrap();
        assert_eq!(json, "\"1.2\"");
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id("1.2"));
        assert!(serde_json::from_str::<NodeId>("\"1.x\"").is_err());
    }

    #[test]
    fn error_exposes_identifier() {
        let err = parse("4.b").unwrap_err();
        assert_eq!(err.identifier(), "4.b");
    }

    proptest! {
        #[test]
        fn prop_display_parse_agree(components in proptest::collection::vec(1u32..10_000, 1..6)) {
            let original = NodeId::from_components(components).unwrap();
            let reparsed: NodeId = original.to_string().parse().unwrap();
            prop_assert_eq!(reparsed, original);
        }

        #[test]
        fn prop_compose_inverts_parse(components in proptest::collection::vec(1u32..10_000, 1..6)) {
            let original = NodeId::from_components(components).unwrap();
            let (prefix, seq) = parse(&original.to_string()).unwrap();
            prop_assert_eq!(compose(prefix.as_ref(), seq).unwrap(), original);
        }
    }
}
