//! Service configuration

use crate::error::ConfigError;
use graft_ident::NodeId;
use graft_tree::DanglingPrefixPolicy;
use graft_views::{
    GraphSynchronizer, SiblingAnchor, TableSynchronizer, TextSynchronizer,
    DEFAULT_ADDED_ROLE, DEFAULT_TOP_LEVEL_ANCHOR,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Label used when a request carries an empty one
pub const DEFAULT_LABEL: &str = "New node";

/// Insertion service configuration
///
/// Every field has a default, so a TOML file only needs the settings it
/// changes:
///
/// ```toml
/// sibling_anchor = "region_end"
/// dangling_prefix = "reject"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraftConfig {
    /// Where right-sibling insertions land in the text
    pub sibling_anchor: SiblingAnchor,
    /// Handling of ids whose parent prefix is absent
    pub dangling_prefix: DanglingPrefixPolicy,
    /// Graph parent for top-level nodes without an incoming edge
    pub top_level_anchor: String,
    /// Label for requests that omit one
    pub default_label: String,
    /// Semantic role recorded for inserted table entries
    pub added_role: String,
    /// Require the three views to hold identical id sets after every insertion
    pub strict_consistency: bool,
}

impl GraftConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With right-sibling anchor
    #[inline]
    #[must_use]
    pub fn with_sibling_anchor(mut self, anchor: SiblingAnchor) -> Self {
        self.sibling_anchor = anchor;
        self
    }

    /// With dangling prefix policy
    #[inline]
    #[must_use]
    pub fn with_dangling_prefix(mut self, policy: DanglingPrefixPolicy) -> Self {
        self.dangling_prefix = policy;
        self
    }

    /// With top-level graph anchor
    #[inline]
    #[must_use]
    pub fn with_top_level_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.top_level_anchor = anchor.into();
        self
    }

    /// With default label
    #[inline]
    #[must_use]
    pub fn with_default_label(mut self, label: impl Into<String>) -> Self {
        self.default_label = label.into();
        self
    }

    /// With role for inserted entries
    #[inline]
    #[must_use]
    pub fn with_added_role(mut self, role: impl Into<String>) -> Self {
        self.added_role = role.into();
        self
    }

    /// With strict cross-view consistency
    #[inline]
    #[must_use]
    pub fn with_strict_consistency(mut self, strict: bool) -> Self {
        self.strict_consistency = strict;
        self
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] for unusable values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// As [`GraftConfig::from_toml_str`], plus [`ConfigError::Io`]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Check field values
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first bad field
    pub fn validate(&self) -> Result<(), ConfigError> {
        let anchor = self.top_level_anchor.as_str();
        if anchor.is_empty() || anchor.contains(|c: char| c.is_whitespace() || "[](){}|".contains(c)) {
            return Err(ConfigError::Invalid {
                field: "top_level_anchor",
                reason: format!("'{anchor}' is not a usable graph node id"),
            });
        }
        if anchor.parse::<NodeId>().is_ok() {
            return Err(ConfigError::Invalid {
                field: "top_level_anchor",
                reason: format!("'{anchor}' would be read as an outline id"),
            });
        }
        if self.default_label.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "default_label",
                reason: "must not be blank".to_string(),
            });
        }
        Ok(())
    }

    /// Text synchronizer for these settings
    #[must_use]
    pub fn text_synchronizer(&self) -> TextSynchronizer {
        TextSynchronizer::new(self.sibling_anchor)
    }

    /// Table synchronizer for these settings
    #[must_use]
    pub fn table_synchronizer(&self) -> TableSynchronizer {
        TableSynchronizer::new(self.added_role.clone())
    }

    /// Graph synchronizer for these settings
    #[must_use]
    pub fn graph_synchronizer(&self) -> GraphSynchronizer {
        GraphSynchronizer::new(self.top_level_anchor.clone())
    }
}

impl Default for GraftConfig {
    fn default() -> Self {
        Self {
            sibling_anchor: SiblingAnchor::SubtreeEnd,
            dangling_prefix: DanglingPrefixPolicy::Promote,
            top_level_anchor: DEFAULT_TOP_LEVEL_ANCHOR.to_string(),
            default_label: DEFAULT_LABEL.to_string(),
            added_role: DEFAULT_ADDED_ROLE.to_string(),
            strict_consistency: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = GraftConfig::default();
        assert_eq!(config.sibling_anchor, SiblingAnchor::SubtreeEnd);
        assert_eq!(config.dangling_prefix, DanglingPrefixPolicy::Promote);
        assert_eq!(config.top_level_anchor, "ROOT");
        assert_eq!(config.default_label, "New node");
        assert_eq!(config.added_role, "added node");
        assert!(config.strict_consistency);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_chain() {
        let config = GraftConfig::new()
            .with_sibling_anchor(SiblingAnchor::RegionEnd)
            .with_dangling_prefix(DanglingPrefixPolicy::Reject)
            .with_top_level_anchor("TOP")
            .with_default_label("Untitled")
            .with_added_role("inserted")
            .with_strict_consistency(false);

        assert_eq!(config.sibling_anchor, SiblingAnchor::RegionEnd);
        assert_eq!(config.top_level_anchor, "TOP");
        assert_eq!(config.added_role, "inserted");
        assert!(!config.strict_consistency);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = GraftConfig::from_toml_str(
            "sibling_anchor = \"region_end\"\ndangling_prefix = \"reject\"\n",
        )
        .unwrap();
        assert_eq!(config.sibling_anchor, SiblingAnchor::RegionEnd);
        assert_eq!(config.dangling_prefix, DanglingPrefixPolicy::Reject);
        assert_eq!(config.default_label, DEFAULT_LABEL);
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = GraftConfig::from_toml_str("sibling_anker = \"region_end\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn numeric_anchor_rejected() {
        let zero = GraftConfig::from_toml_str("top_level_anchor = \"0.1\"");
        assert!(zero.is_ok(), "0.1 is not a valid outline id");

        let err = GraftConfig::from_toml_str("top_level_anchor = \"7\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "top_level_anchor",
                ..
            }
        ));

        let err = GraftConfig::from_toml_str("top_level_anchor = \"A B\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn blank_label_rejected() {
        let err = GraftConfig::from_toml_str("default_label = \"  \"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "default_label",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "added_role = \"inserted\"").unwrap();

        let config = GraftConfig::load(file.path()).await.unwrap();
        assert_eq!(config.added_role, "inserted");

        let missing = GraftConfig::load(file.path().with_extension("absent")).await;
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
