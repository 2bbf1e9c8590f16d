//! Graph Configuration
//!
//! Tunables for propagation and project loading. Usually embedded in the
//! editor's settings file and deserialized from JSON.

use serde::{Deserialize, Serialize};

/// Behavior switches for a [`NodeGraph`](crate::graph::NodeGraph).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Visit each downstream node at most once per invalidation.
    ///
    /// Off by default: a node reachable along two paths is invalidated
    /// twice, so observers see one event per path.
    pub deduplicate_invalidation: bool,

    /// Invalidate the destination node over the whole timeline whenever an
    /// edge into it is added or removed.
    pub invalidate_on_topology_change: bool,

    /// Fail a project load if any connection or block link was skipped.
    pub strict_links: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            deduplicate_invalidation: false,
            invalidate_on_topology_change: true,
            strict_links: false,
        }
    }
}

impl GraphConfig {
    /// Parse a config from a JSON string. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let config = GraphConfig::from_json(r#"{ "strict_links": true }"#).unwrap();
        assert!(config.strict_links);
        assert!(config.invalidate_on_topology_change);
        assert!(!config.deduplicate_invalidation);
    }

    #[test]
    fn test_parse_empty_config() {
        assert_eq!(GraphConfig::from_json("{}").unwrap(), GraphConfig::default());
    }

    #[test]
    fn test_unknown_field_types_are_errors() {
        assert!(GraphConfig::from_json(r#"{ "strict_links": "yes" }"#).is_err());
    }
}
