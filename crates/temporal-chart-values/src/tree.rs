//! The merged value tree
//!
//! Layers are applied lowest precedence first. Writing a leaf walks (and
//! creates) the intermediate mappings, so sibling keys from different layers
//! are unioned and only the exact leaf is overwritten. A key that is a scalar
//! in one place and a mapping in another is a [`ValuesError::PathCollision`].
//!
//! Leaves are opaque strings. JSON-looking text such as `[{"test":"success"}]`
//! is stored as-is and never expanded into structure.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::ValuesError;
use crate::layer::ValueLayer;
use crate::path::{self, KeyPath};

/// A mapping level of the tree
pub type Table = BTreeMap<String, Value>;

/// A node of the value tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Leaf holding an opaque string
    Scalar(String),
    /// Nested mapping
    Table(Table),
}

impl Value {
    /// The scalar text, if this is a leaf
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::Table(_) => None,
        }
    }

    /// The nested mapping, if this is not a leaf
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            Value::Scalar(_) => None,
        }
    }
}

/// Deep-merged configuration built from ordered layers
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValueTree {
    root: Table,
}

impl ValueTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge layers ordered from lowest to highest precedence.
    ///
    /// Aborts on the first collision; no partially merged tree is returned.
    pub fn merge(layers: &[ValueLayer]) -> Result<Self, ValuesError> {
        let mut tree = Self::new();
        for layer in layers {
            tree.apply(layer)?;
        }
        Ok(tree)
    }

    /// Apply one layer on top of the current contents
    pub fn apply(&mut self, layer: &ValueLayer) -> Result<(), ValuesError> {
        debug!(source = %layer.source(), entries = layer.len(), "applying value layer");
        for (path, value) in layer.entries() {
            self.set(path, value.clone())?;
        }
        Ok(())
    }

    /// Write a single leaf, creating intermediate mappings as needed
    pub fn set(&mut self, path: &KeyPath, value: impl Into<String>) -> Result<(), ValuesError> {
        let Some((leaf, parents)) = path.segments().split_last() else {
            return Err(ValuesError::invalid_path(path.to_string(), "path is empty"));
        };

        let mut table = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = table
                .entry(segment.clone())
                .or_insert_with(|| Value::Table(Table::new()));
            table = match entry {
                Value::Table(t) => t,
                Value::Scalar(_) => {
                    return Err(ValuesError::PathCollision {
                        path: path.to_string(),
                        conflict: path.prefix(depth + 1).to_string(),
                    })
                }
            };
        }

        if let Some(Value::Table(_)) = table.get(leaf) {
            return Err(ValuesError::PathCollision {
                path: path.to_string(),
                conflict: path.to_string(),
            });
        }
        table.insert(leaf.clone(), Value::Scalar(value.into()));
        Ok(())
    }

    /// Look up a node by literal segments
    pub fn lookup(&self, segments: &[&str]) -> Option<&Value> {
        let (first, rest) = segments.split_first()?;
        let mut node = self.root.get(*first)?;
        for segment in rest {
            node = node.as_table()?.get(*segment)?;
        }
        Some(node)
    }

    /// The top-level mapping
    pub fn root(&self) -> &Table {
        &self.root
    }

    /// Deep-merge the mappings found at several locations of this tree.
    ///
    /// Scopes are ordered lowest precedence first; absent scopes are skipped.
    /// A scope that holds a scalar instead of a mapping is an invalid value.
    pub fn merge_tables(&self, scopes: &[&[&str]]) -> Result<Table, ValuesError> {
        let mut merged = Table::new();
        for scope in scopes {
            match self.lookup(scope) {
                None => {}
                Some(Value::Table(table)) => deep_merge(&mut merged, table, &scope.join("."))?,
                Some(Value::Scalar(_)) => {
                    return Err(ValuesError::invalid_value(
                        scope.join("."),
                        "expected a mapping, found a scalar",
                    ))
                }
            }
        }
        Ok(merged)
    }

    /// Merge flat string maps found at several scopes.
    ///
    /// This is the label/annotation primitive: with scopes
    /// `[server.podLabels, server.frontend.podLabels]` a key set in both
    /// resolves to the frontend value while keys set in only one survive.
    ///
    /// A nested mapping is reported under the scope that holds it.
    pub fn merge_scopes(&self, scopes: &[&[&str]]) -> Result<BTreeMap<String, String>, ValuesError> {
        let mut merged = BTreeMap::new();
        for scope in scopes {
            let at = scope.join(".");
            match self.lookup(scope) {
                None => {}
                Some(Value::Table(table)) => merged.extend(flat_strings(table, &at)?),
                Some(Value::Scalar(_)) => {
                    return Err(ValuesError::invalid_value(at, "expected a mapping, found a scalar"))
                }
            }
        }
        Ok(merged)
    }
}

/// Recursively merge `from` into `into`; `from` wins at matching leaves.
pub fn deep_merge(into: &mut Table, from: &Table, at: &str) -> Result<(), ValuesError> {
    for (key, value) in from {
        let here = path::join(at, key);
        if let Some(existing) = into.get_mut(key) {
            match (existing, value) {
                (Value::Table(existing), Value::Table(incoming)) => {
                    deep_merge(existing, incoming, &here)?;
                    continue;
                }
                (Value::Scalar(_), Value::Scalar(_)) => {}
                _ => {
                    return Err(ValuesError::PathCollision {
                        path: here.clone(),
                        conflict: here,
                    })
                }
            }
        }
        into.insert(key.clone(), value.clone());
    }
    Ok(())
}

/// Convert a mapping whose values must all be scalars into a string map
pub fn flat_strings(table: &Table, at: &str) -> Result<BTreeMap<String, String>, ValuesError> {
    table
        .iter()
        .map(|(key, value)| match value {
            Value::Scalar(s) => Ok((key.clone(), s.clone())),
            Value::Table(_) => Err(ValuesError::invalid_value(
                path::join(at, key),
                "expected a string, found a nested mapping",
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerSource;

    fn layer(pairs: &[(&str, &str)]) -> ValueLayer {
        ValueLayer::from_pairs(LayerSource::SetArgs, pairs.iter().copied()).unwrap()
    }

    // =========================================================================
    // Story: layered overrides deep-merge
    // =========================================================================

    #[test]
    fn later_layer_wins_at_the_same_leaf() {
        let tree = ValueTree::merge(&[
            layer(&[("server.podLabels.one", "one")]),
            layer(&[("server.podLabels.one", "three")]),
        ])
        .unwrap();

        assert_eq!(
            tree.lookup(&["server", "podLabels", "one"]),
            Some(&Value::Scalar("three".to_string()))
        );
    }

    #[test]
    fn siblings_from_different_layers_are_unioned() {
        let tree = ValueTree::merge(&[
            layer(&[("server.podLabels.one", "one")]),
            layer(&[("server.podLabels.two", "two")]),
            layer(&[("server.image.tag", "1.0")]),
        ])
        .unwrap();

        let labels = tree.merge_scopes(&[&["server", "podLabels"]]).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["one"], "one");
        assert_eq!(labels["two"], "two");
        assert!(tree.lookup(&["server", "image", "tag"]).is_some());
    }

    #[test]
    fn json_looking_values_stay_opaque() {
        let raw = r#"[{"test":"success"}]"#;
        let tree = ValueTree::merge(&[layer(&[("additionalAnnotations.json", raw)])]).unwrap();

        assert_eq!(
            tree.lookup(&["additionalAnnotations", "json"])
                .and_then(Value::as_scalar),
            Some(raw)
        );
    }

    // =========================================================================
    // Story: leaf/mapping collisions are rejected, never guessed
    // =========================================================================

    #[test]
    fn scalar_then_nested_is_a_collision() {
        let err = ValueTree::merge(&[layer(&[("server.x", "a"), ("server.x.y", "b")])]).unwrap_err();
        match err {
            ValuesError::PathCollision { path, conflict } => {
                assert_eq!(path, "server.x.y");
                assert_eq!(conflict, "server.x");
            }
            other => panic!("expected PathCollision, got {other:?}"),
        }
    }

    #[test]
    fn nested_then_scalar_is_a_collision_across_layers() {
        let err = ValueTree::merge(&[layer(&[("server.x.y", "b")]), layer(&[("server.x", "a")])])
            .unwrap_err();
        assert!(matches!(err, ValuesError::PathCollision { conflict, .. } if conflict == "server.x"));
    }

    // =========================================================================
    // Story: scope merging for labels and resources
    // =========================================================================

    #[test]
    fn most_specific_scope_wins() {
        let tree = ValueTree::merge(&[layer(&[
            ("server.frontend.podLabels.one", "three"),
            ("server.podLabels.one", "one"),
            ("server.podLabels.two", "two"),
        ])])
        .unwrap();

        let labels = tree
            .merge_scopes(&[&["server", "podLabels"], &["server", "frontend", "podLabels"]])
            .unwrap();

        assert_eq!(labels["one"], "three");
        assert_eq!(labels["two"], "two");
    }

    #[test]
    fn merge_tables_is_deep() {
        let tree = ValueTree::merge(&[layer(&[
            ("server.resources.requests.cpu", "100m"),
            ("server.resources.requests.memory", "512Mi"),
            ("server.history.resources.requests.memory", "2Gi"),
        ])])
        .unwrap();

        let merged = tree
            .merge_tables(&[&["server", "resources"], &["server", "history", "resources"]])
            .unwrap();
        let requests = merged["requests"].as_table().unwrap();
        assert_eq!(requests["cpu"], Value::Scalar("100m".to_string()));
        assert_eq!(requests["memory"], Value::Scalar("2Gi".to_string()));
    }

    #[test]
    fn merge_scopes_rejects_nested_values() {
        let tree = ValueTree::merge(&[layer(&[("server.podLabels.a.b", "c")])]).unwrap();
        let err = tree.merge_scopes(&[&["server", "podLabels"]]).unwrap_err();
        assert!(matches!(err, ValuesError::InvalidValue { path, .. } if path == "server.podLabels.a"));
    }

    #[test]
    fn nested_value_is_reported_under_its_own_scope() {
        let tree = ValueTree::merge(&[layer(&[
            ("server.podLabels.team.name", "core"),
            ("server.frontend.podLabels.tier", "edge"),
        ])])
        .unwrap();

        let err = tree
            .merge_scopes(&[&["server", "podLabels"], &["server", "frontend", "podLabels"]])
            .unwrap_err();
        assert!(matches!(err, ValuesError::InvalidValue { path, .. } if path == "server.podLabels.team"));
    }

    #[test]
    fn merge_scopes_rejects_scalar_scope() {
        let tree = ValueTree::merge(&[layer(&[("server.podLabels", "oops")])]).unwrap();
        assert!(tree.merge_scopes(&[&["server", "podLabels"]]).is_err());
    }

    #[test]
    fn absent_scopes_are_empty() {
        let tree = ValueTree::new();
        assert!(tree
            .merge_scopes(&[&["additionalLabels"]])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn merging_twice_is_identical() {
        let layers = [layer(&[("a.b", "1"), ("a.c", "2")]), layer(&[("a.b", "3")])];
        assert_eq!(
            ValueTree::merge(&layers).unwrap(),
            ValueTree::merge(&layers).unwrap()
        );
    }
}
