//! Typed reads over the stringly value tree
//!
//! Every failure carries the full dotted path of the offending key.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::de::DeserializeOwned;

use crate::error::ValuesError;
use crate::path;
use crate::tree::{flat_strings, Table, Value, ValueTree};

/// A view of one mapping in the tree. Absent mappings read as empty.
#[derive(Clone, Debug)]
pub(crate) struct Scope<'a> {
    table: Option<&'a Table>,
    path: String,
}

impl<'a> Scope<'a> {
    pub fn root(tree: &'a ValueTree) -> Self {
        Self {
            table: Some(tree.root()),
            path: String::new(),
        }
    }

    pub fn key_path(&self, key: &str) -> String {
        path::join(&self.path, key)
    }

    /// Descend into a nested mapping
    pub fn child(&self, key: &str) -> Result<Scope<'a>, ValuesError> {
        let path = self.key_path(key);
        match self.table.and_then(|t| t.get(key)) {
            None => Ok(Scope { table: None, path }),
            Some(Value::Table(table)) => Ok(Scope {
                table: Some(table),
                path,
            }),
            Some(Value::Scalar(_)) => Err(ValuesError::invalid_value(
                path,
                "expected a mapping, found a scalar",
            )),
        }
    }

    fn scalar(&self, key: &str) -> Result<Option<&'a str>, ValuesError> {
        match self.table.and_then(|t| t.get(key)) {
            None => Ok(None),
            Some(Value::Scalar(s)) => Ok(Some(s.as_str())),
            Some(Value::Table(_)) => Err(ValuesError::invalid_value(
                self.key_path(key),
                "expected a scalar, found a mapping",
            )),
        }
    }

    /// A string that may be absent; empty strings read as absent
    pub fn optional_string(&self, key: &str) -> Result<Option<String>, ValuesError> {
        Ok(self
            .scalar(key)?
            .filter(|s| !s.is_empty())
            .map(str::to_string))
    }

    /// A required, non-empty string
    pub fn string(&self, key: &str) -> Result<String, ValuesError> {
        self.optional_string(key)?
            .ok_or_else(|| ValuesError::missing(self.key_path(key)))
    }

    /// A boolean that may be absent
    pub fn optional_bool(&self, key: &str) -> Result<Option<bool>, ValuesError> {
        match self.scalar(key)? {
            None | Some("") => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(other) => Err(ValuesError::invalid_value(
                self.key_path(key),
                format!("expected true or false, found '{other}'"),
            )),
        }
    }

    /// A boolean with a fallback
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ValuesError> {
        Ok(self.optional_bool(key)?.unwrap_or(default))
    }

    /// A value parsed with `FromStr` that may be absent
    pub fn parse_optional<T>(&self, key: &str) -> Result<Option<T>, ValuesError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional_string(key)? {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|e| ValuesError::invalid_value(self.key_path(key), e.to_string())),
        }
    }

    /// A required value parsed with `FromStr`
    pub fn parse<T>(&self, key: &str) -> Result<T, ValuesError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.parse_optional(key)?
            .ok_or_else(|| ValuesError::missing(self.key_path(key)))
    }

    /// A flat `string -> string` mapping; absent reads as empty
    pub fn string_map(&self, key: &str) -> Result<BTreeMap<String, String>, ValuesError> {
        let child = self.child(key)?;
        match child.table {
            None => Ok(BTreeMap::new()),
            Some(table) => flat_strings(table, &child.path),
        }
    }

    /// A list given as JSON text (values files store sequences this way)
    pub fn json_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, ValuesError> {
        match self.optional_string(key)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                ValuesError::invalid_value(self.key_path(key), format!("expected a JSON list: {e}"))
            }),
        }
    }

    /// A list of strings written either as a comma-separated string
    /// (`a, b`) or as a sequence in a values file (stored as JSON text).
    /// Blank entries are dropped; absent reads as empty.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>, ValuesError> {
        let Some(raw) = self.optional_string(key)? else {
            return Ok(Vec::new());
        };
        let items = if raw.trim_start().starts_with('[') {
            serde_json::from_str::<Vec<String>>(&raw).map_err(|e| {
                ValuesError::invalid_value(
                    self.key_path(key),
                    format!("expected a list of strings: {e}"),
                )
            })?
        } else {
            raw.split(',').map(str::to_string).collect()
        };
        Ok(items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerSource, ValueLayer};

    fn tree(pairs: &[(&str, &str)]) -> ValueTree {
        ValueTree::merge(&[ValueLayer::from_pairs(LayerSource::SetArgs, pairs.iter().copied()).unwrap()])
            .unwrap()
    }

    #[test]
    fn reads_scalars_with_full_paths_in_errors() {
        let tree = tree(&[("server.replicaCount", "three"), ("server.enabled", "yes")]);
        let server = Scope::root(&tree).child("server").unwrap();

        let err = server.parse::<u32>("replicaCount").unwrap_err();
        assert!(matches!(err, ValuesError::InvalidValue { ref path, .. } if path == "server.replicaCount"));

        let err = server.bool_or("enabled", true).unwrap_err();
        assert!(err.to_string().contains("server.enabled"));
    }

    #[test]
    fn absent_values_fall_back() {
        let tree = tree(&[]);
        let server = Scope::root(&tree).child("server").unwrap();
        assert!(server.bool_or("enabled", true).unwrap());
        assert!(server.string_map("podLabels").unwrap().is_empty());
        assert!(server.json_list::<serde_json::Value>("tolerations").unwrap().is_empty());
        assert!(matches!(
            server.string("name"),
            Err(ValuesError::MissingValue { path }) if path == "server.name"
        ));
    }

    #[test]
    fn empty_string_reads_as_absent() {
        let tree = tree(&[("server.sql.port", "")]);
        let sql = Scope::root(&tree).child("server").unwrap().child("sql").unwrap();
        assert_eq!(sql.parse_optional::<u16>("port").unwrap(), None);
    }

    #[test]
    fn scalar_where_mapping_expected() {
        let tree = tree(&[("server", "on")]);
        assert!(Scope::root(&tree).child("server").is_err());
    }

    #[test]
    fn json_list_rejects_non_lists() {
        let tree = tree(&[("server.additionalEnv", "not json")]);
        let server = Scope::root(&tree).child("server").unwrap();
        assert!(server.json_list::<serde_json::Value>("additionalEnv").is_err());
    }

    #[test]
    fn parse_failures_name_the_target_type_path() {
        let tree = tree(&[("server.sql.port", "99999"), ("server.sql.maxConns", "-1")]);
        let sql = Scope::root(&tree).child("server").unwrap().child("sql").unwrap();

        assert!(matches!(
            sql.parse_optional::<u16>("port"),
            Err(ValuesError::InvalidValue { path, .. }) if path == "server.sql.port"
        ));
        assert!(matches!(
            sql.parse::<u32>("maxConns"),
            Err(ValuesError::InvalidValue { path, .. }) if path == "server.sql.maxConns"
        ));
        assert_eq!(sql.parse_optional::<i64>("maxConns").unwrap(), Some(-1));
    }

    // =========================================================================
    // Story: host lists accept both spellings
    // =========================================================================

    #[test]
    fn string_list_splits_commas() {
        let tree = tree(&[("db.hosts", "cass-0, cass-1,,")]);
        let db = Scope::root(&tree).child("db").unwrap();
        assert_eq!(db.string_list("hosts").unwrap(), vec!["cass-0", "cass-1"]);
        assert!(db.string_list("seeds").unwrap().is_empty());
    }

    #[test]
    fn string_list_decodes_sequences() {
        let tree = tree(&[("db.hosts", r#"["cass-0"," cass-1 "]"#)]);
        let db = Scope::root(&tree).child("db").unwrap();
        assert_eq!(db.string_list("hosts").unwrap(), vec!["cass-0", "cass-1"]);
    }

    #[test]
    fn string_list_rejects_non_string_sequences() {
        let tree = tree(&[("db.hosts", r#"[{"host":"cass-0"}]"#)]);
        let db = Scope::root(&tree).child("db").unwrap();
        assert!(matches!(
            db.string_list("hosts"),
            Err(ValuesError::InvalidValue { path, .. }) if path == "db.hosts"
        ));
    }
}
