//! Values-file parsing using yaml-rust2
//!
//! Documents are converted to `serde_json::Value` first and then flattened
//! into dotted leaf entries. Scalars keep their YAML text (`true`, `9042`),
//! sequences become compact JSON text, empty mappings and nulls contribute
//! nothing.

use serde_json::{Map, Number, Value};
use yaml_rust2::{Yaml, YamlLoader};

use crate::error::ValuesError;
use crate::path::{self, KeyPath};

/// Parse a single YAML document into a `serde_json::Value`.
///
/// Returns `Value::Null` for empty input; extra documents are ignored.
pub fn parse_yaml(input: &str, source_name: &str) -> Result<Value, ValuesError> {
    let docs = YamlLoader::load_from_str(input).map_err(|e| yaml_error(source_name, e))?;
    match docs.into_iter().next() {
        Some(doc) => Converter { source_name }.node(doc, ""),
        None => Ok(Value::Null),
    }
}

/// Flatten a parsed values document into `(path, leaf)` entries
pub fn flatten(document: Value, source_name: &str) -> Result<Vec<(KeyPath, String)>, ValuesError> {
    let mut entries = Vec::new();
    match document {
        Value::Null => {}
        Value::Object(map) => flatten_object(&mut Vec::new(), map, &mut entries)?,
        _ => {
            return Err(ValuesError::Yaml {
                source_name: source_name.to_string(),
                message: "a values document must be a mapping".to_string(),
            })
        }
    }
    Ok(entries)
}

fn flatten_object(
    prefix: &mut Vec<String>,
    map: Map<String, Value>,
    out: &mut Vec<(KeyPath, String)>,
) -> Result<(), ValuesError> {
    for (key, value) in map {
        prefix.push(key);
        match value {
            Value::Null => {}
            Value::Object(inner) => flatten_object(prefix, inner, out)?,
            Value::Array(_) => out.push((KeyPath::from_segments(prefix.iter().cloned())?, value.to_string())),
            Value::Bool(b) => out.push((KeyPath::from_segments(prefix.iter().cloned())?, b.to_string())),
            Value::Number(n) => out.push((KeyPath::from_segments(prefix.iter().cloned())?, n.to_string())),
            Value::String(s) => out.push((KeyPath::from_segments(prefix.iter().cloned())?, s)),
        }
        prefix.pop();
    }
    Ok(())
}

fn yaml_error(source_name: &str, err: impl std::fmt::Display) -> ValuesError {
    ValuesError::Yaml {
        source_name: source_name.to_string(),
        message: err.to_string(),
    }
}

/// Walks a loaded document, tracking the dotted path of the current node
/// so failures point at the offending key.
struct Converter<'a> {
    source_name: &'a str,
}

impl Converter<'_> {
    fn node(&self, node: Yaml, at: &str) -> Result<Value, ValuesError> {
        let value = match node {
            Yaml::Null => Value::Null,
            Yaml::Boolean(b) => Value::Bool(b),
            Yaml::Integer(i) => Value::from(i),
            // `.inf`, `.nan` and friends have no JSON number; keep their text
            Yaml::Real(text) => match text.parse::<f64>().ok().and_then(Number::from_f64) {
                Some(n) => Value::Number(n),
                None => Value::String(text),
            },
            Yaml::String(s) => Value::String(s),
            Yaml::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    out.push(self.node(item, &format!("{at}[{i}]"))?);
                }
                Value::Array(out)
            }
            Yaml::Hash(hash) => {
                let mut out = Map::new();
                for (key, item) in hash {
                    let key = self.key(key, at)?;
                    let here = path::join(at, &key);
                    out.insert(key, self.node(item, &here)?);
                }
                Value::Object(out)
            }
            Yaml::Alias(_) => return Err(self.error(at, "aliases are not supported")),
            Yaml::BadValue => return Err(self.error(at, "unreadable value")),
        };
        Ok(value)
    }

    /// Mapping keys must be scalars; they are used by their text
    fn key(&self, key: Yaml, at: &str) -> Result<String, ValuesError> {
        match key {
            Yaml::String(s) | Yaml::Real(s) => Ok(s),
            Yaml::Integer(i) => Ok(i.to_string()),
            Yaml::Boolean(b) => Ok(b.to_string()),
            Yaml::Null => Ok("null".to_string()),
            _ => Err(self.error(at, "mapping keys must be scalars")),
        }
    }

    fn error(&self, at: &str, message: &str) -> ValuesError {
        let at = if at.is_empty() { "<root>" } else { at };
        yaml_error(self.source_name, format!("{message} (at {at})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(input: &str) -> Vec<(String, String)> {
        let doc = parse_yaml(input, "test").unwrap();
        flatten(doc, "test")
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn nested_mappings_become_dotted_paths() {
        let entries = flat(
            r#"
server:
  replicaCount: 3
  useEntrypointScript: true
  image:
    tag: "1.27.2"
"#,
        );
        assert!(entries.contains(&("server.replicaCount".to_string(), "3".to_string())));
        assert!(entries.contains(&("server.useEntrypointScript".to_string(), "true".to_string())));
        assert!(entries.contains(&("server.image.tag".to_string(), "1.27.2".to_string())));
    }

    #[test]
    fn dotted_keys_are_escaped_in_paths() {
        let entries = flat("podAnnotations:\n  prometheus.io/scrape: \"true\"\n");
        assert_eq!(
            entries,
            vec![(
                r"podAnnotations.prometheus\.io/scrape".to_string(),
                "true".to_string()
            )]
        );
    }

    #[test]
    fn sequences_become_json_text() {
        let entries = flat("tolerations:\n  - key: dedicated\n    effect: NoSchedule\n");
        assert_eq!(entries.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&entries[0].1).unwrap();
        assert_eq!(parsed[0]["key"], "dedicated");
    }

    #[test]
    fn empty_mappings_and_nulls_contribute_nothing() {
        assert!(flat("podLabels: {}\nclusterIP: ~\n").is_empty());
        assert!(flat("").is_empty());
    }

    #[test]
    fn top_level_must_be_a_mapping() {
        let doc = parse_yaml("- a\n- b\n", "list.yaml").unwrap();
        assert!(matches!(
            flatten(doc, "list.yaml"),
            Err(ValuesError::Yaml { source_name, .. }) if source_name == "list.yaml"
        ));
    }

    #[test]
    fn complex_keys_report_source_and_path() {
        let err = parse_yaml("server:\n  podLabels:\n    ? [a, b]\n    : c\n", "values.prod.yaml")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("values.prod.yaml"), "{message}");
        assert!(message.contains("server.podLabels"), "{message}");
    }

    #[test]
    fn sequence_items_are_located_by_index() {
        let err = Converter { source_name: "test" }
            .node(Yaml::Array(vec![Yaml::Null, Yaml::BadValue]), "server.additionalEnv")
            .unwrap_err();
        assert!(err.to_string().contains("server.additionalEnv[1]"));
    }

    #[test]
    fn special_floats_keep_their_text() {
        let entries = flat("ratio: .inf\nscale: 1.5\n");
        assert!(entries.contains(&("ratio".to_string(), ".inf".to_string())));
        assert!(entries.contains(&("scale".to_string(), "1.5".to_string())));
    }

    #[test]
    fn malformed_yaml_reports_source() {
        let err = parse_yaml("a: [unclosed", "broken.yaml").unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }
}
