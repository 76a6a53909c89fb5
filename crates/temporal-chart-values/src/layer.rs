//! Value layers: chart defaults, values files and `--set` overrides

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ValuesError;
use crate::path::KeyPath;
use crate::yaml;

/// Chart defaults, embedded at compile time
const DEFAULT_VALUES: &str = include_str!("../chart/values.yaml");

/// Where a layer came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayerSource {
    /// The chart's own `values.yaml`
    Defaults,
    /// A user supplied values file
    File(PathBuf),
    /// `--set key=value` overrides
    SetArgs,
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerSource::Defaults => f.write_str("defaults"),
            LayerSource::File(path) => write!(f, "file:{}", path.display()),
            LayerSource::SetArgs => f.write_str("--set"),
        }
    }
}

/// One scope of overrides with a fixed precedence rank (its position in the
/// list handed to [`crate::ValueTree::merge`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueLayer {
    source: LayerSource,
    entries: Vec<(KeyPath, String)>,
}

impl ValueLayer {
    /// Create an empty layer
    pub fn new(source: LayerSource) -> Self {
        Self {
            source,
            entries: Vec::new(),
        }
    }

    /// The chart defaults layer
    pub fn defaults() -> Result<Self, ValuesError> {
        Self::from_yaml_str(LayerSource::Defaults, DEFAULT_VALUES)
    }

    /// Build a layer from `(dotted path, value)` pairs
    pub fn from_pairs<I, K, V>(source: LayerSource, pairs: I) -> Result<Self, ValuesError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut layer = Self::new(source);
        for (key, value) in pairs {
            layer.push(KeyPath::parse(key.as_ref())?, value);
        }
        Ok(layer)
    }

    /// Build a layer from `key=value` arguments.
    ///
    /// The key ends at the first `=`; everything after it is the value,
    /// commas and further `=` included.
    pub fn from_set_args<I, S>(args: I) -> Result<Self, ValuesError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut layer = Self::new(LayerSource::SetArgs);
        for arg in args {
            let raw = arg.as_ref();
            let Some((key, value)) = raw.split_once('=') else {
                return Err(ValuesError::InvalidOverride {
                    raw: raw.to_string(),
                    message: "expected key=value".to_string(),
                });
            };
            if key.trim().is_empty() {
                return Err(ValuesError::InvalidOverride {
                    raw: raw.to_string(),
                    message: "key is empty".to_string(),
                });
            }
            layer.push(KeyPath::parse(key.trim())?, value);
        }
        Ok(layer)
    }

    /// Parse a YAML values document
    pub fn from_yaml_str(source: LayerSource, input: &str) -> Result<Self, ValuesError> {
        let source_name = source.to_string();
        let document = yaml::parse_yaml(input, &source_name)?;
        Ok(Self {
            entries: yaml::flatten(document, &source_name)?,
            source,
        })
    }

    /// Read and parse a YAML values file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ValuesError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ValuesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(LayerSource::File(path.to_path_buf()), &input)
    }

    /// Append an entry; a later entry for the same path wins
    pub fn push(&mut self, path: KeyPath, value: impl Into<String>) {
        self.entries.push((path, value.into()));
    }

    /// Where this layer came from
    pub fn source(&self) -> &LayerSource {
        &self.source
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[(KeyPath, String)] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the layer has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::tree::{Value, ValueTree};

    #[test]
    fn defaults_parse() {
        let defaults = ValueLayer::defaults().unwrap();
        assert_eq!(defaults.source(), &LayerSource::Defaults);
        assert!(!defaults.is_empty());

        let tree = ValueTree::merge(&[defaults]).unwrap();
        assert_eq!(
            tree.lookup(&["server", "config", "persistence", "default", "driver"])
                .and_then(Value::as_scalar),
            Some("cassandra")
        );
    }

    #[test]
    fn set_args_split_on_first_equals() {
        let layer = ValueLayer::from_set_args([
            "server.podAnnotations.one=a=b",
            "server.additionalEnv=[{\"name\":\"A\",\"value\":\"1,2\"}]",
        ])
        .unwrap();

        assert_eq!(layer.entries()[0].1, "a=b");
        assert_eq!(layer.entries()[1].1, r#"[{"name":"A","value":"1,2"}]"#);
    }

    #[test]
    fn set_args_allow_empty_values() {
        let layer = ValueLayer::from_set_args(["nameOverride="]).unwrap();
        assert_eq!(layer.entries()[0].1, "");
    }

    #[test]
    fn set_args_reject_missing_equals_or_key() {
        assert!(matches!(
            ValueLayer::from_set_args(["server.enabled"]),
            Err(ValuesError::InvalidOverride { .. })
        ));
        assert!(matches!(
            ValueLayer::from_set_args(["=true"]),
            Err(ValuesError::InvalidOverride { .. })
        ));
    }

    #[test]
    fn values_file_layer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  podLabels:\n    team: core").unwrap();

        let layer = ValueLayer::from_yaml_file(file.path()).unwrap();
        assert!(matches!(layer.source(), LayerSource::File(_)));
        assert_eq!(layer.entries()[0].0.to_string(), "server.podLabels.team");
        assert_eq!(layer.entries()[0].1, "core");
    }

    #[test]
    fn missing_values_file_is_io_error() {
        let err = ValueLayer::from_yaml_file("/nonexistent/values.yaml").unwrap_err();
        assert!(matches!(err, ValuesError::Io { .. }));
    }

    #[test]
    fn source_display() {
        assert_eq!(LayerSource::Defaults.to_string(), "defaults");
        assert_eq!(LayerSource::SetArgs.to_string(), "--set");
        assert_eq!(
            LayerSource::File(PathBuf::from("prod.yaml")).to_string(),
            "file:prod.yaml"
        );
    }
}
