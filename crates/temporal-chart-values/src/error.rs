//! Error types for value layering and typed configuration

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while parsing, merging or interpreting chart values
#[derive(Debug, Error)]
pub enum ValuesError {
    /// A key path could not be parsed
    #[error("invalid key path '{path}': {message}")]
    InvalidPath {
        /// The raw path as given
        path: String,
        /// What is wrong with it
        message: String,
    },

    /// A leaf and a non-leaf were both assigned at the same location
    #[error("path collision at '{conflict}' while setting '{path}': a key cannot be both a value and a mapping")]
    PathCollision {
        /// The path being written when the collision was found
        path: String,
        /// The prefix that is a scalar in one place and a mapping in another
        conflict: String,
    },

    /// A `--set` style override is malformed
    #[error("invalid override '{raw}': {message}")]
    InvalidOverride {
        /// The raw override argument
        raw: String,
        /// What is wrong with it
        message: String,
    },

    /// A value exists but has the wrong shape or an unrecognised content
    #[error("invalid value for '{path}': {message}")]
    InvalidValue {
        /// Dotted path of the offending value
        path: String,
        /// What is wrong with it
        message: String,
    },

    /// A value the chart requires is absent
    #[error("missing required value '{path}'")]
    MissingValue {
        /// Dotted path of the missing value
        path: String,
    },

    /// A values document could not be parsed
    #[error("yaml error in {source_name}: {message}")]
    Yaml {
        /// Where the document came from (file path, "defaults", ...)
        source_name: String,
        /// Parser message
        message: String,
    },

    /// A values file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the file
        path: PathBuf,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl ValuesError {
    /// Create an invalid-path error
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-value error for a dotted path
    pub fn invalid_value(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a missing-value error for a dotted path
    pub fn missing(path: impl Into<String>) -> Self {
        Self::MissingValue { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_message_names_both_paths() {
        let err = ValuesError::PathCollision {
            path: "server.x.y".to_string(),
            conflict: "server.x".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'server.x'"));
        assert!(msg.contains("'server.x.y'"));
    }

    #[test]
    fn helpers_build_the_matching_variants() {
        match ValuesError::invalid_value("server.configMapsToMount", "unknown") {
            ValuesError::InvalidValue { path, .. } => assert_eq!(path, "server.configMapsToMount"),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
        assert!(ValuesError::missing("server.image.tag")
            .to_string()
            .contains("server.image.tag"));
    }
}
