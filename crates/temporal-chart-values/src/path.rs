//! Dotted key paths
//!
//! A path such as `server.frontend.podLabels.one` addresses a leaf in the
//! value tree. `\.` inside a segment is a literal dot, so
//! `server.podAnnotations.prometheus\.io/scrape` has three segments.

use std::fmt;
use std::str::FromStr;

use crate::error::ValuesError;

/// A parsed, non-empty key path
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Parse a dotted path, honouring `\.` escapes.
    pub fn parse(raw: &str) -> Result<Self, ValuesError> {
        if raw.is_empty() {
            return Err(ValuesError::invalid_path(raw, "path is empty"));
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek() == Some(&'.') => {
                    chars.next();
                    current.push('.');
                }
                '.' => {
                    if current.is_empty() {
                        return Err(ValuesError::invalid_path(raw, "empty segment"));
                    }
                    segments.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            }
        }

        if current.is_empty() {
            return Err(ValuesError::invalid_path(raw, "empty segment"));
        }
        segments.push(current);

        Ok(Self { segments })
    }

    /// Build a path from already-split segments (no escape processing).
    pub fn from_segments<I, S>(segments: I) -> Result<Self, ValuesError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(ValuesError::invalid_path("", "path is empty"));
        }
        if segments.iter().any(String::is_empty) {
            let shown = Self {
                segments: segments.clone(),
            };
            return Err(ValuesError::invalid_path(shown.to_string(), "empty segment"));
        }
        Ok(Self { segments })
    }

    /// The individual segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Path made of the first `len` segments
    pub fn prefix(&self, len: usize) -> KeyPath {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.replace('.', "\\."))?;
        }
        Ok(())
    }
}

impl FromStr for KeyPath {
    type Err = ValuesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Join dotted segments for error messages
pub(crate) fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}
