//! CLI commands

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use temporal_chart_values::ValueLayer;
use tracing::debug;

use crate::Result;

pub mod template;
pub mod values;

/// Value sources shared by every command, lowest precedence first
#[derive(Args, Debug, Default)]
pub struct ValueArgs {
    /// Values file; may be repeated, later files win
    #[arg(short = 'f', long = "values", value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Override a value (`server.podLabels.team=core`); may be repeated
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

impl ValueArgs {
    /// Chart defaults, then values files in order, then `--set` overrides
    pub fn layers(&self) -> Result<Vec<ValueLayer>> {
        let mut layers = vec![ValueLayer::defaults()?];
        for file in &self.files {
            debug!(file = %file.display(), "reading values file");
            layers.push(ValueLayer::from_yaml_file(file)?);
        }
        if !self.set.is_empty() {
            layers.push(ValueLayer::from_set_args(&self.set)?);
        }
        Ok(layers)
    }
}

/// Output encoding
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use temporal_chart_values::LayerSource;

    use super::*;

    #[test]
    fn layers_follow_flag_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  podLabels:\n    team: core").unwrap();

        let args = ValueArgs {
            files: vec![file.path().to_path_buf()],
            set: vec!["server.podLabels.team=edge".to_string()],
        };
        let layers = args.layers().unwrap();

        let sources: Vec<_> = layers.iter().map(|l| l.source().clone()).collect();
        assert_eq!(
            sources,
            vec![
                LayerSource::Defaults,
                LayerSource::File(file.path().to_path_buf()),
                LayerSource::SetArgs
            ]
        );
    }

    #[test]
    fn missing_values_file_is_an_error() {
        let args = ValueArgs {
            files: vec![PathBuf::from("/nonexistent/values.yaml")],
            set: Vec::new(),
        };
        assert!(matches!(
            args.layers(),
            Err(crate::Error::Values(temporal_chart_values::ValuesError::Io { .. }))
        ));
    }
}
