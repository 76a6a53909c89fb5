//! Template command

use std::io::Write;

use clap::Args;
use temporal_chart_render::{render_chart, summarize, to_json, to_yaml, TemplateKind};
use temporal_chart_values::Release;
use tracing::info;

use super::{OutputFormat, ValueArgs};
use crate::Result;

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Release name
    #[arg(env = "TEMPORAL_CHART_RELEASE", default_value = "temporal")]
    pub release: String,

    /// Release namespace
    #[arg(short, long, env = "TEMPORAL_CHART_NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Release revision, used in the schema Job name
    #[arg(long, default_value_t = 1)]
    pub revision: u32,

    #[command(flatten)]
    pub values: ValueArgs,

    /// Only render the given template (`templates/server-deployment.yaml`); may be repeated
    #[arg(short = 's', long = "show-only", value_name = "TEMPLATE")]
    pub show_only: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub output: OutputFormat,
}

pub fn run(args: TemplateArgs, out: &mut impl Write) -> Result<()> {
    let selection = args
        .show_only
        .iter()
        .map(|s| s.parse::<TemplateKind>())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let release = Release::new(&args.release)
        .with_namespace(&args.namespace)
        .with_revision(args.revision);

    let resources = render_chart(&args.values.layers()?, &release, &selection)?;
    info!(release = %release.name, kinds = ?summarize(&resources), "rendered");

    let rendered = match args.output {
        OutputFormat::Yaml => to_yaml(&resources)?,
        OutputFormat::Json => to_json(&resources)? + "\n",
    };
    out.write_all(rendered.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn args(set: &[&str], show_only: &[&str]) -> TemplateArgs {
        TemplateArgs {
            release: "prod".to_string(),
            namespace: "temporal".to_string(),
            revision: 4,
            values: ValueArgs {
                files: Vec::new(),
                set: set.iter().map(|s| s.to_string()).collect(),
            },
            show_only: show_only.iter().map(|s| s.to_string()).collect(),
            output: OutputFormat::Yaml,
        }
    }

    fn render(args: TemplateArgs) -> Result<String> {
        let mut out = Vec::new();
        run(args, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn show_only_limits_documents() {
        let yaml = render(args(&[], &["templates/server-job.yaml"])).unwrap();
        assert!(yaml.contains("# Source: temporal/templates/server-job.yaml"));
        assert!(!yaml.contains("server-deployment.yaml"));
        assert!(yaml.contains("name: prod-temporal-schema-4"));
        assert!(yaml.contains("namespace: temporal"));
    }

    #[rstest]
    #[case::unknown_template(&[], &["templates/web-deployment.yaml"])]
    #[case::bad_override(&["server.podLabels"], &[])]
    #[case::collision(&["server.podLabels.a=1", "server.podLabels.a.b=2"], &[])]
    fn invalid_input_fails_without_output(#[case] set: &[&str], #[case] show_only: &[&str]) {
        let mut out = Vec::new();
        assert!(run(args(set, show_only), &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn json_output_is_an_array() {
        let mut args = args(&[], &["server-service"]);
        args.output = OutputFormat::Json;
        let json: serde_json::Value = serde_json::from_str(&render(args).unwrap()).unwrap();
        let services = json.as_array().unwrap();
        assert!(!services.is_empty());
        assert!(services.iter().all(|s| s["kind"] == "Service"));
    }

    #[test]
    fn parses_helm_style_flags() {
        use clap::Parser;

        let cli = crate::Cli::try_parse_from([
            "temporal-chart",
            "template",
            "prod",
            "-n",
            "temporal",
            "-f",
            "values.prod.yaml",
            "--set",
            "server.replicaCount=3",
            "-s",
            "server-deployment",
            "-o",
            "json",
        ])
        .unwrap();

        let crate::Commands::Template(args) = cli.command else {
            panic!("expected template command");
        };
        assert_eq!(args.release, "prod");
        assert_eq!(args.namespace, "temporal");
        assert_eq!(args.values.files.len(), 1);
        assert_eq!(args.values.set, vec!["server.replicaCount=3"]);
        assert_eq!(args.show_only, vec!["server-deployment"]);
        assert_eq!(args.output, OutputFormat::Json);
    }
}
