//! Values command

use std::io::Write;

use clap::Args;
use temporal_chart_values::ValueTree;

use super::{OutputFormat, ValueArgs};
use crate::Result;

#[derive(Args, Debug)]
pub struct ValuesArgs {
    #[command(flatten)]
    pub values: ValueArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub output: OutputFormat,
}

/// Print the merged value tree. Leaves are printed as the strings the
/// renderer sees.
pub fn run(args: ValuesArgs, out: &mut impl Write) -> Result<()> {
    let tree = ValueTree::merge(&args.values.layers()?)?;
    let rendered = match args.output {
        OutputFormat::Yaml => serde_yaml::to_string(&tree)?,
        OutputFormat::Json => serde_json::to_string_pretty(&tree)? + "\n",
    };
    out.write_all(rendered.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merged(set: &[&str]) -> serde_yaml::Value {
        let args = ValuesArgs {
            values: ValueArgs {
                files: Vec::new(),
                set: set.iter().map(|s| s.to_string()).collect(),
            },
            output: OutputFormat::Yaml,
        };
        let mut out = Vec::new();
        run(args, &mut out).unwrap();
        serde_yaml::from_slice(&out).unwrap()
    }

    #[test]
    fn overrides_land_in_the_tree() {
        let values = merged(&["server.podLabels.team=core"]);
        assert_eq!(values["server"]["podLabels"]["team"], "core");
        assert_eq!(values["server"]["image"]["repository"], "temporalio/server");
    }

    #[test]
    fn json_text_stays_a_string() {
        let values = merged(&[r#"server.podAnnotations.payload=[{"test":"success"}]"#]);
        assert_eq!(
            values["server"]["podAnnotations"]["payload"],
            r#"[{"test":"success"}]"#
        );
    }
}
