//! Feature flags gating conditional resource content

use std::fmt;
use std::str::FromStr;

/// Which config template ConfigMaps the entrypoint script mounts
/// (`server.configMapsToMount`). Only consulted when
/// `server.useEntrypointScript` is on, but always validated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConfigMapsToMount {
    /// Only the legacy template
    Legacy,
    /// Only the modern template
    Modern,
    /// Legacy and modern side by side
    Both,
    /// The template rendered by dockerize
    Dockerize,
    /// The template rendered by the server's embedded sprig renderer
    #[default]
    Sprig,
}

impl ConfigMapsToMount {
    /// Every accepted value
    pub const ALL: [ConfigMapsToMount; 5] = [
        ConfigMapsToMount::Legacy,
        ConfigMapsToMount::Modern,
        ConfigMapsToMount::Both,
        ConfigMapsToMount::Dockerize,
        ConfigMapsToMount::Sprig,
    ];

    /// The value as written in values files
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigMapsToMount::Legacy => "legacy",
            ConfigMapsToMount::Modern => "modern",
            ConfigMapsToMount::Both => "both",
            ConfigMapsToMount::Dockerize => "dockerize",
            ConfigMapsToMount::Sprig => "sprig",
        }
    }

    /// Config flavors mounted for this value, in mount order.
    ///
    /// Each flavor appears for exactly the values listed here; nothing else
    /// mounts it.
    pub fn flavors(&self) -> &'static [ConfigFlavor] {
        match self {
            ConfigMapsToMount::Legacy => &[ConfigFlavor::Legacy],
            ConfigMapsToMount::Modern => &[ConfigFlavor::Modern],
            ConfigMapsToMount::Both => &[ConfigFlavor::Legacy, ConfigFlavor::Modern],
            ConfigMapsToMount::Dockerize => &[ConfigFlavor::Dockerize],
            ConfigMapsToMount::Sprig => &[ConfigFlavor::Sprig],
        }
    }
}

impl fmt::Display for ConfigMapsToMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigMapsToMount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown value '{s}' (expected one of: legacy, modern, both, dockerize, sprig)"
                )
            })
    }
}

/// One mountable config template ConfigMap
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigFlavor {
    /// Legacy layout, Go-template placeholders processed by dockerize
    Legacy,
    /// Modern layout, sprig placeholders processed by the server
    Modern,
    /// Processed explicitly by dockerize in the entrypoint
    Dockerize,
    /// Processed explicitly by the sprig renderer in the entrypoint
    Sprig,
}

impl ConfigFlavor {
    /// Short name, used as the volume and ConfigMap suffix
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigFlavor::Legacy => "legacy",
            ConfigFlavor::Modern => "modern",
            ConfigFlavor::Dockerize => "dockerize",
            ConfigFlavor::Sprig => "sprig",
        }
    }

    /// Placeholder syntax the template is written in
    pub fn syntax(&self) -> TemplateSyntax {
        match self {
            ConfigFlavor::Legacy | ConfigFlavor::Dockerize => TemplateSyntax::Dockerize,
            ConfigFlavor::Modern | ConfigFlavor::Sprig => TemplateSyntax::Sprig,
        }
    }
}

/// Placeholder syntax of a server config template
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateSyntax {
    /// `{{ .Env.NAME }}`
    Dockerize,
    /// `{{ env "NAME" }}`
    Sprig,
}

impl TemplateSyntax {
    /// Name as used by the entrypoint script
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateSyntax::Dockerize => "dockerize",
            TemplateSyntax::Sprig => "sprig",
        }
    }

    /// Placeholder reading an environment variable
    pub fn env_ref(&self, name: &str) -> String {
        match self {
            TemplateSyntax::Dockerize => format!("{{{{ .Env.{name} }}}}"),
            TemplateSyntax::Sprig => format!("{{{{ env \"{name}\" }}}}"),
        }
    }

    /// Placeholder reading an environment variable with a fallback
    pub fn env_ref_or(&self, name: &str, default: &str) -> String {
        match self {
            TemplateSyntax::Dockerize => format!("{{{{ default .Env.{name} \"{default}\" }}}}"),
            TemplateSyntax::Sprig => format!("{{{{ env \"{name}\" | default \"{default}\" }}}}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::legacy("legacy", ConfigMapsToMount::Legacy)]
    #[case::modern("modern", ConfigMapsToMount::Modern)]
    #[case::both("both", ConfigMapsToMount::Both)]
    #[case::dockerize("dockerize", ConfigMapsToMount::Dockerize)]
    #[case::sprig("sprig", ConfigMapsToMount::Sprig)]
    fn parses_every_known_value(#[case] raw: &str, #[case] expected: ConfigMapsToMount) {
        assert_eq!(raw.parse::<ConfigMapsToMount>().unwrap(), expected);
        assert_eq!(expected.to_string(), raw);
    }

    #[rstest]
    #[case::unknown("modernish")]
    #[case::wrong_case("Legacy")]
    #[case::comma_list("legacy,modern")]
    fn rejects_unknown_values(#[case] raw: &str) {
        let err = raw.parse::<ConfigMapsToMount>().unwrap_err();
        assert!(err.contains(raw));
    }

    #[test]
    fn legacy_and_modern_are_exclusive() {
        assert!(!ConfigMapsToMount::Legacy.flavors().contains(&ConfigFlavor::Modern));
        assert!(!ConfigMapsToMount::Modern.flavors().contains(&ConfigFlavor::Legacy));
        assert_eq!(
            ConfigMapsToMount::Both.flavors(),
            &[ConfigFlavor::Legacy, ConfigFlavor::Modern]
        );
        for tool in [ConfigMapsToMount::Dockerize, ConfigMapsToMount::Sprig] {
            assert!(!tool.flavors().contains(&ConfigFlavor::Legacy));
            assert!(!tool.flavors().contains(&ConfigFlavor::Modern));
        }
    }

    #[test]
    fn env_placeholders() {
        assert_eq!(
            TemplateSyntax::Dockerize.env_ref("TEMPORAL_STORE_PASSWORD"),
            "{{ .Env.TEMPORAL_STORE_PASSWORD }}"
        );
        assert_eq!(
            TemplateSyntax::Sprig.env_ref("TEMPORAL_STORE_PASSWORD"),
            "{{ env \"TEMPORAL_STORE_PASSWORD\" }}"
        );
        assert_eq!(
            TemplateSyntax::Sprig.env_ref_or("POD_IP", "0.0.0.0"),
            "{{ env \"POD_IP\" | default \"0.0.0.0\" }}"
        );
    }
}
