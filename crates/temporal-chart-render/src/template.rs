//! Embedded file templates
//!
//! Uses minijinja with custom syntax configuration:
//! - Variable delimiters: `${...}`
//! - Block delimiters: `{%...%}`
//! - Comment delimiters: `{#...#}`
//!
//! The rendered server config is itself a Go template, so its `{{ ... }}`
//! placeholders must pass through untouched.

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior};

use crate::error::RenderError;

/// Temporal server config template
pub const CONFIG_TEMPLATE: &str = "config_template.yaml";

/// Entrypoint script run in place of the image entrypoint
pub const ENTRYPOINT_SCRIPT: &str = "entrypoint.sh";

const CONFIG_SOURCE: &str = include_str!("../templates/config_template.yaml");
const ENTRYPOINT_SOURCE: &str = include_str!("../templates/entrypoint.sh");

/// Template environment holding the embedded templates
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new() -> Result<Self, RenderError> {
        let syntax = SyntaxConfig::builder()
            .variable_delimiters("${", "}")
            .block_delimiters("{%", "%}")
            .comment_delimiters("{#", "#}")
            .build()
            .map_err(|source| RenderError::Template {
                template: "syntax",
                source,
            })?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
        env.add_filter("quote", quote);

        for (name, body) in [
            (CONFIG_TEMPLATE, CONFIG_SOURCE),
            (ENTRYPOINT_SCRIPT, ENTRYPOINT_SOURCE),
        ] {
            env.add_template(name, body)
                .map_err(|source| RenderError::Template {
                    template: name,
                    source,
                })?;
        }

        Ok(Self { env })
    }

    /// Render one embedded template
    pub fn render<S: serde::Serialize>(
        &self,
        template: &'static str,
        ctx: S,
    ) -> Result<String, RenderError> {
        self.env
            .get_template(template)
            .and_then(|t| t.render(ctx))
            .map_err(|source| RenderError::Template { template, source })
    }
}

/// Double-quoted string literal, valid in both YAML and shell
fn quote(value: String) -> Result<String, Error> {
    serde_json::to_string(&value).map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))
}
