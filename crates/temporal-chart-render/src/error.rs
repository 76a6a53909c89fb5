//! Render error types

use temporal_chart_values::ValuesError;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{0}")]
    Values(#[from] ValuesError),

    #[error("unknown template '{0}' (expected one of: server-deployment.yaml, server-service.yaml, server-job.yaml, server-configmap.yaml, server-secret.yaml)")]
    UnknownTemplate(String),

    #[error("template '{template}' failed to render: {source}")]
    Template {
        template: &'static str,
        source: minijinja::Error,
    },

    #[error("invalid value for '{path}': {source}")]
    InvalidList {
        path: &'static str,
        source: serde_json::Error,
    },

    #[error("yaml serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
