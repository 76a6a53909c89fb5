//! Resource rendering for the Temporal chart
//!
//! Turns resolved [`temporal_chart_values::ChartValues`] into the Kubernetes
//! objects of the server templates: store Secrets, config ConfigMaps,
//! Services, one Deployment per enabled component and the schema Job.
//!
//! # Usage
//!
//! ```rust,ignore
//! let layers = [ValueLayer::defaults()?, ValueLayer::from_set_args(&overrides)?];
//! let resources = render_chart(&layers, &Release::new("prod"), &[])?;
//! print!("{}", to_yaml(&resources)?);
//! ```

pub mod error;
pub mod k8s;
pub mod names;

mod configmap;
mod deployment;
mod entrypoint;
mod env;
mod job;
mod metadata;
mod renderer;
mod secret;
mod service;
mod template;

pub use deployment::{CHECKSUM_ANNOTATION, METRICS_PORT};
pub use env::SQL_CONNECT_ATTRIBUTES;
pub use error::RenderError;
pub use k8s::Resource;
pub use names::Names;
pub use renderer::{render_chart, summarize, to_json, to_yaml, ChartRenderer, TemplateKind};
