//! Value layering and typed configuration for the Temporal chart
//!
//! Chart defaults, values files and `--set` overrides are [`ValueLayer`]s.
//! [`ValueTree::merge`] deep-merges them in precedence order and
//! [`ChartValues::from_tree`] turns the result into typed configuration.

pub mod config;
pub mod error;
pub mod layer;
pub mod path;
pub mod tree;
pub mod yaml;

mod scope;

pub use config::{
    CassandraValues, ChartValues, Component, ComponentValues, ConfigFlavor, ConfigMapsToMount,
    ConnectAttributes, ImageValues, PersistenceDriver, PersistenceValues, Release, SchemaStep,
    SchemaValues, SecurityContextValues, ServerConfigValues, ServerValues, ServiceAccountValues,
    ServiceValues, SqlPlugin, SqlValues, StoreBackend, StoreName, StoreValues, TemplateSyntax,
    CHART_NAME, CHART_VERSION,
};
pub use error::ValuesError;
pub use layer::{LayerSource, ValueLayer};
pub use path::KeyPath;
pub use tree::{Table, Value, ValueTree};

/// Result type alias using [`ValuesError`]
pub type Result<T> = std::result::Result<T, ValuesError>;
