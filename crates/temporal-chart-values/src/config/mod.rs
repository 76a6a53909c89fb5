//! Typed chart configuration
//!
//! [`ChartValues::from_tree`] is the boundary between the stringly value tree
//! and everything that renders resources. Booleans, integers and enumerated
//! flags are parsed here; nothing downstream looks at raw strings again.

mod flags;
mod persistence;
mod server;

use std::collections::BTreeMap;

use tracing::debug;

pub use flags::{ConfigFlavor, ConfigMapsToMount, TemplateSyntax};
pub use persistence::{
    CassandraValues, ConnectAttributes, PersistenceDriver, PersistenceValues, SqlPlugin, SqlValues,
    StoreBackend, StoreName, StoreValues,
};
pub use server::{
    Component, ComponentValues, SecurityContextValues, ServerConfigValues, ServerValues,
    ServiceValues,
};

use crate::error::ValuesError;
use crate::scope::Scope;
use crate::tree::ValueTree;
use persistence::StoreDefaults;

/// Name of the chart, used in resource names and `helm.sh/chart`
pub const CHART_NAME: &str = "temporal";

/// Chart version stamped into `helm.sh/chart`
pub const CHART_VERSION: &str = "0.60.0";

/// The release being rendered
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Release {
    pub name: String,
    pub namespace: String,
    pub revision: u32,
}

impl Release {
    /// A release with the given name in the default namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder: set the namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Builder: set the revision
    pub fn with_revision(mut self, revision: u32) -> Self {
        self.revision = revision;
        self
    }
}

impl Default for Release {
    fn default() -> Self {
        Self {
            name: CHART_NAME.to_string(),
            namespace: "default".to_string(),
            revision: 1,
        }
    }
}

/// A container image reference
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageValues {
    pub repository: String,
    pub tag: String,
    pub pull_policy: String,
}

impl ImageValues {
    pub(crate) fn from_scope(scope: &Scope<'_>) -> Result<Self, ValuesError> {
        Ok(Self {
            repository: scope.string("repository")?,
            tag: scope.string("tag")?,
            pull_policy: scope
                .optional_string("pullPolicy")?
                .unwrap_or_else(|| "IfNotPresent".to_string()),
        })
    }

    /// `repository:tag`
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

/// `serviceAccount`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceAccountValues {
    pub create: bool,
    pub name: Option<String>,
}

/// One schema step toggle (`schema.setup`, `schema.update`, ...)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchemaStep {
    pub enabled: bool,
    pub backoff_limit: Option<u32>,
}

/// `schema`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaValues {
    pub create_database: SchemaStep,
    pub setup: SchemaStep,
    pub update: SchemaStep,
    pub pod_labels: BTreeMap<String, String>,
    pub pod_annotations: BTreeMap<String, String>,
}

impl SchemaValues {
    /// Whether any schema step runs
    pub fn any_enabled(&self) -> bool {
        self.create_database.enabled || self.setup.enabled || self.update.enabled
    }
}

/// Every chart value the renderer consumes
#[derive(Clone, Debug, PartialEq)]
pub struct ChartValues {
    pub name_override: Option<String>,
    pub fullname_override: Option<String>,
    pub additional_labels: BTreeMap<String, String>,
    pub additional_annotations: BTreeMap<String, String>,
    pub service_account: ServiceAccountValues,
    pub server: ServerValues,
    pub admintools_image: ImageValues,
    pub schema: SchemaValues,
    pub cassandra_enabled: bool,
    pub mysql_enabled: bool,
    pub postgresql_enabled: bool,
}

impl ChartValues {
    /// Interpret a merged tree for the given release
    pub fn from_tree(tree: &ValueTree, release: &Release) -> Result<Self, ValuesError> {
        let root = Scope::root(tree);

        let mysql_enabled = root.child("mysql")?.bool_or("enabled", false)?;
        let postgresql_enabled = root.child("postgresql")?.bool_or("enabled", false)?;
        let store_defaults = StoreDefaults {
            release: &release.name,
            mysql_enabled,
            postgresql_enabled,
        };

        let service_account = root.child("serviceAccount")?;
        let schema = root.child("schema")?;

        let values = Self {
            name_override: root.optional_string("nameOverride")?,
            fullname_override: root.optional_string("fullnameOverride")?,
            additional_labels: root.string_map("additionalLabels")?,
            additional_annotations: root.string_map("additionalAnnotations")?,
            service_account: ServiceAccountValues {
                create: service_account.bool_or("create", false)?,
                name: service_account.optional_string("name")?,
            },
            server: server::read_server(tree, &root.child("server")?, &store_defaults)?,
            admintools_image: ImageValues::from_scope(&root.child("admintools")?.child("image")?)?,
            schema: SchemaValues {
                create_database: read_step(&schema.child("createDatabase")?)?,
                setup: read_step(&schema.child("setup")?)?,
                update: read_step(&schema.child("update")?)?,
                pod_labels: schema.string_map("podLabels")?,
                pod_annotations: schema.string_map("podAnnotations")?,
            },
            cassandra_enabled: root.child("cassandra")?.bool_or("enabled", false)?,
            mysql_enabled,
            postgresql_enabled,
        };

        debug!(
            release = %release.name,
            entrypoint = values.server.use_entrypoint_script,
            config_maps = %values.server.config_maps_to_mount,
            "chart values resolved"
        );
        Ok(values)
    }

    /// The chart name after `nameOverride`
    pub fn chart_name(&self) -> &str {
        self.name_override.as_deref().unwrap_or(CHART_NAME)
    }
}

fn read_step(scope: &Scope<'_>) -> Result<SchemaStep, ValuesError> {
    Ok(SchemaStep {
        enabled: scope.bool_or("enabled", true)?,
        backoff_limit: scope.parse_optional("backoffLimit")?,
    })
}
