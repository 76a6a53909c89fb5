//! `server.*`: the Temporal server and its per-service components

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValuesError;
use crate::scope::Scope;
use crate::tree::{Table, ValueTree};

use super::flags::ConfigMapsToMount;
use super::persistence::{read_persistence, PersistenceValues, StoreDefaults};
use super::ImageValues;

/// A Temporal server service, deployed as its own Deployment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    Frontend,
    InternalFrontend,
    History,
    Matching,
    Worker,
}

impl Component {
    /// All components in render order
    pub const ALL: [Component; 5] = [
        Component::Frontend,
        Component::InternalFrontend,
        Component::History,
        Component::Matching,
        Component::Worker,
    ];

    /// Key below `server.`
    pub fn values_key(&self) -> &'static str {
        match self {
            Component::Frontend => "frontend",
            Component::InternalFrontend => "internalFrontend",
            Component::History => "history",
            Component::Matching => "matching",
            Component::Worker => "worker",
        }
    }

    /// Name used in resource names, labels and `SERVICES`
    pub fn service_name(&self) -> &'static str {
        match self {
            Component::Frontend => "frontend",
            Component::InternalFrontend => "internal-frontend",
            Component::History => "history",
            Component::Matching => "matching",
            Component::Worker => "worker",
        }
    }

    /// Whether the component serves client traffic (and an HTTP API)
    pub fn is_frontend(&self) -> bool {
        matches!(self, Component::Frontend | Component::InternalFrontend)
    }

    fn enabled_by_default(&self) -> bool {
        !matches!(self, Component::InternalFrontend)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_name())
    }
}

impl FromStr for Component {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.values_key() == s || c.service_name() == s)
            .ok_or_else(|| format!("unknown component '{s}'"))
    }
}

/// `server.<component>.service`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceValues {
    pub service_type: String,
    pub port: u16,
    pub membership_port: u16,
    pub http_port: Option<u16>,
    /// Passed through verbatim, `None` included
    pub cluster_ip: Option<String>,
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
}

/// Resolved settings of one component
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentValues {
    pub component: Component,
    pub enabled: bool,
    /// `server.<component>.replicaCount`, else `server.replicaCount`
    pub replica_count: u32,
    pub service: ServiceValues,
    pub pod_labels: BTreeMap<String, String>,
    pub pod_annotations: BTreeMap<String, String>,
    pub deployment_labels: BTreeMap<String, String>,
    pub deployment_annotations: BTreeMap<String, String>,
    /// `server.resources` deep-merged under `server.<component>.resources`
    pub resources: serde_json::Value,
    /// `server.nodeSelector` merged under `server.<component>.nodeSelector`
    pub node_selector: BTreeMap<String, String>,
}

/// `server.securityContext`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecurityContextValues {
    pub fs_group: Option<i64>,
    pub run_as_user: Option<i64>,
}

/// `server.config`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfigValues {
    pub log_level: String,
    pub num_history_shards: u32,
    pub persistence: PersistenceValues,
}

/// `server.*`
#[derive(Clone, Debug, PartialEq)]
pub struct ServerValues {
    pub enabled: bool,
    pub image: ImageValues,
    pub use_entrypoint_script: bool,
    pub config_maps_to_mount: ConfigMapsToMount,
    pub metrics_annotations: bool,
    pub pod_labels: BTreeMap<String, String>,
    pub pod_annotations: BTreeMap<String, String>,
    pub deployment_labels: BTreeMap<String, String>,
    pub deployment_annotations: BTreeMap<String, String>,
    pub security_context: SecurityContextValues,
    pub tolerations: Vec<serde_json::Value>,
    pub additional_env: Vec<serde_json::Value>,
    pub additional_volumes: Vec<serde_json::Value>,
    pub additional_volume_mounts: Vec<serde_json::Value>,
    pub config: ServerConfigValues,
    components: Vec<ComponentValues>,
}

impl ServerValues {
    /// Settings of one component
    pub fn component(&self, component: Component) -> Option<&ComponentValues> {
        self.components.iter().find(|c| c.component == component)
    }

    /// Every component, disabled ones included, in render order
    pub fn components(&self) -> &[ComponentValues] {
        &self.components
    }

    /// Enabled components in render order
    pub fn enabled_components(&self) -> impl Iterator<Item = &ComponentValues> {
        self.components.iter().filter(|c| c.enabled)
    }
}

pub(crate) fn read_server(
    tree: &ValueTree,
    scope: &Scope<'_>,
    defaults: &StoreDefaults<'_>,
) -> Result<ServerValues, ValuesError> {
    let replica_count = scope.parse_optional("replicaCount")?.unwrap_or(1);

    let security = scope.child("securityContext")?;
    let config = scope.child("config")?;

    let components = Component::ALL
        .into_iter()
        .map(|component| read_component(tree, scope, component, replica_count))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ServerValues {
        enabled: scope.bool_or("enabled", true)?,
        image: ImageValues::from_scope(&scope.child("image")?)?,
        use_entrypoint_script: scope.bool_or("useEntrypointScript", false)?,
        config_maps_to_mount: scope.parse_optional("configMapsToMount")?.unwrap_or_default(),
        metrics_annotations: scope
            .child("metrics")?
            .child("annotations")?
            .bool_or("enabled", true)?,
        pod_labels: scope.string_map("podLabels")?,
        pod_annotations: scope.string_map("podAnnotations")?,
        deployment_labels: scope.string_map("deploymentLabels")?,
        deployment_annotations: scope.string_map("deploymentAnnotations")?,
        security_context: SecurityContextValues {
            fs_group: security.parse_optional("fsGroup")?,
            run_as_user: security.parse_optional("runAsUser")?,
        },
        tolerations: scope.json_list("tolerations")?,
        additional_env: scope.json_list("additionalEnv")?,
        additional_volumes: scope.json_list("additionalVolumes")?,
        additional_volume_mounts: scope.json_list("additionalVolumeMounts")?,
        config: ServerConfigValues {
            log_level: config.string("logLevel")?,
            num_history_shards: config.parse("numHistoryShards")?,
            persistence: read_persistence(&config.child("persistence")?, defaults)?,
        },
        components,
    })
}

fn read_component(
    tree: &ValueTree,
    server: &Scope<'_>,
    component: Component,
    server_replicas: u32,
) -> Result<ComponentValues, ValuesError> {
    let key = component.values_key();
    let scope = server.child(key)?;
    let service = scope.child("service")?;

    let resources = tree.merge_tables(&[&["server", "resources"], &["server", key, "resources"]])?;
    let node_selector =
        tree.merge_scopes(&[&["server", "nodeSelector"], &["server", key, "nodeSelector"]])?;

    Ok(ComponentValues {
        component,
        enabled: scope.bool_or("enabled", component.enabled_by_default())?,
        replica_count: scope.parse_optional("replicaCount")?.unwrap_or(server_replicas),
        service: ServiceValues {
            service_type: service
                .optional_string("type")?
                .unwrap_or_else(|| "ClusterIP".to_string()),
            port: service.parse("port")?,
            membership_port: service.parse("membershipPort")?,
            http_port: service.parse_optional("httpPort")?,
            cluster_ip: service.optional_string("clusterIP")?,
            annotations: service.string_map("annotations")?,
            labels: service.string_map("labels")?,
        },
        pod_labels: scope.string_map("podLabels")?,
        pod_annotations: scope.string_map("podAnnotations")?,
        deployment_labels: scope.string_map("deploymentLabels")?,
        deployment_annotations: scope.string_map("deploymentAnnotations")?,
        resources: table_to_json(&resources),
        node_selector,
    })
}

fn table_to_json(table: &Table) -> serde_json::Value {
    serde_json::Value::Object(
        table
            .iter()
            .map(|(key, value)| {
                let json = match value {
                    crate::tree::Value::Scalar(s) => serde_json::Value::String(s.clone()),
                    crate::tree::Value::Table(t) => table_to_json(t),
                };
                (key.clone(), json)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::values_key("internalFrontend", Component::InternalFrontend)]
    #[case::service_name("internal-frontend", Component::InternalFrontend)]
    #[case::plain("history", Component::History)]
    fn components_parse_by_either_name(#[case] raw: &str, #[case] expected: Component) {
        assert_eq!(raw.parse::<Component>().unwrap(), expected);
    }

    #[test]
    fn only_frontends_serve_http() {
        let frontends: Vec<_> = Component::ALL.into_iter().filter(Component::is_frontend).collect();
        assert_eq!(frontends, vec![Component::Frontend, Component::InternalFrontend]);
    }

    #[test]
    fn nested_resources_become_json_strings() {
        let mut limits = Table::new();
        limits.insert("cpu".to_string(), crate::tree::Value::Scalar("1".to_string()));
        let mut table = Table::new();
        table.insert("limits".to_string(), crate::tree::Value::Table(limits));

        assert_eq!(table_to_json(&table), serde_json::json!({"limits": {"cpu": "1"}}));
    }
}
