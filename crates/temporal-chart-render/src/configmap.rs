//! Server config ConfigMaps and the config checksum

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};
use temporal_chart_values::{Component, StoreBackend, StoreValues, TemplateSyntax};

use crate::error::RenderError;
use crate::k8s::ConfigMap;
use crate::renderer::ChartRenderer;
use crate::template::{CONFIG_TEMPLATE, ENTRYPOINT_SCRIPT};

/// Data key of every config template ConfigMap
pub const CONFIG_KEY: &str = "config_template.yaml";

/// Data key of the entrypoint ConfigMap
pub const ENTRYPOINT_KEY: &str = "entrypoint.sh";

/// Where the entrypoint script writes the rendered config
pub const PROCESSED_DIR: &str = "/etc/temporal/config-processed";

#[derive(Serialize)]
struct ConfigContext<'a> {
    enable_template: bool,
    log_level: &'a str,
    default_store: &'a str,
    visibility_store: &'a str,
    num_history_shards: u32,
    stores: Vec<StoreContext<'a>>,
    broadcast_address: String,
    services_ref: String,
    services: Vec<ServiceContext>,
    frontend_port: u16,
    frontend_http_port: Option<u16>,
    public_client: String,
}

#[derive(Serialize)]
struct StoreContext<'a> {
    name: &'static str,
    password: String,
    cassandra: Option<CassandraContext<'a>>,
    sql: Option<SqlContext<'a>>,
}

#[derive(Serialize)]
struct CassandraContext<'a> {
    hosts: String,
    port: u16,
    keyspace: &'a str,
    user: &'a str,
    replication_factor: u32,
}

#[derive(Serialize)]
struct SqlContext<'a> {
    plugin: &'static str,
    database: &'a str,
    connect_addr: String,
    user: &'a str,
    max_conns: u32,
    max_idle_conns: u32,
    max_conn_lifetime: &'a str,
    connect_attributes: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct ServiceContext {
    name: &'static str,
    rpc_port: u16,
    membership_port: u16,
    http_port: Option<u16>,
}

#[derive(Serialize)]
struct EntrypointContext<'a> {
    fullname: &'a str,
    processed_dir: &'static str,
    flavors: Vec<FlavorContext>,
}

#[derive(Serialize)]
struct FlavorContext {
    name: &'static str,
    syntax: &'static str,
}

fn store_context(store: &StoreValues, syntax: TemplateSyntax) -> StoreContext<'_> {
    let (cassandra, sql) = match &store.backend {
        StoreBackend::Cassandra(c) => (
            Some(CassandraContext {
                hosts: c.hosts.join(","),
                port: c.port,
                keyspace: &c.keyspace,
                user: &c.user,
                replication_factor: c.replication_factor,
            }),
            None,
        ),
        StoreBackend::Sql(s) => (
            None,
            Some(SqlContext {
                plugin: s.plugin.as_str(),
                database: &s.database,
                connect_addr: s.connect_addr(),
                user: &s.user,
                max_conns: s.max_conns,
                max_idle_conns: s.max_idle_conns,
                max_conn_lifetime: &s.max_conn_lifetime,
                connect_attributes: s.connect_attributes.as_map(),
            }),
        ),
    };
    StoreContext {
        name: store.name.as_str(),
        password: syntax.env_ref(store.name.password_env()),
        cassandra,
        sql,
    }
}

/// Render the server config template in the given placeholder syntax
pub fn render_config(r: &ChartRenderer<'_>, syntax: TemplateSyntax) -> Result<String, RenderError> {
    let server = &r.values.server;
    let persistence = &server.config.persistence;
    let frontend = server.component(Component::Frontend).map(|c| &c.service);
    let frontend_port = frontend.map(|s| s.port).unwrap_or(7233);

    let ctx = ConfigContext {
        enable_template: syntax == TemplateSyntax::Sprig,
        log_level: &server.config.log_level,
        default_store: &persistence.default_store,
        visibility_store: &persistence.visibility_store,
        num_history_shards: server.config.num_history_shards,
        stores: persistence
            .stores()
            .into_iter()
            .map(|store| store_context(store, syntax))
            .collect(),
        broadcast_address: syntax.env_ref_or("POD_IP", "0.0.0.0"),
        services_ref: syntax.env_ref("SERVICES"),
        services: server
            .enabled_components()
            .map(|c| ServiceContext {
                name: c.component.service_name(),
                rpc_port: c.service.port,
                membership_port: c.service.membership_port,
                http_port: c.service.http_port,
            })
            .collect(),
        frontend_port,
        frontend_http_port: frontend.and_then(|s| s.http_port),
        public_client: format!("{}:{}", r.names.component(Component::Frontend), frontend_port),
    };
    r.engine.render(CONFIG_TEMPLATE, ctx)
}

/// Render the entrypoint script for the selected config flavors
pub fn render_entrypoint(r: &ChartRenderer<'_>) -> Result<String, RenderError> {
    let ctx = EntrypointContext {
        fullname: r.names.fullname(),
        processed_dir: PROCESSED_DIR,
        flavors: r
            .values
            .server
            .config_maps_to_mount
            .flavors()
            .iter()
            .map(|flavor| FlavorContext {
                name: flavor.as_str(),
                syntax: flavor.syntax().as_str(),
            })
            .collect(),
    };
    r.engine.render(ENTRYPOINT_SCRIPT, ctx)
}

/// Config ConfigMaps for the current mode.
///
/// Classic mode has a single `<fullname>-config` in dockerize syntax.
/// Entrypoint mode has `<fullname>-entrypoint` plus one
/// `<fullname>-config-<flavor>` per mounted flavor.
pub fn config_maps(r: &ChartRenderer<'_>) -> Result<Vec<ConfigMap>, RenderError> {
    let server = &r.values.server;
    if !server.use_entrypoint_script {
        let meta = r.object_meta(r.names.config(), "server", &[]);
        let config = render_config(r, TemplateSyntax::Dockerize)?;
        return Ok(vec![ConfigMap::new(meta).with_data(CONFIG_KEY, config)]);
    }

    let mut maps = vec![ConfigMap::new(r.object_meta(r.names.entrypoint(), "server", &[]))
        .with_data(ENTRYPOINT_KEY, render_entrypoint(r)?)];
    for flavor in server.config_maps_to_mount.flavors() {
        let meta = r.object_meta(r.names.flavor_config(*flavor), "server", &[]);
        let config = render_config(r, flavor.syntax())?;
        maps.push(ConfigMap::new(meta).with_data(CONFIG_KEY, config));
    }
    Ok(maps)
}

/// SHA-256 over the data of the given ConfigMaps, hex encoded.
///
/// Used as a pod annotation so that config changes roll the Deployments.
pub fn config_checksum(maps: &[ConfigMap]) -> String {
    let mut hasher = Sha256::new();
    for cm in maps {
        for (k, v) in &cm.data {
            hasher.update(cm.metadata.name.as_bytes());
            hasher.update(b"/");
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b"\n");
        }
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
