//! Container environment

use serde::de::DeserializeOwned;
use temporal_chart_values::{Component, StoreBackend, StoreValues};

use crate::error::RenderError;
use crate::k8s::EnvVar;
use crate::names::Names;

/// Connect attributes handed to `temporal-sql-tool`
pub const SQL_CONNECT_ATTRIBUTES: &str = "SQL_CONNECT_ATTRIBUTES";

/// Decode a list given as JSON in values (`server.additionalEnv`, ...)
pub(crate) fn parse_list<T: DeserializeOwned>(
    items: &[serde_json::Value],
    path: &'static str,
) -> Result<Vec<T>, RenderError> {
    items
        .iter()
        .map(|item| {
            serde_json::from_value(item.clone())
                .map_err(|source| RenderError::InvalidList { path, source })
        })
        .collect()
}

/// Password of a store, read from its Secret
pub fn store_password(names: &Names, store: &StoreValues, var: &str) -> EnvVar {
    EnvVar::from_secret(var, names.store_password_secret(store), &store.secret_key)
}

/// Environment of a server container, generated variables first
pub fn server_env(
    names: &Names,
    component: Component,
    stores: [&StoreValues; 2],
    additional: &[serde_json::Value],
) -> Result<Vec<EnvVar>, RenderError> {
    let mut env = vec![
        EnvVar::from_field("POD_IP", "status.podIP"),
        EnvVar::literal("SERVICES", component.service_name()),
    ];
    env.extend(
        stores
            .into_iter()
            .map(|store| store_password(names, store, store.name.password_env())),
    );
    env.extend(parse_list::<EnvVar>(additional, "server.additionalEnv")?);
    Ok(env)
}

/// Connection environment of the schema tool for one store.
///
/// SQL stores get `SQL_CONNECT_ATTRIBUTES` only when attributes are set.
pub fn schema_env(names: &Names, store: &StoreValues) -> Vec<EnvVar> {
    match &store.backend {
        StoreBackend::Cassandra(c) => vec![
            EnvVar::literal("CASSANDRA_HOST", c.hosts.join(",")),
            EnvVar::literal("CASSANDRA_PORT", c.port.to_string()),
            EnvVar::literal("CASSANDRA_KEYSPACE", &c.keyspace),
            EnvVar::literal("CASSANDRA_USER", &c.user),
            store_password(names, store, "CASSANDRA_PASSWORD"),
        ],
        StoreBackend::Sql(s) => {
            let mut env = vec![
                EnvVar::literal("SQL_PLUGIN", s.plugin.as_str()),
                EnvVar::literal("SQL_HOST", &s.host),
                EnvVar::literal("SQL_PORT", s.port.to_string()),
                EnvVar::literal("SQL_DATABASE", &s.database),
                EnvVar::literal("SQL_USER", &s.user),
                store_password(names, store, "SQL_PASSWORD"),
            ];
            if !s.connect_attributes.is_empty() {
                env.push(EnvVar::literal(
                    SQL_CONNECT_ATTRIBUTES,
                    s.connect_attributes.to_string(),
                ));
            }
            env
        }
    }
}
