//! Persistence configuration: the default and visibility stores

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValuesError;
use crate::scope::Scope;

/// Which backing database a store uses (`server.config.persistence.<store>.driver`)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistenceDriver {
    /// Apache Cassandra
    Cassandra,
    /// MySQL or PostgreSQL through the SQL plugin layer
    Sql,
}

impl FromStr for PersistenceDriver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cassandra" => Ok(Self::Cassandra),
            "sql" => Ok(Self::Sql),
            other => Err(format!(
                "unknown driver '{other}' (expected cassandra or sql)"
            )),
        }
    }
}

/// SQL plugin name as understood by the server and `temporal-sql-tool`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlPlugin {
    /// MySQL 8
    Mysql8,
    /// PostgreSQL 12+ via lib/pq
    Postgres12,
    /// PostgreSQL 12+ via pgx
    Postgres12Pgx,
}

impl SqlPlugin {
    /// Plugin name
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlPlugin::Mysql8 => "mysql8",
            SqlPlugin::Postgres12 => "postgres12",
            SqlPlugin::Postgres12Pgx => "postgres12_pgx",
        }
    }

    /// Port used when none is configured
    pub fn default_port(&self) -> u16 {
        match self {
            SqlPlugin::Mysql8 => 3306,
            SqlPlugin::Postgres12 | SqlPlugin::Postgres12Pgx => 5432,
        }
    }

    /// Schema directory below `/etc/temporal/schema`
    pub fn schema_dir(&self) -> &'static str {
        match self {
            SqlPlugin::Mysql8 => "mysql/v8",
            SqlPlugin::Postgres12 | SqlPlugin::Postgres12Pgx => "postgresql/v12",
        }
    }
}

impl fmt::Display for SqlPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SqlPlugin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql8" => Ok(Self::Mysql8),
            "postgres12" => Ok(Self::Postgres12),
            "postgres12_pgx" => Ok(Self::Postgres12Pgx),
            other => Err(format!(
                "unknown SQL plugin '{other}' (expected mysql8, postgres12 or postgres12_pgx)"
            )),
        }
    }
}

/// SQL driver connect attributes.
///
/// Displays as `key1=value1&key2=value2`, sorted by key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectAttributes(BTreeMap<String, String>);

impl ConnectAttributes {
    /// Whether no attributes are configured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying map
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl From<BTreeMap<String, String>> for ConnectAttributes {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl fmt::Display for ConnectAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// The two stores a Temporal cluster needs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreName {
    /// Core execution store
    Default,
    /// Visibility store
    Visibility,
}

impl StoreName {
    /// Both stores, default first
    pub const ALL: [StoreName; 2] = [StoreName::Default, StoreName::Visibility];

    /// Key under `server.config.persistence`
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreName::Default => "default",
            StoreName::Visibility => "visibility",
        }
    }

    /// Environment variable carrying the store password into server pods
    pub fn password_env(&self) -> &'static str {
        match self {
            StoreName::Default => "TEMPORAL_STORE_PASSWORD",
            StoreName::Visibility => "TEMPORAL_VISIBILITY_STORE_PASSWORD",
        }
    }

    /// Schema name below the plugin schema directory
    pub fn schema_name(&self) -> &'static str {
        match self {
            StoreName::Default => "temporal",
            StoreName::Visibility => "visibility",
        }
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cassandra connection settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CassandraValues {
    pub hosts: Vec<String>,
    pub port: u16,
    pub keyspace: String,
    pub user: String,
    pub replication_factor: u32,
}

/// SQL connection settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqlValues {
    pub plugin: SqlPlugin,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub max_conns: u32,
    pub max_idle_conns: u32,
    pub max_conn_lifetime: String,
    pub connect_attributes: ConnectAttributes,
}

impl SqlValues {
    /// `host:port` as used by the server config
    pub fn connect_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The driver-specific half of a store
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Cassandra(CassandraValues),
    Sql(SqlValues),
}

impl StoreBackend {
    /// The driver this backend belongs to
    pub fn driver(&self) -> PersistenceDriver {
        match self {
            StoreBackend::Cassandra(_) => PersistenceDriver::Cassandra,
            StoreBackend::Sql(_) => PersistenceDriver::Sql,
        }
    }
}

/// One fully resolved store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreValues {
    pub name: StoreName,
    pub backend: StoreBackend,
    /// Password written into a generated Secret when no existing one is named
    pub password: String,
    /// Pre-existing Secret holding the password
    pub existing_secret: Option<String>,
    /// Key of the password inside the Secret
    pub secret_key: String,
}

/// `server.config.persistence`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistenceValues {
    pub default_store: String,
    pub visibility_store: String,
    pub default: StoreValues,
    pub visibility: StoreValues,
}

impl PersistenceValues {
    /// Both stores, default first
    pub fn stores(&self) -> [&StoreValues; 2] {
        [&self.default, &self.visibility]
    }
}

/// Facts outside `server.config.persistence` that shape store defaults
pub(crate) struct StoreDefaults<'a> {
    pub release: &'a str,
    pub mysql_enabled: bool,
    pub postgresql_enabled: bool,
}

pub(crate) fn read_persistence(
    scope: &Scope<'_>,
    defaults: &StoreDefaults<'_>,
) -> Result<PersistenceValues, ValuesError> {
    Ok(PersistenceValues {
        default_store: scope.string("defaultStore")?,
        visibility_store: scope.string("visibilityStore")?,
        default: read_store(&scope.child("default")?, StoreName::Default, defaults)?,
        visibility: read_store(&scope.child("visibility")?, StoreName::Visibility, defaults)?,
    })
}

fn read_store(
    scope: &Scope<'_>,
    name: StoreName,
    defaults: &StoreDefaults<'_>,
) -> Result<StoreValues, ValuesError> {
    let driver: PersistenceDriver = scope.parse("driver")?;
    let settings = match driver {
        PersistenceDriver::Cassandra => scope.child("cassandra")?,
        PersistenceDriver::Sql => scope.child("sql")?,
    };

    let backend = match driver {
        PersistenceDriver::Cassandra => StoreBackend::Cassandra(read_cassandra(&settings, defaults)?),
        PersistenceDriver::Sql => StoreBackend::Sql(read_sql(&settings, defaults)?),
    };

    Ok(StoreValues {
        name,
        backend,
        password: settings.optional_string("password")?.unwrap_or_default(),
        existing_secret: settings.optional_string("existingSecret")?,
        secret_key: settings
            .optional_string("secretKey")?
            .unwrap_or_else(|| "password".to_string()),
    })
}

fn read_cassandra(
    scope: &Scope<'_>,
    defaults: &StoreDefaults<'_>,
) -> Result<CassandraValues, ValuesError> {
    let mut hosts = scope.string_list("hosts")?;
    if hosts.is_empty() {
        hosts.push(format!("{}-cassandra", defaults.release));
    }

    Ok(CassandraValues {
        hosts,
        port: scope.parse("port")?,
        keyspace: scope.string("keyspace")?,
        user: scope.string("user")?,
        replication_factor: scope.parse_optional("replicationFactor")?.unwrap_or(1),
    })
}

fn read_sql(scope: &Scope<'_>, defaults: &StoreDefaults<'_>) -> Result<SqlValues, ValuesError> {
    let plugin = match scope.parse_optional::<SqlPlugin>("driver")? {
        Some(plugin) => plugin,
        None if defaults.mysql_enabled => SqlPlugin::Mysql8,
        None if defaults.postgresql_enabled => SqlPlugin::Postgres12,
        None => return Err(ValuesError::missing(scope.key_path("driver"))),
    };

    let host = match scope.optional_string("host")? {
        Some(host) => host,
        None if defaults.mysql_enabled => format!("{}-mysql", defaults.release),
        None if defaults.postgresql_enabled => format!("{}-postgresql", defaults.release),
        None => return Err(ValuesError::missing(scope.key_path("host"))),
    };

    Ok(SqlValues {
        plugin,
        host,
        port: scope
            .parse_optional("port")?
            .unwrap_or_else(|| plugin.default_port()),
        database: scope.string("database")?,
        user: scope.string("user")?,
        max_conns: scope.parse_optional("maxConns")?.unwrap_or(20),
        max_idle_conns: scope.parse_optional("maxIdleConns")?.unwrap_or(20),
        max_conn_lifetime: scope
            .optional_string("maxConnLifetime")?
            .unwrap_or_else(|| "1h".to_string()),
        connect_attributes: scope.string_map("connectAttributes")?.into(),
    })
}
