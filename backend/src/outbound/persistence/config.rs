//! Document store configuration.
//!
//! [`MongoStoreConfig`] carries explicit overrides supplied by the caller.
//! Anything it leaves unset (or blank) is filled from [`MongoSettings`],
//! which OrthoConfig loads from `AMBULANCE_API_MONGODB_*` variables.

use std::ffi::OsString;
use std::time::Duration;

use mongodb::options::Credential;
use ortho_config::OrthoConfig;
use serde::Deserialize;

const SETTINGS_PROGRAM: &str = "ambulance-webapi";
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 27017;
const DEFAULT_DATABASE: &str = "ambulance-wl";
const DEFAULT_COLLECTION: &str = "ambulance";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Errors raised while loading store settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Environment or configuration files could not be parsed.
    #[error("failed to load document store settings: {message}")]
    Load { message: String },
}

/// Environment-derived defaults for the document store.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "AMBULANCE_API_MONGODB")]
pub struct MongoSettings {
    /// Complete connection string; wins over host, port and credentials.
    pub uri: Option<String>,
    /// Server host name.
    pub host: Option<String>,
    /// Server port.
    pub port: Option<u16>,
    /// User name for SCRAM authentication.
    pub username: Option<String>,
    /// Password for SCRAM authentication.
    pub password: Option<String>,
    /// Database holding the collection.
    pub database: Option<String>,
    /// Collection holding ambulance documents.
    pub collection: Option<String>,
    /// Connect, server-selection and shutdown timeout.
    pub timeout_seconds: Option<u64>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

impl MongoSettings {
    /// Load settings from the process environment only.
    ///
    /// # Errors
    /// Returns [`ConfigError::Load`] when a variable cannot be parsed.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from(SETTINGS_PROGRAM)]).map_err(|err| {
            ConfigError::Load {
                message: err.to_string(),
            }
        })
    }

    fn connection_uri(&self) -> String {
        if let Some(uri) = non_blank(self.uri.as_deref()) {
            return uri.to_owned();
        }
        let host = non_blank(self.host.as_deref()).unwrap_or(DEFAULT_HOST);
        let port = self.port.unwrap_or(DEFAULT_PORT);
        format!("mongodb://{host}:{port}")
    }
}

/// Caller-supplied overrides for the document store connection.
///
/// # Example
///
/// ```
/// use ambulance_webapi::outbound::persistence::{MongoSettings, MongoStoreConfig};
///
/// let settings = MongoSettings {
///     uri: None,
///     host: Some("mongo".into()),
///     port: None,
///     username: None,
///     password: None,
///     database: None,
///     collection: None,
///     timeout_seconds: None,
/// };
/// let resolved = MongoStoreConfig::default()
///     .with_collection("ambulance")
///     .resolve(&settings);
/// assert_eq!(resolved.uri(), "mongodb://mongo:27017");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MongoStoreConfig {
    uri: Option<String>,
    database: Option<String>,
    collection: Option<String>,
    timeout: Option<Duration>,
}

impl MongoStoreConfig {
    /// Override the connection string.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Override the database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Override the collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Override the connection timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fill every unset field from `settings`.
    pub fn resolve(self, settings: &MongoSettings) -> ResolvedMongoConfig {
        let uri = non_blank(self.uri.as_deref())
            .map(str::to_owned)
            .unwrap_or_else(|| settings.connection_uri());
        let database = non_blank(self.database.as_deref())
            .or_else(|| non_blank(settings.database.as_deref()))
            .unwrap_or(DEFAULT_DATABASE)
            .to_owned();
        let collection = non_blank(self.collection.as_deref())
            .or_else(|| non_blank(settings.collection.as_deref()))
            .unwrap_or(DEFAULT_COLLECTION)
            .to_owned();
        let timeout = self.timeout.unwrap_or_else(|| {
            Duration::from_secs(settings.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
        });
        let credentials = non_blank(settings.username.as_deref()).map(|username| {
            (
                username.to_owned(),
                settings.password.clone().unwrap_or_default(),
            )
        });

        ResolvedMongoConfig {
            uri,
            database,
            collection,
            timeout,
            credentials,
        }
    }
}

/// Fully resolved connection parameters.
#[derive(Clone)]
pub struct ResolvedMongoConfig {
    uri: String,
    database: String,
    collection: String,
    timeout: Duration,
    credentials: Option<(String, String)>,
}

impl ResolvedMongoConfig {
    /// Connection string.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Connect and shutdown timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// SCRAM credential when a user name was configured.
    pub(crate) fn credential(&self) -> Option<Credential> {
        self.credentials.as_ref().map(|(username, password)| {
            Credential::builder()
                .username(username.clone())
                .password(password.clone())
                .build()
        })
    }
}

impl std::fmt::Debug for ResolvedMongoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedMongoConfig")
            .field("uri", &self.uri)
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("timeout", &self.timeout)
            .field(
                "username",
                &self.credentials.as_ref().map(|(username, _)| username),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use env_lock::lock_env;
    use rstest::{fixture, rstest};

    const MONGO_VARS: [&str; 8] = [
        "AMBULANCE_API_MONGODB_URI",
        "AMBULANCE_API_MONGODB_HOST",
        "AMBULANCE_API_MONGODB_PORT",
        "AMBULANCE_API_MONGODB_USERNAME",
        "AMBULANCE_API_MONGODB_PASSWORD",
        "AMBULANCE_API_MONGODB_DATABASE",
        "AMBULANCE_API_MONGODB_COLLECTION",
        "AMBULANCE_API_MONGODB_TIMEOUT_SECONDS",
    ];

    #[fixture]
    fn empty_settings() -> MongoSettings {
        MongoSettings {
            uri: None,
            host: None,
            port: None,
            username: None,
            password: None,
            database: None,
            collection: None,
            timeout_seconds: None,
        }
    }

    #[rstest]
    fn defaults_apply_when_nothing_is_set(empty_settings: MongoSettings) {
        let resolved = MongoStoreConfig::default().resolve(&empty_settings);

        assert_eq!(resolved.uri(), "mongodb://localhost:27017");
        assert_eq!(resolved.database(), "ambulance-wl");
        assert_eq!(resolved.collection(), "ambulance");
        assert_eq!(resolved.timeout(), Duration::from_secs(10));
        assert!(resolved.credential().is_none());
    }

    #[rstest]
    fn explicit_overrides_win_over_settings(mut empty_settings: MongoSettings) {
        empty_settings.database = Some("from-env".into());
        empty_settings.collection = Some("from-env".into());

        let resolved = MongoStoreConfig::default()
            .with_uri("mongodb://db.internal:27018")
            .with_database("explicit")
            .with_collection("explicit")
            .with_timeout(Duration::from_secs(2))
            .resolve(&empty_settings);

        assert_eq!(resolved.uri(), "mongodb://db.internal:27018");
        assert_eq!(resolved.database(), "explicit");
        assert_eq!(resolved.collection(), "explicit");
        assert_eq!(resolved.timeout(), Duration::from_secs(2));
    }

    #[rstest]
    fn blank_overrides_fall_back_to_settings(mut empty_settings: MongoSettings) {
        empty_settings.collection = Some("wards".into());

        let resolved = MongoStoreConfig::default()
            .with_collection("  ")
            .resolve(&empty_settings);

        assert_eq!(resolved.collection(), "wards");
    }

    #[rstest]
    fn debug_output_redacts_password(mut empty_settings: MongoSettings) {
        empty_settings.username = Some("nurse".into());
        empty_settings.password = Some("s3cret".into());

        let resolved = MongoStoreConfig::default().resolve(&empty_settings);

        assert!(resolved.credential().is_some());
        assert!(!format!("{resolved:?}").contains("s3cret"));
    }

    #[rstest]
    fn environment_supplies_defaults() {
        let mut vars: Vec<(&str, Option<String>)> =
            MONGO_VARS.iter().map(|name| (*name, None)).collect();
        vars[1].1 = Some("mongo.svc".to_owned());
        vars[2].1 = Some("27100".to_owned());
        vars[5].1 = Some("wac-hospital".to_owned());
        let _guard = lock_env(vars);

        let settings = MongoSettings::load_from_env().expect("settings load");
        let resolved = MongoStoreConfig::default().resolve(&settings);

        assert_eq!(resolved.uri(), "mongodb://mongo.svc:27100");
        assert_eq!(resolved.database(), "wac-hospital");
        assert_eq!(resolved.collection(), "ambulance");
    }
}
