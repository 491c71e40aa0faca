//! Service settings and the HTTP server configuration object.

use std::ffi::OsString;
use std::net::{Ipv4Addr, SocketAddr};

use opentelemetry::global;
use opentelemetry::metrics::Meter;
use ortho_config::OrthoConfig;
use prometheus::Registry;
use serde::Deserialize;

use crate::telemetry::{METER_NAME, Telemetry};

const SETTINGS_PROGRAM: &str = "ambulance-webapi";
const DEFAULT_PORT: u16 = 8080;
const PRODUCTION: &str = "production";

/// Errors raised while reading service settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// Environment or configuration files could not be parsed.
    #[error("failed to load service settings: {message}")]
    Load { message: String },
}

/// Framework mode selected by `AMBULANCE_API_ENVIRONMENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Verbose logging and human-readable output.
    Debug,
    /// JSON logs at info level.
    Release,
}

impl RunMode {
    /// Default log filter directive for the mode.
    pub fn default_log_filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "info",
        }
    }
}

/// Settings read from `AMBULANCE_API_*` environment variables.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "AMBULANCE_API")]
pub struct ServiceSettings {
    /// Listening port; unset means 8080.
    pub port: Option<u16>,
    /// Deployment environment name.
    pub environment: Option<String>,
}

impl ServiceSettings {
    /// Load settings from the process environment only.
    ///
    /// # Errors
    /// Returns [`SettingsError::Load`] when a variable cannot be parsed, for
    /// example a port outside `0..=65535`.
    pub fn load_from_env() -> Result<Self, SettingsError> {
        Self::load_from_iter([OsString::from(SETTINGS_PROGRAM)]).map_err(|err| {
            SettingsError::Load {
                message: err.to_string(),
            }
        })
    }

    /// Resolved listening port.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// `Release` only when the environment is `production`, in any case.
    pub fn run_mode(&self) -> RunMode {
        match self.environment.as_deref() {
            Some(env) if env.trim().eq_ignore_ascii_case(PRODUCTION) => RunMode::Release,
            _ => RunMode::Debug,
        }
    }

    /// Address the server listens on: every interface at the resolved port.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port()))
    }
}

/// Builder-style configuration for creating the HTTP server.
#[derive(Clone)]
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) run_mode: RunMode,
    pub(crate) registry: Registry,
    pub(crate) meter: Meter,
}

impl ServerConfig {
    /// Construct a configuration using the global meter and an empty
    /// registry.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, run_mode: RunMode) -> Self {
        Self {
            bind_addr,
            run_mode,
            registry: Registry::new(),
            meter: global::meter(METER_NAME),
        }
    }

    /// Record request metrics through `telemetry` and serve its registry on
    /// `/metrics`.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: &Telemetry) -> Self {
        self.registry = telemetry.registry().clone();
        self.meter = telemetry.meter();
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Return the framework mode.
    #[must_use]
    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use env_lock::lock_env;
    use rstest::rstest;

    fn settings(port: Option<u16>, environment: Option<&str>) -> ServiceSettings {
        ServiceSettings {
            port,
            environment: environment.map(str::to_owned),
        }
    }

    #[rstest]
    #[case(None, 8080)]
    #[case(Some(9090), 9090)]
    fn port_defaults_to_8080(#[case] port: Option<u16>, #[case] expected: u16) {
        assert_eq!(settings(port, None).port(), expected);
    }

    #[rstest]
    #[case(Some("production"), RunMode::Release)]
    #[case(Some("PRODUCTION"), RunMode::Release)]
    #[case(Some("Production"), RunMode::Release)]
    #[case(Some("staging"), RunMode::Debug)]
    #[case(Some(""), RunMode::Debug)]
    #[case(None, RunMode::Debug)]
    fn production_selects_release_mode(
        #[case] environment: Option<&str>,
        #[case] expected: RunMode,
    ) {
        assert_eq!(settings(None, environment).run_mode(), expected);
    }

    #[rstest]
    fn bind_addr_listens_on_all_interfaces() {
        let addr = settings(Some(8181), None).bind_addr();
        assert_eq!(addr, SocketAddr::from(([0, 0, 0, 0], 8181)));
    }

    #[rstest]
    fn environment_variables_are_read() {
        let _guard = lock_env([
            ("AMBULANCE_API_PORT", Some("8282".to_owned())),
            ("AMBULANCE_API_ENVIRONMENT", Some("Production".to_owned())),
        ]);

        let settings = ServiceSettings::load_from_env().expect("settings load");

        assert_eq!(settings.port(), 8282);
        assert_eq!(settings.run_mode(), RunMode::Release);
    }

    #[rstest]
    fn missing_variables_fall_back_to_defaults() {
        let _guard = lock_env([
            ("AMBULANCE_API_PORT", None::<String>),
            ("AMBULANCE_API_ENVIRONMENT", None::<String>),
        ]);

        let settings = ServiceSettings::load_from_env().expect("settings load");

        assert_eq!(settings.port(), 8080);
        assert_eq!(settings.run_mode(), RunMode::Debug);
    }
}
