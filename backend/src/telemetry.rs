//! OpenTelemetry metrics bootstrap.
//!
//! Builds a meter provider whose only reader is a Prometheus exporter bound
//! to a dedicated [`Registry`], installs it as the global provider, and hands
//! the registry back so `/metrics` can serve it. Resource attributes identify
//! the service, its namespace and, inside a container, the container id.

use std::borrow::Cow;

use opentelemetry::metrics::{Meter, MeterProvider as _};
use opentelemetry::{KeyValue, global};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use tracing::{debug, info};

/// `service.name` resource attribute.
pub const SERVICE_NAME: &str = "Ambulance WebAPI Service";
/// `service.namespace` resource attribute.
pub const SERVICE_NAMESPACE: &str = "WAC Hospital";
/// Semantic-conventions schema the attributes follow.
pub const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.21.0";
/// Instrumentation scope for the service's own instruments.
pub const METER_NAME: &str = "ambulance-webapi";

const CGROUP_PATH: &str = "/proc/self/cgroup";
const CONTAINER_ID_LEN: usize = 64;

/// Errors raised while building the metrics pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TelemetryError {
    /// The Prometheus exporter could not be registered.
    #[error("failed to build Prometheus exporter: {message}")]
    Exporter { message: String },
}

/// Installed metrics pipeline.
#[derive(Debug, Clone)]
pub struct Telemetry {
    provider: SdkMeterProvider,
    registry: Registry,
}

impl Telemetry {
    /// Registry the Prometheus exporter writes into.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Meter for the service's own instruments.
    pub fn meter(&self) -> Meter {
        self.provider.meter(METER_NAME)
    }
}

/// Extract a container id from the contents of `/proc/self/cgroup`.
///
/// Recognises cgroup v1 paths (`/docker/<id>`, `/kubepods/.../<id>`) and
/// systemd scopes (`docker-<id>.scope`, `cri-containerd-<id>.scope`).
pub fn container_id_from_cgroup(contents: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let segment = line.rsplit('/').next()?.trim();
        let segment = segment.strip_suffix(".scope").unwrap_or(segment);
        let candidate = segment.rsplit('-').next().unwrap_or(segment);
        let is_id = candidate.len() == CONTAINER_ID_LEN
            && candidate.bytes().all(|byte| byte.is_ascii_hexdigit());
        is_id.then(|| candidate.to_owned())
    })
}

fn detect_container_id() -> Option<String> {
    match std::fs::read_to_string(CGROUP_PATH) {
        Ok(contents) => container_id_from_cgroup(&contents),
        Err(err) => {
            debug!(error = %err, "container id not detected");
            None
        }
    }
}

/// Resource describing this service.
pub fn service_resource(container_id: Option<String>) -> Resource {
    let mut attributes = vec![KeyValue::new("service.namespace", SERVICE_NAMESPACE)];
    if let Some(id) = container_id {
        attributes.push(KeyValue::new("container.id", id));
    }
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_schema_url(attributes, Cow::Borrowed(SCHEMA_URL))
        .build()
}

/// Build the pipeline without touching global state.
///
/// # Errors
/// Returns [`TelemetryError::Exporter`] when the exporter cannot register
/// its collector.
pub fn build_telemetry(resource: Resource) -> Result<Telemetry, TelemetryError> {
    let registry = Registry::new();
    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()
        .map_err(|err| TelemetryError::Exporter {
            message: err.to_string(),
        })?;
    let provider = SdkMeterProvider::builder()
        .with_reader(exporter)
        .with_resource(resource)
        .build();
    Ok(Telemetry { provider, registry })
}

/// Build the pipeline and install it as the global meter provider.
///
/// # Errors
/// See [`build_telemetry`].
pub fn init_telemetry() -> Result<Telemetry, TelemetryError> {
    let container_id = detect_container_id();
    let telemetry = build_telemetry(service_resource(container_id.clone()))?;
    global::set_meter_provider(telemetry.provider.clone());
    info!(
        service = SERVICE_NAME,
        container_id = container_id.as_deref().unwrap_or("none"),
        "metrics pipeline installed"
    );
    Ok(telemetry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::Key;
    use prometheus::{Encoder, TextEncoder};
    use rstest::rstest;

    const ID: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[rstest]
    #[case(format!("12:memory:/docker/{ID}"))]
    #[case(format!("0::/system.slice/docker-{ID}.scope"))]
    #[case(format!("0::/kubepods.slice/kubepods-pod1.slice/cri-containerd-{ID}.scope"))]
    fn container_id_is_read_from_cgroup_paths(#[case] contents: String) {
        assert_eq!(container_id_from_cgroup(&contents).as_deref(), Some(ID));
    }

    #[rstest]
    #[case("0::/")]
    #[case("0::/user.slice/user-1000.slice/session-2.scope")]
    #[case("")]
    fn host_processes_have_no_container_id(#[case] contents: &str) {
        assert_eq!(container_id_from_cgroup(contents), None);
    }

    #[rstest]
    fn resource_carries_service_identity() {
        let resource = service_resource(Some(ID.to_owned()));

        assert_eq!(
            resource.get(&Key::new("service.name")),
            Some(SERVICE_NAME.into())
        );
        assert_eq!(
            resource.get(&Key::new("service.namespace")),
            Some(SERVICE_NAMESPACE.into())
        );
        assert_eq!(resource.get(&Key::new("container.id")), Some(ID.into()));
        assert_eq!(resource.schema_url(), Some(SCHEMA_URL));
    }

    #[rstest]
    fn instruments_reach_the_registry() {
        let telemetry = build_telemetry(service_resource(None)).expect("pipeline builds");
        telemetry
            .meter()
            .u64_counter("bootstrap.check")
            .build()
            .add(1, &[]);

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&telemetry.registry().gather(), &mut buffer)
            .expect("encode metrics");
        let text = String::from_utf8(buffer).expect("utf8 metrics");
        assert!(text.contains("bootstrap_check"), "{text}");
    }
}
