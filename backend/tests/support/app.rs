//! Shared fixtures for HTTP integration tests.

use std::sync::Arc;

use actix_web::web;
use ambulance_webapi::domain::Ambulance;
use ambulance_webapi::domain::ports::{DocumentStore, InMemoryDocumentStore};
use ambulance_webapi::inbound::http::state::HttpState;
use ambulance_webapi::server::AppDependencies;
use ambulance_webapi::telemetry::{Telemetry, build_telemetry, service_resource};

/// Application wiring backed by an in-memory store and a private registry.
pub struct TestApp {
    pub store: Arc<InMemoryDocumentStore<Ambulance>>,
    pub telemetry: Telemetry,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryDocumentStore::new()),
            telemetry: build_telemetry(service_resource(None)).expect("telemetry builds"),
        }
    }

    pub fn dyn_store(&self) -> Arc<dyn DocumentStore<Ambulance>> {
        self.store.clone()
    }

    pub fn deps(&self) -> AppDependencies {
        AppDependencies {
            store: self.dyn_store(),
            http_state: web::Data::new(HttpState::default()),
            registry: web::Data::new(self.telemetry.registry().clone()),
            meter: self.telemetry.meter(),
        }
    }
}
