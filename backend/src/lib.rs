//! Ambulance waiting-list web API.
//!
//! Layers: [`domain`] (model, use-cases, ports), [`outbound`] (MongoDB
//! adapter), [`inbound`] (HTTP handlers), [`middleware`] and [`server`]
//! (assembly), plus [`telemetry`] for the metrics pipeline.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;
pub mod telemetry;

/// Public OpenAPI surface used by `/openapi` and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
