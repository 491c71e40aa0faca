//! Server construction and middleware wiring.
//!
//! Middleware wraps every route in a fixed order, outermost first: panic
//! recovery, trace id, request metrics, CORS, store binder. Actix applies the
//! last `wrap` outermost, so the calls below read innermost first.

mod config;

pub use config::{RunMode, ServerConfig, ServiceSettings, SettingsError};

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use opentelemetry::metrics::Meter;
use prometheus::Registry;
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::doc::ApiDoc;
use crate::domain::Ambulance;
use crate::domain::ports::DocumentStore;
use crate::inbound::http::ambulances::{
    create_ambulance, delete_ambulance, get_ambulance, list_ambulances,
};
use crate::inbound::http::json_error_handler;
use crate::inbound::http::metrics::scrape;
use crate::inbound::http::openapi::openapi_document;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::waiting_list::{
    create_entry, delete_entry, get_entry, list_conditions, list_entries, update_entry,
};
use crate::middleware::{Recovery, RequestMetrics, StoreBinder, Trace, cors};

/// Value of the `http.server_name` metric attribute.
pub const SERVER_NAME: &str = "ambulance-webapi";

/// Everything a worker needs to build its application instance.
#[derive(Clone)]
pub struct AppDependencies {
    pub store: Arc<dyn DocumentStore<Ambulance>>,
    pub http_state: web::Data<HttpState>,
    pub registry: web::Data<Registry>,
    pub meter: Meter,
}

/// Assemble the application: middleware first, then routes.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        store,
        http_state,
        registry,
        meter,
    } = deps;

    App::new()
        .app_data(http_state)
        .app_data(registry)
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .wrap(StoreBinder::new(store))
        .wrap(cors())
        .wrap(RequestMetrics::new(&meter, SERVER_NAME))
        .wrap(Trace)
        .wrap(Recovery)
        .service(openapi_document)
        .service(web::resource("/metrics").route(web::route().to(scrape)))
        .service(create_ambulance)
        .service(list_ambulances)
        .service(get_ambulance)
        .service(delete_ambulance)
        .service(list_entries)
        .service(create_entry)
        .service(get_entry)
        .service(update_entry)
        .service(delete_entry)
        .service(list_conditions)
}

/// Construct the HTTP server around a connected document store.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    config: ServerConfig,
    store: Arc<dyn DocumentStore<Ambulance>>,
    http_state: HttpState,
) -> std::io::Result<Server> {
    let ServerConfig {
        bind_addr,
        run_mode,
        registry,
        meter,
    } = config;

    if run_mode == RunMode::Debug {
        for path in ApiDoc::openapi().paths.paths.keys() {
            debug!(path = %path, "route registered");
        }
    }

    let deps = AppDependencies {
        store,
        http_state: web::Data::new(http_state),
        registry: web::Data::new(registry),
        meter,
    };
    let server = HttpServer::new(move || build_app(deps.clone()))
        .bind(bind_addr)?
        .run();

    info!(address = %bind_addr, mode = ?run_mode, "http server listening");
    Ok(server)
}
