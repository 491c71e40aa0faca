//! Service entry-point: settings, logging, telemetry, store and HTTP server.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use ambulance_webapi::domain::Ambulance;
use ambulance_webapi::domain::ports::DocumentStore;
use ambulance_webapi::inbound::http::state::HttpState;
use ambulance_webapi::outbound::persistence::{MongoDocumentStore, MongoStoreConfig};
use ambulance_webapi::server::{RunMode, ServerConfig, ServiceSettings, create_server};
use ambulance_webapi::telemetry::init_telemetry;

fn init_tracing(run_mode: RunMode) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(run_mode.default_log_filter()));
    let result = match run_mode {
        RunMode::Release => fmt().with_env_filter(filter).json().try_init(),
        RunMode::Debug => fmt().with_env_filter(filter).try_init(),
    };
    if let Err(e) = result {
        warn!(error = %e, "tracing init failed");
    }
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let settings = ServiceSettings::load_from_env().map_err(std::io::Error::other)?;
    let run_mode = settings.run_mode();
    init_tracing(run_mode);
    info!(mode = ?run_mode, "starting ambulance waiting-list api");

    let mut config = ServerConfig::new(settings.bind_addr(), run_mode);
    match init_telemetry() {
        Ok(telemetry) => config = config.with_telemetry(&telemetry),
        Err(err) => warn!(error = %err, "metrics disabled"),
    }

    let store: Arc<dyn DocumentStore<Ambulance>> =
        match MongoDocumentStore::<Ambulance>::connect(MongoStoreConfig::default()).await {
            Ok(store) => Arc::new(store),
            Err(err) => {
                error!(error = %err, "failed to connect to document store");
                return Err(std::io::Error::other(err));
            }
        };

    let result = match create_server(config, Arc::clone(&store), HttpState::default()) {
        Ok(server) => server.await,
        Err(err) => {
            error!(error = %err, "failed to start http server");
            Err(err)
        }
    };

    store.disconnect().await;
    info!("shutdown complete");
    result
}
