//! HTTP inbound adapter exposing REST endpoints.

pub mod ambulances;
pub mod error;
pub mod metrics;
pub mod openapi;
pub mod schemas;
pub mod state;
pub mod waiting_list;

pub use error::{ApiResult, json_error_handler};
