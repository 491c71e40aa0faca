//! Request middleware.
//!
//! The server stacks these in a fixed order, outermost first: [`Recovery`],
//! [`Trace`], [`RequestMetrics`], CORS ([`cors()`]) and [`StoreBinder`].

pub mod cors;
pub mod recovery;
pub mod request_metrics;
pub mod store_binder;
pub mod trace;

pub use cors::cors;
pub use recovery::Recovery;
pub use request_metrics::RequestMetrics;
pub use store_binder::{BoundStore, StoreBinder};
pub use trace::Trace;
