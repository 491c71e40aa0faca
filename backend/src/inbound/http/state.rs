//! Shared HTTP adapter state.
//!
//! Handlers receive this via `web::Data`. The document store is not part of
//! it: each request carries the store bound by
//! [`StoreBinder`](crate::middleware::StoreBinder).

use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use crate::domain::{Ambulance, WaitingListService};
use crate::middleware::BoundStore;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub clock: Arc<dyn Clock>,
}

impl Default for HttpState {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

impl HttpState {
    /// Construct state around the clock used for waiting-list estimates.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Waiting-list use-cases over the store bound to the current request.
    pub fn waiting_list(&self, store: &BoundStore<Ambulance>) -> WaitingListService {
        WaitingListService::new(store.store(), Arc::clone(&self.clock))
    }
}
