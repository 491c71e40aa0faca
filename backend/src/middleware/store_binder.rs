//! Binds the shared document store into every request.
//!
//! [`StoreBinder`] holds one store handle for the life of the server and
//! inserts a clone of that handle into each request's extensions before the
//! handler runs. Handlers ask for it with the [`BoundStore`] extractor; a
//! missing binding is a wiring error and surfaces as `500`.

use std::ops::Deref;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{Ready, ready};
use tracing::error;

use crate::domain;
use crate::domain::ports::DocumentStore;

/// Request-scoped handle to the shared document store.
pub struct BoundStore<T: 'static> {
    store: Arc<dyn DocumentStore<T>>,
}

impl<T: 'static> Clone for BoundStore<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<T: 'static> BoundStore<T> {
    /// Shared store handle.
    pub fn store(&self) -> Arc<dyn DocumentStore<T>> {
        Arc::clone(&self.store)
    }
}

impl<T: 'static> Deref for BoundStore<T> {
    type Target = dyn DocumentStore<T>;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

impl<T: Send + Sync + 'static> FromRequest for BoundStore<T> {
    type Error = domain::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let bound = req.extensions().get::<BoundStore<T>>().cloned();
        ready(bound.ok_or_else(|| {
            error!(path = %req.path(), "no document store bound to request");
            domain::Error::internal("document store is not bound to the request")
        }))
    }
}

/// Middleware factory attaching `store` to each request.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use actix_web::App;
/// use ambulance_webapi::domain::Ambulance;
/// use ambulance_webapi::domain::ports::InMemoryDocumentStore;
/// use ambulance_webapi::middleware::StoreBinder;
///
/// let store = Arc::new(InMemoryDocumentStore::<Ambulance>::new());
/// let app = App::new().wrap(StoreBinder::new(store));
/// ```
pub struct StoreBinder<T: 'static> {
    store: Arc<dyn DocumentStore<T>>,
}

impl<T: 'static> Clone for StoreBinder<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<T: Send + Sync + 'static> StoreBinder<T> {
    /// Bind `store` into every request passing through the middleware.
    pub fn new(store: Arc<dyn DocumentStore<T>>) -> Self {
        Self { store }
    }
}

impl<S, B, T> Transform<S, ServiceRequest> for StoreBinder<T>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    T: Send + Sync + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = StoreBinderMiddleware<S, T>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(StoreBinderMiddleware {
            service,
            store: Arc::clone(&self.store),
        }))
    }
}

/// Service wrapper produced by [`StoreBinder`].
pub struct StoreBinderMiddleware<S, T: 'static> {
    service: S,
    store: Arc<dyn DocumentStore<T>>,
}

impl<S, B, T> Service<ServiceRequest> for StoreBinderMiddleware<S, T>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    T: Send + Sync + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = S::Future;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        req.extensions_mut().insert(BoundStore::<T> {
            store: Arc::clone(&self.store),
        });
        self.service.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::InMemoryDocumentStore;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};

    async fn count(bound: BoundStore<String>) -> Result<HttpResponse, domain::Error> {
        let documents = bound.list_documents().await.map_err(|err| {
            domain::Error::internal(err.to_string())
        })?;
        Ok(HttpResponse::Ok().body(documents.len().to_string()))
    }

    #[actix_web::test]
    async fn handlers_receive_the_bound_store() {
        let store = Arc::new(InMemoryDocumentStore::<String>::new());
        store
            .create_document("a", &"alpha".to_owned())
            .await
            .expect("seed document");
        let app = test::init_service(
            App::new()
                .wrap(StoreBinder::<String>::new(store))
                .route("/", web::get().to(count)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, "1");
    }

    #[actix_web::test]
    async fn missing_binding_is_an_internal_error() {
        let app = test::init_service(App::new().route("/", web::get().to(count))).await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
