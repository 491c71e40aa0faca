//! Panic recovery middleware.
//!
//! A panic raised while building or awaiting the downstream future is caught
//! and returned as an internal [`domain::Error`], which actix renders as a
//! `500` response carrying the standard error payload. The server keeps
//! serving subsequent requests.
//!
//! The middleware must not hold the `HttpRequest` across the inner call: the
//! router needs the only reference to record path parameters.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::task::{Context, Poll};

use actix_web::Error;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::error;

use crate::domain;

/// Middleware factory converting handler panics into `500` responses.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use ambulance_webapi::middleware::Recovery;
///
/// let app = App::new().wrap(Recovery);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Recovery;

impl<S, B> Transform<S, ServiceRequest> for Recovery
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RecoveryMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RecoveryMiddleware { service }))
    }
}

/// Service wrapper produced by [`Recovery`].
pub struct RecoveryMiddleware<S> {
    service: S,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

fn recovered(method: &str, path: &str, payload: Box<dyn Any + Send>) -> Error {
    error!(
        panic = %panic_message(payload.as_ref()),
        method,
        path,
        "request handler panicked"
    );
    domain::Error::internal("Internal server error").into()
}

impl<S, B> Service<ServiceRequest> for RecoveryMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let method = req.method().to_string();
        let path = req.path().to_owned();
        match std::panic::catch_unwind(AssertUnwindSafe(|| self.service.call(req))) {
            Ok(fut) => Box::pin(async move {
                AssertUnwindSafe(fut)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(recovered(&method, &path, payload)))
            }),
            Err(payload) => {
                let err = recovered(&method, &path, payload);
                Box::pin(async move { Err(err) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test as actix_test, web};
    use rstest::rstest;

    #[rstest]
    #[case(Box::new("static message") as Box<dyn Any + Send>, "static message")]
    #[case(Box::new(String::from("owned message")) as Box<dyn Any + Send>, "owned message")]
    #[case(Box::new(42_u8) as Box<dyn Any + Send>, "non-string panic payload")]
    fn panic_message_reads_common_payloads(
        #[case] payload: Box<dyn Any + Send>,
        #[case] expected: &str,
    ) {
        assert_eq!(panic_message(payload.as_ref()), expected);
    }

    async fn explode() -> HttpResponse {
        panic!("handler exploded")
    }

    #[actix_web::test]
    async fn panicking_handler_yields_internal_error_and_server_keeps_serving() {
        let app = actix_test::init_service(
            App::new()
                .wrap(Recovery)
                .route("/panic", web::get().to(explode))
                .route("/ok", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let err = actix_test::try_call_service(&app, actix_test::TestRequest::get().uri("/panic").to_request())
            .await
            .expect_err("panic is recovered as an error");
        let res = err.error_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(res.into_body()).await.expect("read body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body["code"], "internal_error");
        assert_eq!(body["message"], "Internal server error");

        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/ok").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    async fn echo_id(path: web::Path<String>) -> HttpResponse {
        HttpResponse::Ok().body(path.into_inner())
    }

    #[actix_web::test]
    async fn routes_with_path_parameters_pass_through() {
        let app = actix_test::init_service(
            App::new()
                .wrap(Recovery)
                .route("/items/{id}", web::get().to(echo_id)),
        )
        .await;

        let res =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri("/items/7").to_request()).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(actix_test::read_body(res).await, "7");
    }
}
