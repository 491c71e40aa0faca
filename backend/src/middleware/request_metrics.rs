//! OpenTelemetry request instrumentation.
//!
//! Records, per request, a counter increment and a latency sample tagged
//! with method, matched route and status code, plus an in-flight gauge.
//! Samples are taken when the request future is dropped, so requests that
//! error, panic or are abandoned by the client are counted too; a request
//! that never produced a status is recorded as `500`.
//! Instruments come from the meter handed in by the telemetry bootstrap, so
//! the Prometheus exporter sees them on `/metrics`.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};

const UNMATCHED_ROUTE: &str = "unmatched";

#[derive(Clone)]
struct Instruments {
    server_name: String,
    requests: Counter<u64>,
    duration: Histogram<f64>,
    active: UpDownCounter<i64>,
}

/// Middleware factory recording HTTP server metrics.
#[derive(Clone)]
pub struct RequestMetrics {
    instruments: Arc<Instruments>,
}

impl RequestMetrics {
    /// Create the instruments on `meter`, tagging samples with `server_name`.
    pub fn new(meter: &Meter, server_name: impl Into<String>) -> Self {
        let instruments = Instruments {
            server_name: server_name.into(),
            requests: meter
                .u64_counter("http.server.request_count")
                .with_description("Completed HTTP requests")
                .build(),
            duration: meter
                .f64_histogram("http.server.duration")
                .with_description("HTTP request latency")
                .with_unit("ms")
                .build(),
            active: meter
                .i64_up_down_counter("http.server.active_requests")
                .with_description("HTTP requests in flight")
                .build(),
        };
        Self {
            instruments: Arc::new(instruments),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestMetrics
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestMetricsMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestMetricsMiddleware {
            service,
            instruments: Arc::clone(&self.instruments),
        }))
    }
}

/// Service wrapper produced by [`RequestMetrics`].
pub struct RequestMetricsMiddleware<S> {
    service: S,
    instruments: Arc<Instruments>,
}

/// Per-request samples, recorded on drop.
struct Observation {
    instruments: Arc<Instruments>,
    method: String,
    route: String,
    started: Instant,
    status: Option<u16>,
}

impl Observation {
    fn start(instruments: Arc<Instruments>, method: String, route: String) -> Self {
        instruments
            .active
            .add(1, &active_attributes(&instruments, &method));
        Self {
            instruments,
            method,
            route,
            started: Instant::now(),
            status: None,
        }
    }

    fn finish<B>(&mut self, result: &Result<ServiceResponse<B>, Error>) {
        let status = match result {
            Ok(res) => res.status(),
            Err(err) => err.as_response_error().status_code(),
        };
        self.status = Some(status.as_u16());
    }
}

fn active_attributes(instruments: &Instruments, method: &str) -> [KeyValue; 2] {
    [
        KeyValue::new("http.method", method.to_owned()),
        KeyValue::new("http.server_name", instruments.server_name.clone()),
    ]
}

impl Drop for Observation {
    fn drop(&mut self) {
        let instruments = &self.instruments;
        instruments
            .active
            .add(-1, &active_attributes(instruments, &self.method));

        let status = self.status.unwrap_or(500);
        let attributes = [
            KeyValue::new("http.method", self.method.clone()),
            KeyValue::new("http.route", self.route.clone()),
            KeyValue::new("http.status_code", i64::from(status)),
            KeyValue::new("http.server_name", instruments.server_name.clone()),
        ];
        instruments.requests.add(1, &attributes);
        instruments.duration.record(
            self.started.elapsed().as_secs_f64() * 1000.0,
            &attributes,
        );
    }
}

impl<S, B> Service<ServiceRequest> for RequestMetricsMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Resolved from the resource map, so it is known before routing runs.
        let route = req
            .match_pattern()
            .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned());
        let mut observation = Observation::start(
            Arc::clone(&self.instruments),
            req.method().to_string(),
            route,
        );
        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            observation.finish(&result);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Recovery;
    use actix_web::{App, HttpResponse, test, web};
    use opentelemetry::metrics::MeterProvider as _;
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};

    fn scrape(registry: &Registry) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .expect("encode metrics");
        String::from_utf8(buffer).expect("utf8 metrics")
    }

    fn private_meter() -> (SdkMeterProvider, Registry) {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .expect("exporter builds");
        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        (provider, registry)
    }

    fn request_count_lines<'a>(text: &'a str, route: &str) -> Vec<&'a str> {
        let label = format!("http_route=\"{route}\"");
        text.lines()
            .filter(|line| line.starts_with("http_server_request_count") && line.contains(&label))
            .collect()
    }

    async fn explode() -> HttpResponse {
        panic!("handler exploded")
    }

    #[actix_web::test]
    async fn records_requests_with_route_and_status() {
        let (provider, registry) = private_meter();
        let meter = provider.meter("request-metrics-test");

        let app = test::init_service(
            App::new()
                .wrap(RequestMetrics::new(&meter, "test-server"))
                .route(
                    "/items/{id}",
                    web::get().to(|| async { HttpResponse::Ok().finish() }),
                ),
        )
        .await;
        test::call_service(&app, test::TestRequest::get().uri("/items/7").to_request()).await;

        let text = scrape(&registry);
        assert!(text.contains("http_server_request_count"), "{text}");
        assert!(text.contains("http_route=\"/items/{id}\""), "{text}");
        assert!(text.contains("http_status_code=\"200\""), "{text}");
        assert!(text.contains("http_server_duration"), "{text}");
    }

    #[actix_web::test]
    async fn panicking_requests_are_counted_as_server_errors() {
        let (provider, registry) = private_meter();
        let meter = provider.meter("request-metrics-test");
        let app = test::init_service(
            App::new()
                .wrap(RequestMetrics::new(&meter, "test-server"))
                .wrap(Recovery)
                .route("/boom", web::get().to(explode)),
        )
        .await;

        let outcome =
            test::try_call_service(&app, test::TestRequest::get().uri("/boom").to_request()).await;
        assert!(outcome.is_err());

        let text = scrape(&registry);
        let lines = request_count_lines(&text, "/boom");
        assert_eq!(lines.len(), 1, "{text}");
        assert!(lines[0].contains("http_status_code=\"500\""), "{text}");
        assert!(lines[0].ends_with(" 1"), "{text}");
    }

    #[actix_web::test]
    async fn unknown_paths_are_labelled_unmatched() {
        let (provider, registry) = private_meter();
        let meter = provider.meter("request-metrics-test");
        let app = test::init_service(
            App::new()
                .wrap(RequestMetrics::new(&meter, "test-server"))
                .route("/items", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        test::call_service(&app, test::TestRequest::get().uri("/nowhere").to_request()).await;

        let text = scrape(&registry);
        let lines = request_count_lines(&text, "unmatched");
        assert_eq!(lines.len(), 1, "{text}");
        assert!(lines[0].contains("http_status_code=\"404\""), "{text}");
    }
}
