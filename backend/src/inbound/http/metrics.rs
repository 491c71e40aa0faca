//! Prometheus scrape endpoint.
//!
//! Registered for every method on `/metrics`.

use actix_web::{HttpResponse, web};
use prometheus::{Encoder, Registry, TextEncoder};

use crate::domain::Error;
use crate::inbound::http::ApiResult;

/// Encode every metric family gathered from the registry.
pub async fn scrape(registry: web::Data<Registry>) -> ApiResult<HttpResponse> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&registry.gather(), &mut buffer)
        .map_err(|err| Error::internal(format!("failed to encode metrics: {err}")))?;
    Ok(HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer))
}
