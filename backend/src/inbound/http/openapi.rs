//! OpenAPI document endpoint.
//!
//! ```text
//! GET /openapi
//! ```

use actix_web::{HttpResponse, get};
use utoipa::OpenApi;

use crate::doc::ApiDoc;
use crate::domain::Error;
use crate::inbound::http::ApiResult;

/// Serve the OpenAPI document as YAML.
#[get("/openapi")]
pub async fn openapi_document() -> ApiResult<HttpResponse> {
    let yaml = ApiDoc::openapi()
        .to_yaml()
        .map_err(|err| Error::internal(format!("failed to render OpenAPI document: {err}")))?;
    Ok(HttpResponse::Ok()
        .content_type("application/yaml")
        .body(yaml))
}
