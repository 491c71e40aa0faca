//! Cross-origin resource sharing policy.
//!
//! Any origin may call the API with the methods and headers below. Browsers
//! may cache preflight answers for twelve hours. Credentials are not allowed.

use actix_cors::Cors;
use actix_web::http::header;

/// Methods advertised to browsers in preflight responses.
pub const ALLOWED_METHODS: [&str; 5] = ["GET", "PUT", "POST", "DELETE", "PATCH"];

/// Preflight cache lifetime in seconds.
pub const PREFLIGHT_MAX_AGE_SECONDS: usize = 12 * 60 * 60;

/// Build the service's CORS middleware.
///
/// Origins are matched against a wildcard and echoed back; the
/// `Access-Control-Allow-Credentials` header is never sent.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(ALLOWED_METHODS)
        .allowed_headers([header::ORIGIN, header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(PREFLIGHT_MAX_AGE_SECONDS)
}
