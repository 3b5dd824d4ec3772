//! Request ID propagation and per-request logging.

use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Reuse the caller's request ID or generate one
fn get_or_generate_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Tag the request with an ID, echo it on the response, and log and count
/// the request.
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware};
/// use ss_server::api::request_id::request_id_middleware;
///
/// # async fn example() {
/// let app: Router = Router::new()
///     .route("/", get(|| async { "Hello" }))
///     .layer(middleware::from_fn(request_id_middleware));
/// # }
/// ```
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let started = Instant::now();
    let request_id = get_or_generate_request_id(request.headers());
    let method = request.method().clone();
    // Route templates keep the metric label set small
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    request.extensions_mut().insert(RequestId(request_id.clone()));

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %request.uri(),
        "Request started"
    );

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    let status = response.status();
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    crate::metrics::http_requests_total(method.as_str(), &path, status.as_u16());
    crate::metrics::http_request_duration_ms(method.as_str(), &path, elapsed_ms);

    tracing::info!(
        request_id = %request_id,
        status = %status,
        duration_ms = elapsed_ms as u64,
        "Request completed"
    );

    response
}

/// Request ID wrapper for extracting from request extensions
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> axum::extract::FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<RequestId>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Request ID not found in extensions",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_generate_request_id_with_existing() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("test-id-123"));

        let request_id = get_or_generate_request_id(&headers);
        assert_eq!(request_id, "test-id-123");
    }

    #[test]
    fn test_get_or_generate_request_id_generates_new() {
        let headers = HeaderMap::new();
        let request_id = get_or_generate_request_id(&headers);

        assert!(Uuid::parse_str(&request_id).is_ok());
    }

    #[test]
    fn test_empty_request_id_is_replaced() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static(""));

        assert!(Uuid::parse_str(&get_or_generate_request_id(&headers)).is_ok());
    }
}
