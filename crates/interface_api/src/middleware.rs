//! API middleware and request extractors

use std::convert::Infallible;

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::info;

use core_kernel::OperationMetadata;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

/// Request logging middleware
///
/// Logs method, path, status and latency of every API request.
pub async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request_id(request.headers()).unwrap_or_else(|| "-".to_string());

    let start = Utc::now();

    let response = next.run(request).await;

    let duration = Utc::now() - start;
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        request_id = %request_id,
        status = %status.as_u16(),
        duration_ms = duration.num_milliseconds(),
        "API request"
    );

    response
}

/// Operation metadata derived from the request headers
///
/// The request id becomes the correlation id passed down to every port call.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata(pub OperationMetadata);

#[async_trait]
impl<S> FromRequestParts<S> for RequestMetadata
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let metadata = match request_id(&parts.headers) {
            Some(id) => OperationMetadata::with_correlation_id(id),
            None => OperationMetadata::default(),
        };
        Ok(RequestMetadata(metadata.with_context("path", parts.uri.path())))
    }
}
