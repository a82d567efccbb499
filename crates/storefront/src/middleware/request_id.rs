//! Request correlation IDs for the public storefront.
//!
//! The storefront sits behind a CDN that stamps `x-request-id`, but shoppers
//! can send the header too. An incoming ID is kept only when it is short
//! visible ASCII; anything else is replaced so log lines and Sentry tags stay
//! bounded.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream ID that is passed through.
const MAX_UPSTREAM_ID_LENGTH: usize = 128;

fn usable_upstream_id(value: &HeaderValue) -> Option<&str> {
    let id = value.to_str().ok()?;
    let ok = !id.is_empty()
        && id.len() <= MAX_UPSTREAM_ID_LENGTH
        && id.bytes().all(|b| b.is_ascii_graphic());
    ok.then_some(id)
}

/// Tag the request with an ID in the tracing span, the Sentry scope and the
/// `x-request-id` response header.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(usable_upstream_id)
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);

    Span::current().record("request_id", &request_id);
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    async fn echoed_id(upstream: Option<&str>) -> String {
        let app = Router::new()
            .route("/products", get(|| async { "[]" }))
            .layer(middleware::from_fn(request_id_middleware));
        let mut request = Request::builder().uri("/products");
        if let Some(id) = upstream {
            request = request.header(REQUEST_ID_HEADER, id);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned()
    }

    #[tokio::test]
    async fn test_cdn_id_is_kept() {
        assert_eq!(echoed_id(Some("8c1f2a-CDG")).await, "8c1f2a-CDG");
    }

    #[tokio::test]
    async fn test_unusable_ids_are_replaced() {
        let long = "a".repeat(MAX_UPSTREAM_ID_LENGTH + 1);
        for upstream in [None, Some(""), Some("two words"), Some(long.as_str())] {
            let id = echoed_id(upstream).await;
            assert!(Uuid::parse_str(&id).is_ok(), "{upstream:?} -> {id}");
        }
    }
}
