//! Request extractors whose rejections are [`AppError`]s.
//!
//! axum's `Json`, `Query` and `Path` reject with plain-text bodies, and with
//! a 422 for malformed JSON. These wrappers route the rejection through
//! `AppError` so clients always get a 400 with `{"error": "..."}`.

use axum::extract::FromRequest;
use axum::extract::FromRequestParts;

use crate::error::AppError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::IntoResponse;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct QuantityBody {
        quantity: u32,
    }

    async fn extract_json(body: &'static str) -> Result<AppJson<QuantityBody>, AppError> {
        let request = Request::post("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        AppJson::<QuantityBody>::from_request(request, &()).await
    }

    #[tokio::test]
    async fn test_valid_body_extracts() {
        let AppJson(body) = extract_json(r#"{"quantity": 2}"#).await.unwrap();
        assert_eq!(body.quantity, 2);
    }

    #[tokio::test]
    async fn test_wrong_type_is_bad_request() {
        let err = extract_json(r#"{"quantity": "two"}"#).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_content_type_is_bad_request() {
        let request = Request::post("/").body(Body::from("{}")).unwrap();
        let err = AppJson::<QuantityBody>::from_request(request, &()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_bad_query_is_bad_request() {
        let (mut parts, ()) = Request::get("/?quantity=lots")
            .body(())
            .unwrap()
            .into_parts();
        let err = AppQuery::<QuantityBody>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
