//! `Json`, `Query` and `Path` extractors that reject with a JSON `AppError` (400).

use axum::extract::{FromRequest, FromRequestParts};

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
    struct Window {
        days: u32,
    }

    #[tokio::test]
    async fn test_truncated_json_is_bad_request() {
        let request = Request::post("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"days": 7"#))
            .unwrap();
        let err = AppJson::<Window>::from_request(request, &())
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_extracts_and_rejects() {
        let (mut parts, ()) = Request::get("/?days=30").body(()).unwrap().into_parts();
        let AppQuery(window) = AppQuery::<Window>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(window.days, 30);

        let (mut parts, ()) = Request::get("/?days=-1").body(()).unwrap().into_parts();
        let err = AppQuery::<Window>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
