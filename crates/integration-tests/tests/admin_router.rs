//! Admin router tests: staff auth, server-side role checks and validation.
//!
//! Role tests mount the real admin routes behind an in-memory session store
//! with an extra route that logs a staff member in, so the extractors see a
//! genuine session without a database.

#![allow(clippy::unwrap_used)]

use atelier_admin::middleware::set_current_admin;
use atelier_admin::models::CurrentAdmin;
use atelier_admin::state::AppState;
use atelier_core::{AdminRole, AdminUserId, Email};
use atelier_integration_tests::{admin_app, admin_config, json_body, lazy_pool, request, session_cookie};
use axum::body::Body;
use axum::extract::Path;
use axum::http::{Method, Request, StatusCode, header};
use axum::routing::post;
use axum::Router;
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};

async fn login_as(session: Session, Path(role): Path<AdminRole>) -> StatusCode {
    let admin = CurrentAdmin {
        id: AdminUserId::new(1),
        email: Email::parse("ops@example.com").unwrap(),
        name: "Ops".to_owned(),
        role,
    };
    set_current_admin(&session, &admin).await.unwrap();
    StatusCode::NO_CONTENT
}

fn app_with_memory_sessions() -> Router {
    let state = AppState::new(admin_config(), lazy_pool());
    Router::new()
        .route("/test/login/{role}", post(login_as))
        .merge(atelier_admin::routes::routes())
        .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
        .with_state(state)
}

/// Log in as `role` and return the app plus the session cookie.
async fn logged_in(role: &str) -> (Router, String) {
    let app = app_with_memory_sessions();
    let response = app
        .clone()
        .oneshot(request(Method::POST, &format!("/test/login/{role}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = session_cookie(&response);
    (app, cookie)
}

async fn send(
    app: &Router,
    cookie: &str,
    method: Method,
    uri: &str,
    body: Option<&Value>,
) -> axum::response::Response {
    let mut req: Request<Body> = request(method, uri, body);
    req.headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    app.clone().oneshot(req).await.unwrap()
}

// =============================================================================
// Full app
// =============================================================================

#[tokio::test]
async fn test_health_and_headers() {
    let response = admin_app()
        .oneshot(request(Method::GET, "/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    assert_eq!(
        response.headers().get("x-robots-tag").unwrap(),
        "noindex, nofollow"
    );
}

#[tokio::test]
async fn test_everything_but_login_requires_a_session() {
    let cases = [
        (Method::GET, "/auth/me"),
        (Method::GET, "/dashboard"),
        (Method::GET, "/products"),
        (Method::GET, "/products/1"),
        (Method::DELETE, "/products/1"),
        (Method::GET, "/inventory/low-stock"),
        (Method::GET, "/orders"),
        (Method::GET, "/orders/1"),
        (Method::GET, "/lookbook"),
        (Method::DELETE, "/quotes/1"),
    ];

    for (method, uri) in cases {
        let response = admin_app()
            .oneshot(request(method.clone(), uri, None))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{method} {uri}"
        );
    }
}

#[tokio::test]
async fn test_login_with_malformed_email_is_plain_401() {
    let response = admin_app()
        .oneshot(request(
            Method::POST,
            "/auth/login",
            Some(&json!({"email": "ops", "password": "a long enough password"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Invalid email or password");
}

// =============================================================================
// Roles
// =============================================================================

#[tokio::test]
async fn test_viewer_cannot_write() {
    let (app, cookie) = logged_in("viewer").await;
    let product = json!({"name": "Silk Scarf", "category": "accessories", "price": "45.00"});

    let cases = [
        (Method::POST, "/products", Some(product.clone())),
        (Method::PUT, "/products/1", Some(product)),
        (Method::DELETE, "/products/1", None),
        (
            Method::POST,
            "/inventory/1/adjust",
            Some(json!({"delta": 5, "reason": "restock"})),
        ),
        (Method::PUT, "/inventory/1", Some(json!({"stock": 3}))),
        (
            Method::POST,
            "/orders/1/status",
            Some(json!({"status": "processing"})),
        ),
        (Method::DELETE, "/lookbook/1", None),
        (
            Method::POST,
            "/quotes",
            Some(json!({"text": "Less, but better."})),
        ),
    ];

    for (method, uri, body) in cases {
        let response = send(&app, &cookie, method.clone(), uri, body.as_ref()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method} {uri}");
        assert_eq!(
            json_body(response).await["error"],
            "Your role does not allow changes"
        );
    }
}

#[tokio::test]
async fn test_admin_input_is_validated_before_any_write() {
    let (app, cookie) = logged_in("admin").await;

    let response = send(
        &app,
        &cookie,
        Method::POST,
        "/products",
        Some(&json!({"name": "  ", "category": "accessories", "price": "45.00"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "name: is required");

    let response = send(
        &app,
        &cookie,
        Method::POST,
        "/inventory/1/adjust",
        Some(&json!({"delta": 0, "reason": "nothing"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        &cookie,
        Method::PUT,
        "/inventory/1",
        Some(&json!({"stock": -4})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        &cookie,
        Method::POST,
        "/lookbook",
        Some(&json!({"title": "Spring", "image_url": "javascript:alert(1)"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        &cookie,
        Method::POST,
        "/orders/1/status",
        Some(&json!({"status": "returned"})),
    )
    .await;
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_unreadable_bodies_and_queries_are_json_400s() {
    let (app, cookie) = logged_in("admin").await;

    let cases = [
        (
            Method::POST,
            "/inventory/1/adjust",
            Some(json!({"delta": "five", "reason": "restock"})),
        ),
        (
            Method::POST,
            "/products",
            Some(json!({"name": "Silk Scarf", "category": "accessories", "price": "45.00", "stok": 8})),
        ),
        (
            Method::POST,
            "/quotes",
            Some(json!({"text": "Less, but better.", "autor": "Rams"})),
        ),
        (Method::GET, "/orders?page=last", None),
        (Method::GET, "/products/scarf", None),
        (Method::GET, "/dashboard?days=week", None),
    ];

    for (method, uri, body) in cases {
        let response = send(&app, &cookie, method.clone(), uri, body.as_ref()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{method} {uri}");
        assert!(json_body(response).await["error"].is_string(), "{method} {uri}");
    }
}

#[tokio::test]
async fn test_missing_session_body_is_json() {
    let response = admin_app()
        .oneshot(request(Method::GET, "/dashboard", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Authentication required");
}

#[tokio::test]
async fn test_dashboard_window_bounds() {
    let (app, cookie) = logged_in("viewer").await;

    for days in ["0", "366"] {
        let response = send(
            &app,
            &cookie,
            Method::GET,
            &format!("/dashboard?days={days}"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "days={days}");
    }
}

#[tokio::test]
async fn test_logout_ends_session() {
    let (app, cookie) = logged_in("admin").await;

    let response = send(&app, &cookie, Method::POST, "/auth/logout", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        &cookie,
        Method::DELETE,
        "/quotes/1",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
