//! Requests rejected before any query runs: authentication, role guards,
//! body validation and malformed parameters. No database is needed.

mod common;

use axum::http::StatusCode;
use common::{offline_app, request, send, token};
use escola::escola_auth::create_access_token;
use escola::escola_config::JwtConfig;
use escola::escola_core::UserRole;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_health() {
    let (app, _) = offline_app();

    let (status, body) = send(&app, request("GET", "/", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Escola API running");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (app, _) = offline_app();

    let (status, body) = send(&app, request("GET", "/api-docs/openapi.json", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Escola API");
    assert!(body["paths"]["/api/dashboard"].is_object());
}

#[tokio::test]
async fn test_metrics_disabled_without_recorder() {
    let (app, _) = offline_app();

    let (status, _) = send(&app, request("GET", "/metrics", None, None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (app, _) = offline_app();

    for uri in [
        "/api/dashboard",
        "/api/auth/me",
        "/api/grades/mine",
        "/api/notifications/mine",
        "/api/contacts",
        "/api/events",
    ] {
        let (status, body) = send(&app, request("GET", uri, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"], "Missing authorization header", "{uri}");
    }
}

#[tokio::test]
async fn test_malformed_and_foreign_tokens_are_unauthorized() {
    let (app, _) = offline_app();

    let mut req = request("GET", "/api/dashboard", None, None);
    req.headers_mut()
        .insert("authorization", "Token abc".parse().unwrap());
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid authorization header format");

    let foreign = JwtConfig {
        secret: "another-secret-that-this-server-never-issued".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 3600,
    };
    let forged = create_access_token(
        Uuid::new_v4(),
        "intruso@escola.test",
        "Intruso",
        UserRole::Manager,
        &foreign,
    )
    .unwrap();
    let (status, body) = send(&app, request("GET", "/api/dashboard", Some(&forged), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_role_guards_reject_other_roles() {
    let (app, state) = offline_app();
    let student = token(&state.jwt_config, Uuid::new_v4(), UserRole::Student);
    let guardian = token(&state.jwt_config, Uuid::new_v4(), UserRole::Guardian);
    let teacher = token(&state.jwt_config, Uuid::new_v4(), UserRole::Teacher);

    let cases = [
        ("GET", "/api/teacher/classes".to_string(), &student),
        ("POST", "/api/grades".to_string(), &guardian),
        ("GET", "/api/grades".to_string(), &teacher),
        ("POST", "/api/attendance".to_string(), &student),
        ("POST", "/api/events".to_string(), &guardian),
        ("POST", "/api/tasks".to_string(), &student),
        ("GET", "/api/tasks/mine".to_string(), &teacher),
        ("POST", "/api/contacts".to_string(), &teacher),
        ("GET", format!("/api/attendance/class/{}", Uuid::new_v4()), &student),
    ];

    for (method, uri, token) in cases {
        let (status, body) = send(&app, request(method, &uri, Some(token.as_str()), Some(json!({})))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("Access denied for role"),
            "{method} {uri}"
        );
    }
}

#[tokio::test]
async fn test_register_validation_errors_are_unprocessable() {
    let (app, _) = offline_app();

    let body = json!({
        "name": "Al",
        "email": "not-an-email",
        "password": "123",
        "role": "student",
        "phone": "123"
    });
    let (status, body) = send(&app, request("POST", "/api/auth/register", None, Some(body))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("email is invalid"));
    assert!(message.contains("password must have at least 6 characters"));
    assert!(message.contains("phone must have 10 or 11 digits"));
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let (app, state) = offline_app();
    let teacher = token(&state.jwt_config, Uuid::new_v4(), UserRole::Teacher);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"name": "Gestor", "email": "g@escola.test", "password": "segredo", "role": "admin"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid enum value in request");

    let (status, body) = send(
        &app,
        request("POST", "/api/auth/login", None, Some(json!({"email": "a@escola.test"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "password is required");

    let mut req = request("POST", "/api/teacher/classes", Some(&teacher), None);
    *req.body_mut() = axum::body::Body::from("{\"name\": ");
    req.headers_mut()
        .insert("content-type", "application/json".parse().unwrap());
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_grade_bounds_are_validated() {
    let (app, state) = offline_app();
    let teacher = token(&state.jwt_config, Uuid::new_v4(), UserRole::Teacher);

    let body = json!({
        "student_id": Uuid::new_v4(),
        "subject": "Matemática",
        "value": 10.5,
        "bimester": 5
    });
    let (status, _) = send(&app, request("POST", "/api/grades", Some(&teacher), Some(body))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_malformed_period_is_bad_request() {
    let (app, state) = offline_app();
    let student = token(&state.jwt_config, Uuid::new_v4(), UserRole::Student);
    let uri = format!("/api/attendance/student/{}?period=fevereiro", Uuid::new_v4());

    let (status, _) = send(&app, request("GET", &uri, Some(&student), None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_event_period_is_rejected() {
    let (app, state) = offline_app();
    let student = token(&state.jwt_config, Uuid::new_v4(), UserRole::Student);

    let (status, _) = send(
        &app,
        request("GET", "/api/events/period/fortnight", Some(&student), None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_short_device_token_is_unprocessable() {
    let (app, state) = offline_app();
    let student = token(&state.jwt_config, Uuid::new_v4(), UserRole::Student);

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/notifications/device-token",
            Some(&student),
            Some(json!({"token": "short", "device": "android"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
