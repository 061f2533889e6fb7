//! End-to-end flows against a real Postgres. Run with
//! `DATABASE_URL=... cargo test -- --ignored`.

mod common;

use axum::http::StatusCode;
use common::{create_class, create_user, request, send, state_with_pool, token};
use escola::escola_core::UserRole;
use escola::router::init_router;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_register_login_refresh_and_me(pool: PgPool) {
    let app = init_router(state_with_pool(pool.clone()), None);

    let register = json!({
        "name": "Maria Souza",
        "email": "maria@escola.test",
        "password": "segredo",
        "role": "student",
        "enrollment": "2024001"
    });
    let (status, body) = send(&app, request("POST", "/api/auth/register", None, Some(register.clone()))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "student");
    assert!(body["user"].get("password").is_none());

    let (status, body) = send(&app, request("POST", "/api/auth/register", None, Some(register))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email or enrollment already registered");

    let login = json!({"email": "maria@escola.test", "password": "errada"});
    let (status, body) = send(&app, request("POST", "/api/auth/login", None, Some(login))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let login = json!({"email": "maria@escola.test", "password": "segredo"});
    let (status, body) = send(&app, request("POST", "/api/auth/login", None, Some(login.clone()))).await;
    assert_eq!(status, StatusCode::OK);
    let access = body["access_token"].as_str().unwrap().to_string();
    let refresh = body["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, request("GET", "/api/auth/me", Some(&access), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enrollment"], "2024001");

    let (status, body) = send(
        &app,
        request("POST", "/api/auth/refresh", None, Some(json!({"refresh_token": refresh}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());

    sqlx::query("UPDATE users SET is_active = false WHERE email = 'maria@escola.test'")
        .execute(&pool)
        .await
        .unwrap();
    let (status, body) = send(&app, request("POST", "/api/auth/login", None, Some(login))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User is inactive");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_managers_cannot_self_register(pool: PgPool) {
    let app = init_router(state_with_pool(pool), None);

    let body = json!({
        "name": "Diretora",
        "email": "diretora@escola.test",
        "password": "segredo",
        "role": "manager"
    });
    let (status, _) = send(&app, request("POST", "/api/auth/register", None, Some(body))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_class_roster_management(pool: PgPool) {
    let state = state_with_pool(pool.clone());
    let app = init_router(state.clone(), None);

    let teacher = create_user(&pool, "Paulo", UserRole::Teacher, None).await;
    let ana = create_user(&pool, "Ana", UserRole::Student, None).await;
    let guardian = create_user(&pool, "Rosa", UserRole::Guardian, None).await;
    let teacher_token = token(&state.jwt_config, teacher.into_inner(), UserRole::Teacher);

    let (status, class) = send(
        &app,
        request(
            "POST",
            "/api/teacher/classes",
            Some(&teacher_token),
            Some(json!({"name": "7A", "year": 2024, "subject": "Matemática"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let class_id = class["id"].as_str().unwrap().to_string();
    let students_uri = format!("/api/teacher/classes/{}/students", class_id);

    let (status, _) = send(
        &app,
        request("POST", &students_uri, Some(&teacher_token), Some(json!({"student_ids": [guardian]}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for _ in 0..2 {
        let (status, class) = send(
            &app,
            request("POST", &students_uri, Some(&teacher_token), Some(json!({"student_ids": [ana]}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(class["students"].as_array().unwrap().len(), 1);
    }

    let (status, class) = send(
        &app,
        request("DELETE", &students_uri, Some(&teacher_token), Some(json!({"student_ids": [ana]}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(class["students"].as_array().unwrap().is_empty());

    let other = create_user(&pool, "Outro", UserRole::Teacher, None).await;
    let other_token = token(&state.jwt_config, other.into_inner(), UserRole::Teacher);
    let (status, _) = send(
        &app,
        request(
            "PUT",
            &format!("/api/teacher/classes/{}", class_id),
            Some(&other_token),
            Some(json!({"name": "8B"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_attendance_session_and_student_report(pool: PgPool) {
    let state = state_with_pool(pool.clone());
    let app = init_router(state.clone(), None);

    let teacher = create_user(&pool, "Paulo", UserRole::Teacher, None).await;
    let ana = create_user(&pool, "Ana", UserRole::Student, None).await;
    let bia = create_user(&pool, "Bia", UserRole::Student, None).await;
    let outsider = create_user(&pool, "Caio", UserRole::Student, None).await;
    let class_id = create_class(&pool, teacher, "Matemática", &[ana, bia]).await;
    let teacher_token = token(&state.jwt_config, teacher.into_inner(), UserRole::Teacher);

    let session = json!({
        "class_id": class_id,
        "date": "2024-03-04",
        "entries": [
            {"student_id": ana, "status": "present"},
            {"student_id": bia, "status": "absent"}
        ]
    });
    let (status, body) = send(&app, request("POST", "/api/attendance", Some(&teacher_token), Some(session.clone()))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);
    let session_id = body["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, request("POST", "/api/attendance", Some(&teacher_token), Some(session))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let stranger = json!({
        "class_id": class_id,
        "date": "2024-03-05",
        "entries": [{"student_id": outsider, "status": "present"}]
    });
    let (status, body) = send(&app, request("POST", "/api/attendance", Some(&teacher_token), Some(stranger))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains(&outsider.to_string()));

    let (status, body) = send(
        &app,
        request(
            "PATCH",
            &format!("/api/attendance/{}/justify", session_id),
            Some(&teacher_token),
            Some(json!({"student_id": bia, "justification": "Atestado médico"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "justified");

    let bia_token = token(&state.jwt_config, bia.into_inner(), UserRole::Student);
    let (status, body) = send(
        &app,
        request("GET", &format!("/api/attendance/student/{}", bia), Some(&bia_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total_classes"], 1);
    assert_eq!(body["stats"]["justified"], 1);
    assert_eq!(body["stats"]["percentage"], "100.0");

    let (status, _) = send(
        &app,
        request("GET", &format!("/api/attendance/student/{}", ana), Some(&bia_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_report_card_visibility(pool: PgPool) {
    let state = state_with_pool(pool.clone());
    let app = init_router(state.clone(), None);

    let teacher = create_user(&pool, "Paulo", UserRole::Teacher, None).await;
    let guardian = create_user(&pool, "Rosa", UserRole::Guardian, None).await;
    let ana = create_user(&pool, "Ana", UserRole::Student, Some(guardian)).await;
    let bia = create_user(&pool, "Bia", UserRole::Student, None).await;
    let teacher_token = token(&state.jwt_config, teacher.into_inner(), UserRole::Teacher);

    for (value, bimester) in [(7.0, 1), (8.0, 1), (6.0, 2)] {
        let (status, _) = send(
            &app,
            request(
                "POST",
                "/api/grades",
                Some(&teacher_token),
                Some(json!({"student_id": ana, "subject": "Matemática", "value": value, "bimester": bimester})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let guardian_token = token(&state.jwt_config, guardian.into_inner(), UserRole::Guardian);
    let (status, body) = send(
        &app,
        request("GET", &format!("/api/grades/report-card/{}", ana), Some(&guardian_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["period"], "full academic year");
    let math = &body["report"][0];
    assert_eq!(math["subject"], "Matemática");
    assert_eq!(math["bimesters"]["1"]["average"], "7.5");
    assert_eq!(math["final_average"], "6.8");

    let bia_token = token(&state.jwt_config, bia.into_inner(), UserRole::Student);
    let (status, _) = send(
        &app,
        request("GET", &format!("/api/grades/report-card/{}", ana), Some(&bia_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let ana_token = token(&state.jwt_config, ana.into_inner(), UserRole::Student);
    let (status, body) = send(
        &app,
        request("GET", "/api/grades/average/Matem%C3%A1tica", Some(&ana_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subject"], "Matemática");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_dashboard_shapes_by_role(pool: PgPool) {
    let state = state_with_pool(pool.clone());
    let app = init_router(state.clone(), None);

    let teacher = create_user(&pool, "Paulo", UserRole::Teacher, None).await;
    let ana = create_user(&pool, "Ana", UserRole::Student, None).await;
    let manager = create_user(&pool, "Diretora", UserRole::Manager, None).await;
    create_class(&pool, teacher, "Matemática", &[ana]).await;

    let teacher_token = token(&state.jwt_config, teacher.into_inner(), UserRole::Teacher);
    let (status, body) = send(&app, request("GET", "/api/dashboard", Some(&teacher_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "teacher");
    assert_eq!(body["data"]["stats"]["classes"]["total"], 1);
    assert_eq!(body["data"]["stats"]["classes"]["classes"][0]["student_count"], 1);

    let ana_token = token(&state.jwt_config, ana.into_inner(), UserRole::Student);
    let (status, body) = send(&app, request("GET", "/api/dashboard", Some(&ana_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["grades"]["recent"].as_array().unwrap().is_empty());

    let manager_token = token(&state.jwt_config, manager.into_inner(), UserRole::Manager);
    let (status, body) = send(&app, request("GET", "/api/dashboard", Some(&manager_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stats"]["students"], 1);
    assert_eq!(body["data"]["stats"]["teachers"], 1);
    assert_eq!(body["data"]["stats"]["classes"], 1);
}
