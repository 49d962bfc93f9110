use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use perigee::config::ServerConfig;
use perigee::db::Database;
use perigee::server::{router, AppState};

/// A fresh application over its own mock store.
fn app() -> Router {
    let config = ServerConfig {
        mock_db: true,
        ..Default::default()
    };
    let state = Arc::new(AppState {
        db: Database::mock(),
        config,
    });
    router(state)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            &json!({ "email": email, "password": password }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["token"].as_str().expect("login returns a token").to_string()
}

#[tokio::test]
async fn health_reports_ok() -> anyhow::Result<()> {
    let response = app().oneshot(get("/health", None)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "perigee");
    Ok(())
}

#[tokio::test]
async fn register_login_me_roundtrip() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/register",
            &json!({
                "email": "new@demo.com",
                "password": "secret1",
                "fullName": "New Student",
                "role": "student"
            }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], "usr-4-student");
    let token = body["token"].as_str().unwrap().to_string();

    // Registering the same email again is rejected.
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/register",
            &json!({
                "email": "new@demo.com",
                "password": "secret1",
                "fullName": "Imposter",
                "role": "student"
            }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get("/api/auth/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["email"], "new@demo.com");
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = app();
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            &json!({ "email": "student@demo.com", "password": "wrong" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            &json!({ "email": "ghost@demo.com", "password": "demo123" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn seed_student_sees_joined_enrollment() {
    let app = app();
    let token = login(&app, "student@demo.com", "demo123").await;

    let response = app
        .oneshot(get("/api/enrollments/my", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["course_title"], "Introduction to React");
    assert_eq!(rows[0]["course_id"], "crs-1");
}

#[tokio::test]
async fn course_browsing_is_public() {
    let app = app();

    let response = app.clone().oneshot(get("/api/courses", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let response = app
        .clone()
        .oneshot(get("/api/courses/crs-2", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let course = body_json(response).await;
    assert_eq!(course["title"], "Advanced TypeScript");

    let response = app.oneshot(get("/api/courses/crs-999", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn course_creation_requires_instructor_role() {
    let app = app();

    let payload = json!({
        "title": "Rust for the Web",
        "description": "Ownership, lifetimes, and async servers.",
        "price": 19.99,
        "published": true
    });

    // Anonymous: 401.
    let response = app
        .clone()
        .oneshot(post_json("/api/courses", &payload, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Student: 403.
    let student = login(&app, "student@demo.com", "demo123").await;
    let response = app
        .clone()
        .oneshot(post_json("/api/courses", &payload, Some(&student)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Instructor: passes authorization, but the mock store has no handler
    // for course inserts, so the write comes back empty and the handler
    // reports a failed creation.
    let instructor = login(&app, "instructor@demo.com", "demo123").await;
    let response = app
        .clone()
        .oneshot(post_json("/api/courses", &payload, Some(&instructor)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn instructor_sees_their_own_catalog() {
    let app = app();
    let instructor = login(&app, "instructor@demo.com", "demo123").await;

    let response = app
        .clone()
        .oneshot(get("/api/courses/instructor/my", Some(&instructor)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let student = login(&app, "student@demo.com", "demo123").await;
    let response = app
        .oneshot(get("/api/courses/instructor/my", Some(&student)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn instructor_lists_course_students() {
    let app = app();
    let instructor = login(&app, "instructor@demo.com", "demo123").await;

    let response = app
        .clone()
        .oneshot(get(
            "/api/enrollments/course/crs-1/students",
            Some(&instructor),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let students = body.as_array().unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["student_email"], "student@demo.com");

    // A student asking for the same roster is refused.
    let student = login(&app, "student@demo.com", "demo123").await;
    let response = app
        .oneshot(get("/api/enrollments/course/crs-1/students", Some(&student)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_token_is_forbidden() {
    let app = app();
    let response = app
        .oneshot(get("/api/auth/me", Some("not-a-jwt")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn mock_mode_serves_empty_lessons_instead_of_failing() {
    let app = app();
    let response = app
        .oneshot(get("/api/lessons/course/crs-1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn progress_requires_enrollment() {
    let app = app();
    let instructor = login(&app, "instructor@demo.com", "demo123").await;

    // The instructor is not enrolled in crs-1; progress reporting is 403.
    let response = app
        .oneshot(post_json(
            "/api/progress/update",
            &json!({
                "courseId": "crs-1",
                "lessonId": "lsn-1",
                "completed": true
            }),
            Some(&instructor),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
