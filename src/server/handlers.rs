use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use validator::Validate;

use crate::db::{field_str, verify_password, Row};
use crate::models::{course, enrollment, invite, lesson, progress, user, UserRole};

use super::auth::{issue_token, AuthUser};
use super::error::ApiError;
use super::models::{
    AcceptInviteRequest, AuthResponse, AuthUserInfo, CreateCourseRequest, CreateInviteRequest,
    LoginRequest, ProgressUpdateRequest, RegisterRequest, ReorderLessonsRequest,
};
use super::AppState;

/// Roles allowed to manage courses, lessons, and invites.
const INSTRUCTOR_ROLES: &[UserRole] = &[UserRole::Instructor, UserRole::Admin];

fn validate<T: Validate>(payload: &T) -> Result<(), ApiError> {
    payload.validate().map_err(|e| {
        let message = e
            .field_errors()
            .values()
            .flat_map(|errors| errors.iter())
            .filter_map(|error| error.message.as_ref())
            .map(|m| m.to_string())
            .next()
            .unwrap_or_else(|| "Invalid request".to_string());
        ApiError::bad_request(message)
    })
}

fn row_field(row: &Row, key: &str) -> String {
    field_str(row, key).unwrap_or_default().to_string()
}

// ========== HEALTH ==========

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "service": "perigee",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

// ========== AUTH ==========

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&payload)?;

    if user::find_by_email(&state.db, &payload.email).await?.is_some() {
        return Err(ApiError::bad_request("User already exists"));
    }

    let password_hash = user::hash_password(&payload.password)?;

    let created = user::create(
        &state.db,
        &payload.email,
        &password_hash,
        &payload.full_name,
        payload.role,
    )
    .await?
    .ok_or_else(|| ApiError::bad_request("Registration failed"))?;

    let user_id = row_field(&created, "id");
    let token = issue_token(&user_id, payload.role, &state.config.jwt_secret)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            user: AuthUserInfo {
                id: user_id,
                email: row_field(&created, "email"),
                name: row_field(&created, "full_name"),
                role: row_field(&created, "role"),
                avatar: None,
            },
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let found = user::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let hash = row_field(&found, "password_hash");
    if !verify_password(&payload.password, &hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let role: UserRole = serde_json::from_value(json!(row_field(&found, "role")))
        .map_err(|_| ApiError::unauthorized("Invalid credentials"))?;
    let user_id = row_field(&found, "id");
    let token = issue_token(&user_id, role, &state.config.jwt_secret)?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        user: AuthUserInfo {
            id: user_id,
            email: row_field(&found, "email"),
            name: row_field(&found, "full_name"),
            role: role.to_string(),
            avatar: field_str(&found, "avatar_url").map(str::to_string),
        },
        token,
    }))
}

pub async fn current_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let found = user::find_by_id(&state.db, &auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(found))
}

// ========== COURSES ==========

pub async fn list_courses(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let courses = course::find_all(&state.db, true).await?;
    Ok(Json(courses))
}

/// Courses owned by the authenticated instructor, drafts included.
pub async fn my_courses(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_role(INSTRUCTOR_ROLES)?;
    let courses = course::find_by_instructor(&state.db, &auth.user_id).await?;
    Ok(Json(courses))
}

pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let found = course::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    Ok(Json(found))
}

pub async fn create_course(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_role(INSTRUCTOR_ROLES)?;
    validate(&payload)?;

    let created = course::create(
        &state.db,
        &payload.title,
        &payload.description,
        &auth.user_id,
        payload.thumbnail_url.as_deref(),
        payload.price.unwrap_or(0.0),
        payload.published.unwrap_or(false),
    )
    .await?
    .ok_or_else(|| ApiError::bad_request("Course creation failed"))?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_course(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(changes): Json<course::CourseUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_role(INSTRUCTOR_ROLES)?;

    let found = course::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    auth.require_owner_or_admin(
        &row_field(&found, "instructor_id"),
        "Not authorized to update this course",
    )?;

    let updated = course::update(&state.db, &id, &changes).await?;
    Ok(Json(updated))
}

pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_role(INSTRUCTOR_ROLES)?;

    let found = course::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    auth.require_owner_or_admin(
        &row_field(&found, "instructor_id"),
        "Not authorized to delete this course",
    )?;

    course::delete(&state.db, &id).await?;
    Ok(Json(json!({ "message": "Course deleted successfully" })))
}

// ========== ENROLLMENTS ==========

pub async fn my_enrollments(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let enrollments = enrollment::find_by_user(&state.db, &auth.user_id).await?;
    Ok(Json(enrollments))
}

pub async fn course_students(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_role(INSTRUCTOR_ROLES)?;

    let found = course::find_by_id(&state.db, &course_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    auth.require_owner_or_admin(&row_field(&found, "instructor_id"), "Not authorized")?;

    let students = enrollment::find_by_course(&state.db, &course_id).await?;
    Ok(Json(students))
}

// ========== INVITES ==========

pub async fn create_invite(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<CreateInviteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_role(INSTRUCTOR_ROLES)?;
    validate(&payload)?;

    let found = course::find_by_id(&state.db, &payload.course_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    auth.require_owner_or_admin(&row_field(&found, "instructor_id"), "Not authorized")?;

    let created = invite::create(&state.db, &payload.course_id, &payload.email, &auth.user_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invite creation failed"))?;

    // Mail delivery is out of scope; the link is returned to the caller.
    let token = row_field(&created, "token");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Invite created",
            "inviteLink": format!("{}/invite/{}", state.config.frontend_url, token),
            "invite": created,
        })),
    ))
}

pub async fn accept_invite(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<AcceptInviteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let found = invite::find_by_token(&state.db, &payload.token)
        .await?
        .ok_or_else(|| ApiError::not_found("Invalid token"))?;

    if field_str(&found, "status") != Some("pending") {
        return Err(ApiError::bad_request("Invite already used or expired"));
    }

    let course_id = row_field(&found, "course_id");
    if enrollment::exists(&state.db, &auth.user_id, &course_id).await? {
        return Err(ApiError::bad_request("Already enrolled"));
    }

    enrollment::create(&state.db, &auth.user_id, &course_id).await?;
    invite::accept(&state.db, &row_field(&found, "id")).await?;

    Ok(Json(json!({ "message": "Successfully enrolled" })))
}

// ========== LESSONS ==========

pub async fn course_lessons(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lessons = lesson::find_all(&state.db, &course_id).await?;
    Ok(Json(lessons))
}

pub async fn get_lesson(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let found = lesson::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lesson not found"))?;
    Ok(Json(found))
}

/// Shared gate for lesson writes: the course must exist and the caller must
/// own it (or be admin).
async fn require_course_ownership(
    state: &AppState,
    auth: &AuthUser,
    course_id: &str,
    message: &str,
) -> Result<(), ApiError> {
    let found = course::find_by_id(&state.db, course_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    auth.require_owner_or_admin(&row_field(&found, "instructor_id"), message)
}

pub async fn create_lesson(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<lesson::NewLesson>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_role(INSTRUCTOR_ROLES)?;

    if payload.course_id.is_empty() || payload.title.is_empty() {
        return Err(ApiError::bad_request(
            "Course ID, title, and position are required",
        ));
    }

    require_course_ownership(
        &state,
        &auth,
        &payload.course_id,
        "Not authorized to add lessons to this course",
    )
    .await?;

    let created = lesson::create(&state.db, &payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_lesson(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(changes): Json<lesson::LessonUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_role(INSTRUCTOR_ROLES)?;

    let found = lesson::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lesson not found"))?;
    require_course_ownership(
        &state,
        &auth,
        &row_field(&found, "course_id"),
        "Not authorized to update this lesson",
    )
    .await?;

    let updated = lesson::update(&state.db, &id, &changes).await?;
    Ok(Json(updated))
}

pub async fn delete_lesson(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_role(INSTRUCTOR_ROLES)?;

    let found = lesson::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lesson not found"))?;
    require_course_ownership(
        &state,
        &auth,
        &row_field(&found, "course_id"),
        "Not authorized to delete this lesson",
    )
    .await?;

    lesson::delete(&state.db, &id).await?;
    Ok(Json(json!({ "message": "Lesson deleted successfully" })))
}

pub async fn reorder_lessons(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(course_id): Path<String>,
    Json(payload): Json<ReorderLessonsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_role(INSTRUCTOR_ROLES)?;

    require_course_ownership(
        &state,
        &auth,
        &course_id,
        "Not authorized to reorder lessons in this course",
    )
    .await?;

    lesson::reorder(&state.db, &course_id, &payload.lesson_ids).await?;
    Ok(Json(json!({ "message": "Lessons reordered successfully" })))
}

// ========== PROGRESS ==========

pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<ProgressUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !enrollment::exists(&state.db, &auth.user_id, &payload.course_id).await? {
        return Err(ApiError::forbidden("Not enrolled in this course"));
    }

    let updated = progress::upsert(
        &state.db,
        &auth.user_id,
        &payload.course_id,
        &payload.lesson_id,
        &payload.data,
    )
    .await?;
    Ok(Json(updated))
}

pub async fn my_course_progress(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let details = progress::find_by_user_and_course(&state.db, &auth.user_id, &course_id).await?;
    let stats = progress::course_progress(&state.db, &auth.user_id, &course_id).await?;
    Ok(Json(json!({ "details": details, "stats": stats })))
}

pub async fn student_progress(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((course_id, student_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_role(INSTRUCTOR_ROLES)?;

    let found = course::find_by_id(&state.db, &course_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    auth.require_owner_or_admin(&row_field(&found, "instructor_id"), "Not authorized")?;

    let details = progress::find_by_user_and_course(&state.db, &student_id, &course_id).await?;
    let stats = progress::course_progress(&state.db, &student_id, &course_id).await?;
    Ok(Json(json!({
        "studentId": student_id,
        "courseId": course_id,
        "details": details,
        "stats": stats,
    })))
}
