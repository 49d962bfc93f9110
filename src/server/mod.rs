use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::config::ServerConfig;
use crate::db::Database;

pub mod auth;
pub mod error;
pub mod handlers;
pub mod models;

const MAX_BODY_BYTES: usize = 1024 * 1024;
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
}

/// Assemble the application router. Public so tests can drive the full
/// stack in-process without a listener.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Auth
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/me", get(handlers::current_user))
        // Courses
        .route(
            "/api/courses",
            get(handlers::list_courses).post(handlers::create_course),
        )
        .route("/api/courses/instructor/my", get(handlers::my_courses))
        .route(
            "/api/courses/{id}",
            get(handlers::get_course)
                .put(handlers::update_course)
                .delete(handlers::delete_course),
        )
        // Enrollments
        .route("/api/enrollments/my", get(handlers::my_enrollments))
        .route(
            "/api/enrollments/course/{courseId}/students",
            get(handlers::course_students),
        )
        // Invites
        .route("/api/invites", post(handlers::create_invite))
        .route("/api/invites/accept", post(handlers::accept_invite))
        // Lessons
        .route(
            "/api/lessons/course/{courseId}",
            get(handlers::course_lessons),
        )
        .route(
            "/api/lessons/course/{courseId}/reorder",
            post(handlers::reorder_lessons),
        )
        .route("/api/lessons", post(handlers::create_lesson))
        .route(
            "/api/lessons/{id}",
            get(handlers::get_lesson)
                .put(handlers::update_lesson)
                .delete(handlers::delete_lesson),
        )
        // Progress
        .route("/api/progress/update", post(handlers::update_progress))
        .route(
            "/api/progress/course/{courseId}",
            get(handlers::my_course_progress),
        )
        .route(
            "/api/progress/instructor/{courseId}/student/{studentId}",
            get(handlers::student_progress),
        )
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

pub async fn run() {
    dotenv().ok();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    run_with_config(config).await;
}

pub async fn run_with_config(config: ServerConfig) {
    dotenv().ok();

    log::info!(
        "Server configuration: http={}:{}, environment={}, mock_db={}",
        config.http_host,
        config.http_port,
        config.environment,
        config.mock_db
    );

    let db = match Database::connect(&config).await {
        Ok(db) => db,
        Err(e) => {
            log::error!("Failed to initialize data layer: {}", e);
            log::error!("Set MOCK_DB=true to run without a database.");
            std::process::exit(1);
        }
    };

    if db.is_mock() {
        log::warn!("serving from the in-memory mock store; data resets on restart");
    }

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
    });
    let app = router(state);

    let bind_address = format!("{}:{}", config.http_host, config.http_port);
    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => {
            log::info!("Listening on http://{}", bind_address);
            listener
        }
        Err(e) => {
            log::error!("Failed to bind HTTP listener to {}: {}", bind_address, e);
            log::error!("Is another process using port {}?", config.http_port);
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(e) = server.await {
        log::error!("HTTP server fatal error: {:?}", e);
        std::process::exit(1);
    }
    log::info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to register Ctrl+C handler: {}", e);
        // Without the handler the server still runs; it just cannot be
        // stopped gracefully.
        std::future::pending::<()>().await;
    }
    log::info!("Received shutdown signal, shutting down...");
}
