#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

use course_portal::api::router;
use course_portal::auth::USER_ID_HEADER;
use course_portal::db::{self, courses, sections, users};
use course_portal::models::{Course, NewCourseRequest, NewSectionRequest, NewUserRequest, Role, Section, User};
use course_portal::state::AppState;

pub async fn memory_pool() -> SqlitePool {
    let pool = db::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to create database");
    db::migrate(&pool).await.expect("Failed to run migrations");
    pool
}

/// File-backed database with several connections, for tests where
/// requests must actually contend.
pub async fn file_pool(dir: &tempfile::TempDir, max_connections: u32) -> SqlitePool {
    let url = format!("sqlite://{}", dir.path().join("portal.db").display());
    let pool = db::connect(&url, max_connections)
        .await
        .expect("Failed to open database");
    db::migrate(&pool).await.expect("Failed to run migrations");
    pool
}

pub async fn user(pool: &SqlitePool, username: &str, role: Role) -> User {
    users::insert(
        pool,
        NewUserRequest {
            id: None,
            username: username.to_string(),
            display_name: None,
            role,
        },
    )
    .await
    .expect("Failed to insert user")
}

pub async fn course(pool: &SqlitePool, code: &str) -> Course {
    courses::insert(
        pool,
        NewCourseRequest {
            code: code.to_string(),
            name: format!("{} course", code),
            description: None,
            credits: 2,
            hours: 32,
            max_students: 100,
            semester: "Spring".to_string(),
            academic_year: "2026".to_string(),
        },
    )
    .await
    .expect("Failed to insert course")
}

pub async fn section(pool: &SqlitePool, course: &Course, teacher: &User, code: &str, capacity: i64) -> Section {
    sections::insert(
        pool,
        NewSectionRequest {
            course_id: course.id.clone(),
            teacher_id: teacher.id.clone(),
            code: code.to_string(),
            classroom: "B-204".to_string(),
            schedule: "Wed 10:00-11:40".to_string(),
            max_students: capacity,
        },
    )
    .await
    .expect("Failed to insert section")
}

pub async fn current_students(pool: &SqlitePool, section_id: &str) -> i64 {
    sections::find_by_id(pool, section_id)
        .await
        .expect("Failed to fetch section")
        .expect("section exists")
        .current_students
}

pub struct TestApp {
    pub pool: SqlitePool,
    pub state: AppState,
    pub app: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_pool(memory_pool().await)
    }

    pub fn with_pool(pool: SqlitePool) -> Self {
        let state = AppState::new(pool.clone());
        let app = router(state.clone());
        Self { pool, state, app }
    }

    /// Sends one request as `user_id` and returns the status with the JSON body
    /// (`Null` when the body is empty).
    pub async fn call(&self, method: Method, uri: &str, user_id: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = user_id {
            builder = builder.header(USER_ID_HEADER, id);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self.app.clone().oneshot(request).await.expect("request failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response is JSON")
        };
        (status, json)
    }
}
