mod admin;
mod announcements;
mod courses;
mod dashboard;
mod enrollments;
mod json;
mod sections;
mod users;

use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

pub use json::AppJson;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/dashboard", get(dashboard::show))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/courses", get(courses::list_courses).post(courses::create_course))
        .route(
            "/courses/{id}",
            get(courses::get_course)
                .patch(courses::update_course)
                .delete(courses::delete_course),
        )
        .route("/sections", get(sections::list_sections).post(sections::create_section))
        .route("/sections/available", get(sections::available_sections))
        .route(
            "/sections/{id}",
            get(sections::get_section)
                .patch(sections::update_section)
                .delete(sections::delete_section),
        )
        .route("/sections/{id}/enroll", post(sections::enroll))
        .route("/sections/{id}/unenroll", post(sections::unenroll))
        .route("/enrollments", get(enrollments::list_enrollments))
        .route("/enrollments/{id}/approve", post(enrollments::approve))
        .route("/enrollments/{id}/reject", post(enrollments::reject))
        .route("/enrollments/{id}/drop", post(enrollments::drop_enrollment))
        .route("/enrollments/{id}/cancel", post(enrollments::cancel))
        .route("/enrollments/{id}/grade", put(enrollments::record_grade))
        .route(
            "/announcements",
            get(announcements::list_announcements).post(announcements::create_announcement),
        )
        .route("/admin/audit", post(admin::run_audit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}
