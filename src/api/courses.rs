use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode};
use tracing::{info, warn};

use crate::api::AppJson;
use crate::auth::Principal;
use crate::db::{courses, sections};
use crate::error::{AppError, conflict_on_unique};
use crate::models::{
    Course, CourseDeletion, CourseDetail, CourseQuery, DeleteCourseParams, NewCourseRequest, UpdateCourseRequest,
};
use crate::state::AppState;

pub async fn list_courses(
    _principal: Principal,
    State(state): State<AppState>,
    Query(query): Query<CourseQuery>,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = courses::list(&state.db, query.search.as_deref()).await?;
    Ok(Json(courses))
}

pub async fn create_course(
    principal: Principal,
    State(state): State<AppState>,
    AppJson(req): AppJson<NewCourseRequest>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    principal.require_admin()?;
    req.validate()?;

    let code = req.code.trim().to_string();
    let course = courses::insert(&state.db, req)
        .await
        .map_err(|e| conflict_on_unique(e, format!("course code {} already exists", code)))?;

    info!("course {} created by {}", course.code, principal.user_id);
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn get_course(
    _principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseDetail>, AppError> {
    let course = find_course(&state, &id).await?;
    let sections = sections::list_by_course(&state.db, &course.id).await?;
    Ok(Json(CourseDetail::new(course, sections)))
}

pub async fn update_course(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateCourseRequest>,
) -> Result<Json<Course>, AppError> {
    principal.require_admin()?;
    req.validate()?;

    let current = find_course(&state, &id).await?;
    let course = courses::update(&state.db, current, req)
        .await
        .map_err(|e| conflict_on_unique(e, "course code already exists"))?;

    Ok(Json(course))
}

pub async fn delete_course(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeleteCourseParams>,
) -> Result<Json<CourseDeletion>, AppError> {
    principal.require_admin()?;

    let course = find_course(&state, &id).await?;
    let summary = courses::deletion_summary(&state.db, &course).await?;

    if summary.is_high_impact() && !params.confirm {
        return Err(AppError::Conflict(format!(
            "deleting course {} removes {} sections and {} enrolled students; repeat with confirm=true",
            summary.code, summary.sections_removed, summary.enrollments_cleared
        )));
    }

    if !courses::delete(&state.db, &course.id).await? {
        return Err(AppError::NotFound("course".to_string()));
    }

    if summary.is_high_impact() {
        warn!(
            "course {} deleted by {}: {} sections, {} enrollments cleared",
            summary.code, principal.user_id, summary.sections_removed, summary.enrollments_cleared
        );
    } else {
        info!("course {} deleted by {}", summary.code, principal.user_id);
    }

    Ok(Json(summary))
}

async fn find_course(state: &AppState, id: &str) -> Result<Course, AppError> {
    courses::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("course".to_string()))
}
