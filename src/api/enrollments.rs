use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode};

use crate::api::AppJson;
use crate::auth::Principal;
use crate::db::enrollments::{self, Scope};
use crate::db::sections;
use crate::error::AppError;
use crate::models::{Enrollment, EnrollmentQuery, GradeRequest, Role, Section};
use crate::state::AppState;

pub async fn list_enrollments(
    principal: Principal,
    State(state): State<AppState>,
    Query(query): Query<EnrollmentQuery>,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    let scope = match principal.role {
        Role::Admin => Scope::All,
        Role::Teacher => Scope::Teacher(&principal.user_id),
        Role::Student => Scope::Student(&principal.user_id),
    };
    let enrollments = enrollments::list(&state.db, scope, query.status).await?;
    Ok(Json(enrollments))
}

pub async fn approve(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Enrollment>, AppError> {
    let (_, section) = load(&state, &id).await?;
    require_manager(&principal, &section)?;
    Ok(Json(state.ledger.approve(&id).await?))
}

pub async fn reject(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Enrollment>, AppError> {
    let (_, section) = load(&state, &id).await?;
    require_manager(&principal, &section)?;
    Ok(Json(state.ledger.reject(&id).await?))
}

pub async fn drop_enrollment(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Enrollment>, AppError> {
    let (enrollment, section) = load(&state, &id).await?;
    if enrollment.student_id != principal.user_id {
        require_manager(&principal, &section)?;
    }
    Ok(Json(state.ledger.drop(&id).await?))
}

pub async fn cancel(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let (enrollment, _) = load(&state, &id).await?;
    if enrollment.student_id != principal.user_id && !principal.is_admin() {
        return Err(AppError::Forbidden);
    }
    state.ledger.cancel(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn record_grade(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<GradeRequest>,
) -> Result<Json<Enrollment>, AppError> {
    let (_, section) = load(&state, &id).await?;
    require_manager(&principal, &section)?;
    let enrollment = state
        .ledger
        .record_grade(&id, req.grade, req.remarks.as_deref())
        .await?;
    Ok(Json(enrollment))
}

async fn load(state: &AppState, id: &str) -> Result<(Enrollment, Section), AppError> {
    let enrollment = enrollments::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("enrollment".to_string()))?;
    let section = sections::find_by_id(&state.db, &enrollment.section_id)
        .await?
        .ok_or_else(|| AppError::NotFound("section".to_string()))?;
    Ok((enrollment, section))
}

fn require_manager(principal: &Principal, section: &Section) -> Result<(), AppError> {
    if principal.can_manage_section(section) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
