use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode};
use tracing::info;

use crate::api::AppJson;
use crate::auth::Principal;
use crate::db::{announcements, courses, enrollments, sections, users};
use crate::error::{AppError, conflict_on_unique};
use crate::models::{
    EnrollRequest, Enrollment, NewSectionRequest, Role, Section, SectionDetail, SectionQuery, SectionSummary,
    UpdateSectionRequest,
};
use crate::state::AppState;

/// SQLite treats a negative LIMIT as no limit.
const NO_LIMIT: i64 = -1;

pub async fn list_sections(
    _principal: Principal,
    State(state): State<AppState>,
    Query(query): Query<SectionQuery>,
) -> Result<Json<Vec<SectionSummary>>, AppError> {
    let sections = sections::list_summaries(&state.db, query.search.as_deref()).await?;
    Ok(Json(sections))
}

pub async fn create_section(
    principal: Principal,
    State(state): State<AppState>,
    AppJson(req): AppJson<NewSectionRequest>,
) -> Result<(StatusCode, Json<Section>), AppError> {
    principal.require_admin()?;
    req.validate()?;

    if courses::find_by_id(&state.db, &req.course_id).await?.is_none() {
        return Err(AppError::NotFound("course".to_string()));
    }
    ensure_teacher(&state, &req.teacher_id).await?;

    let code = req.code.trim().to_string();
    let section = sections::insert(&state.db, req)
        .await
        .map_err(|e| conflict_on_unique(e, format!("section {} already exists for this course", code)))?;

    info!("section {} created for course {}", section.id, section.course_id);
    Ok((StatusCode::CREATED, Json(section)))
}

/// Enrollments are listed in full for the section's managers; a student
/// only sees their own record.
pub async fn get_section(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SectionDetail>, AppError> {
    let section = find_section(&state, &id).await?;

    let enrollments: Vec<Enrollment> = if principal.can_manage_section(&section) {
        enrollments::list_by_section(&state.db, &section.id).await?
    } else {
        enrollments::find_for_student(&state.db, &principal.user_id, &section.id)
            .await?
            .into_iter()
            .collect()
    };
    let announcements = announcements::list_active(&state.db, Some(&section.id)).await?;

    Ok(Json(SectionDetail {
        available_spots: section.available_spots(),
        section,
        enrollments,
        announcements,
    }))
}

pub async fn update_section(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateSectionRequest>,
) -> Result<Json<Section>, AppError> {
    principal.require_admin()?;
    req.validate()?;

    let mut current = find_section(&state, &id).await?;
    if let Some(teacher_id) = &req.teacher_id {
        ensure_teacher(&state, teacher_id).await?;
    }

    let mut tx = state.db.begin().await?;

    if let Some(max_students) = req.max_students {
        if !sections::set_capacity(&mut *tx, &current.id, max_students).await? {
            tx.rollback().await?;
            return Err(AppError::Conflict(format!(
                "capacity {} is below the section's current enrollment",
                max_students
            )));
        }
        current.max_students = max_students;
    }

    let updated = match sections::update_details(&mut *tx, current, &req).await {
        Ok(section) => section,
        Err(e) => {
            tx.rollback().await?;
            return Err(conflict_on_unique(e, "section code already exists for this course"));
        }
    };
    tx.commit().await?;

    // The counter may have moved since the section was read.
    let section = sections::find_by_id(&state.db, &updated.id)
        .await?
        .ok_or_else(|| AppError::NotFound("section".to_string()))?;
    Ok(Json(section))
}

pub async fn delete_section(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    principal.require_admin()?;

    if sections::delete(&state.db, &id).await? {
        info!("section {} deleted by {}", id, principal.user_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("section".to_string()))
    }
}

pub async fn available_sections(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<SectionSummary>>, AppError> {
    principal.require_role(Role::Student)?;
    let sections = sections::list_available_for_student(&state.db, &principal.user_id, NO_LIMIT).await?;
    Ok(Json(sections))
}

pub async fn enroll(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<AppJson<EnrollRequest>>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    principal.require_role(Role::Student)?;
    let req = body.map(|AppJson(req)| req).unwrap_or_default();
    let enrollment = state.ledger.enroll(&principal.user_id, &id, req.remarks).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// Drops the caller's approved enrollment in this section.
pub async fn unenroll(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Enrollment>, AppError> {
    principal.require_role(Role::Student)?;

    let record = enrollments::find_for_student(&state.db, &principal.user_id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("enrollment".to_string()))?;
    let enrollment = state.ledger.drop(&record.id).await?;
    Ok(Json(enrollment))
}

async fn find_section(state: &AppState, id: &str) -> Result<Section, AppError> {
    sections::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("section".to_string()))
}

async fn ensure_teacher(state: &AppState, user_id: &str) -> Result<(), AppError> {
    let user = users::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("teacher".to_string()))?;
    if user.role != Role::Teacher {
        return Err(AppError::BadRequest(format!("user {} is not a teacher", user.username)));
    }
    Ok(())
}
