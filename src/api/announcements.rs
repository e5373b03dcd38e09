use axum::extract::{Query, State};
use axum::{Json, http::StatusCode};
use tracing::info;

use crate::api::AppJson;
use crate::auth::Principal;
use crate::db::{announcements, sections};
use crate::error::AppError;
use crate::models::{Announcement, AnnouncementQuery, NewAnnouncementRequest, Role};
use crate::state::AppState;

pub async fn list_announcements(
    _principal: Principal,
    State(state): State<AppState>,
    Query(query): Query<AnnouncementQuery>,
) -> Result<Json<Vec<Announcement>>, AppError> {
    let announcements = announcements::list_active(&state.db, query.section_id.as_deref()).await?;
    Ok(Json(announcements))
}

/// Admins may post globally; teachers only to a section they teach.
pub async fn create_announcement(
    principal: Principal,
    State(state): State<AppState>,
    AppJson(req): AppJson<NewAnnouncementRequest>,
) -> Result<(StatusCode, Json<Announcement>), AppError> {
    if principal.role == Role::Student {
        return Err(AppError::Forbidden);
    }
    req.validate()?;

    match req.section_id.as_deref() {
        Some(section_id) => {
            let section = sections::find_by_id(&state.db, section_id)
                .await?
                .ok_or_else(|| AppError::NotFound("section".to_string()))?;
            if !principal.can_manage_section(&section) {
                return Err(AppError::Forbidden);
            }
        }
        None if principal.role == Role::Teacher => {
            return Err(AppError::BadRequest(
                "teachers must post announcements to one of their sections".to_string(),
            ));
        }
        None => {}
    }

    let announcement = announcements::insert(&state.db, &principal.user_id, req).await?;
    info!("announcement {} posted by {}", announcement.id, principal.user_id);
    Ok((StatusCode::CREATED, Json(announcement)))
}
