use axum::extract::{Query, State};
use axum::{Json, http::StatusCode};

use crate::api::AppJson;
use crate::auth::Principal;
use crate::db::users;
use crate::error::{AppError, conflict_on_unique};
use crate::models::{NewUserRequest, User, UserQuery};
use crate::state::AppState;

pub async fn list_users(
    principal: Principal,
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    principal.require_admin()?;
    let users = users::list(&state.db, query.role).await?;
    Ok(Json(users))
}

pub async fn create_user(
    principal: Principal,
    State(state): State<AppState>,
    AppJson(mut req): AppJson<NewUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    principal.require_admin()?;
    req.username = req.username.trim().to_string();
    if req.username.is_empty() {
        return Err(AppError::BadRequest("username must not be empty".to_string()));
    }

    let username = req.username.clone();
    let user = users::insert(&state.db, req)
        .await
        .map_err(|e| conflict_on_unique(e, format!("user {} already exists", username)))?;

    Ok((StatusCode::CREATED, Json(user)))
}
