use axum::{Json, extract::State};

use crate::auth::Principal;
use crate::error::AppError;
use crate::services::dashboard::{self, Dashboard};
use crate::state::AppState;

pub async fn show(principal: Principal, State(state): State<AppState>) -> Result<Json<Dashboard>, AppError> {
    let dashboard = dashboard::build(&state.db, &principal.user_id, principal.role).await?;
    Ok(Json(dashboard))
}
