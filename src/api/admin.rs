use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::api::AppJson;
use crate::auth::Principal;
use crate::error::AppError;
use crate::services::AuditReport;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AuditRequest {
    #[serde(default)]
    pub repair: bool,
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    #[serde(flatten)]
    pub report: AuditReport,
    pub underflows: u64,
}

pub async fn run_audit(
    principal: Principal,
    State(state): State<AppState>,
    body: Option<AppJson<AuditRequest>>,
) -> Result<Json<AuditResponse>, AppError> {
    principal.require_admin()?;
    let req = body.map(|AppJson(req)| req).unwrap_or_default();
    let report = state.ledger.audit(req.repair).await?;
    Ok(Json(AuditResponse {
        report,
        underflows: state.ledger.underflow_count(),
    }))
}
