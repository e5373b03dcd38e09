use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::SqlitePool;

use crate::db::users;
use crate::error::AppError;
use crate::models::{Role, Section};
use crate::state::AppState;

/// Header carrying the caller id set by the upstream authenticator.
pub const USER_ID_HEADER: &str = "x-user-id";

/// An already-authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_role(Role::Admin)
    }

    /// Admins manage every section; teachers only the ones they teach.
    pub fn can_manage_section(&self, section: &Section) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Teacher => section.teacher_id == self.user_id,
            Role::Student => false,
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `None` when the id does not belong to a known user.
    async fn resolve(&self, user_id: &str) -> Result<Option<Principal>, AppError>;
}

/// Resolves principals from the `users` table.
pub struct DbIdentityProvider {
    db: SqlitePool,
}

impl DbIdentityProvider {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityProvider for DbIdentityProvider {
    async fn resolve(&self, user_id: &str) -> Result<Option<Principal>, AppError> {
        let user = users::find_by_id(&self.db, user_id).await?;
        Ok(user.map(|u| Principal {
            user_id: u.id,
            role: u.role,
        }))
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthorized)?;

        state
            .identity
            .resolve(user_id)
            .await?
            .ok_or(AppError::Unauthorized)
    }
}
