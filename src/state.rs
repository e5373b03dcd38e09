use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::{DbIdentityProvider, IdentityProvider};
use crate::services::EnrollmentLedger;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub ledger: EnrollmentLedger,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// State backed by one pool, resolving callers from the users table.
    pub fn new(db: SqlitePool) -> Self {
        Self {
            ledger: EnrollmentLedger::new(db.clone()),
            identity: Arc::new(DbIdentityProvider::new(db.clone())),
            db,
        }
    }
}
