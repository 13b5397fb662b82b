use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::AuthService;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub auth: Arc<AuthService>,
}
