use sqlx::FromRow;

/// Stored admin credential row. Never serialized into a response.
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}
