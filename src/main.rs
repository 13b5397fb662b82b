use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use equivalency_backend::api::router;
use equivalency_backend::auth::{self, AuthService};
use equivalency_backend::db::repository;
use equivalency_backend::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "equivalency_backend=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://equivalency.db".to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_username =
        std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "reb123".to_string());
    if repository::find_admin_by_username(&pool, &admin_username)
        .await?
        .is_none()
    {
        let admin_password =
            std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "reb123".to_string());
        let hash = auth::hash_password(&admin_password)?;
        repository::insert_admin(&pool, &admin_username, &hash).await?;
        info!("seeded admin user {}", admin_username);
    }

    let secret = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "course-equivalency-dev-secret".to_string());

    let state = AppState {
        db: pool.clone(),
        auth: Arc::new(AuthService::new(&secret)),
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
