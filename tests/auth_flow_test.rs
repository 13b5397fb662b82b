use equivalency_backend::auth::{self, AuthService};
use equivalency_backend::db::repository;
use equivalency_backend::error::AppError;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

async fn seed_admin(pool: &SqlitePool, username: &str, password: &str) {
    let hash = auth::hash_password(password).expect("Failed to hash password");
    repository::insert_admin(pool, username, &hash)
        .await
        .expect("Failed to insert admin");
}

#[tokio::test]
async fn login_issues_a_verifiable_token() {
    let pool = setup_pool().await;
    seed_admin(&pool, "reb123", "reb123").await;
    let service = AuthService::new("integration-test-secret");

    let (token, claims) = service
        .login(&pool, "reb123", "reb123")
        .await
        .expect("Login failed");
    assert_eq!(claims.username, "reb123");

    // The token survives a cookie round trip.
    let cookie = auth::session_cookie(&token);
    assert!(cookie.contains("HttpOnly"));
    let header = format!("theme=dark; {}", cookie.split(';').next().expect("Empty cookie"));
    let extracted =
        auth::token_from_cookie_header(Some(&header)).expect("Token missing from cookie");
    let verified = service.verify_token(&extracted).expect("Token did not verify");
    assert_eq!(verified.id, claims.id);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_fail_identically() {
    let pool = setup_pool().await;
    seed_admin(&pool, "reb123", "reb123").await;
    let service = AuthService::new("integration-test-secret");

    let wrong_password = service
        .login(&pool, "reb123", "wrong")
        .await
        .expect_err("Expected login to fail");
    let unknown_user = service
        .login(&pool, "ghost", "reb123")
        .await
        .expect_err("Expected login to fail");

    assert!(matches!(wrong_password, AppError::InvalidCredentials));
    assert!(matches!(unknown_user, AppError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
}

#[tokio::test]
async fn tokens_from_another_secret_are_rejected() {
    let pool = setup_pool().await;
    seed_admin(&pool, "reb123", "reb123").await;

    let issuing = AuthService::new("secret-a");
    let verifying = AuthService::new("secret-b");

    let (token, _) = issuing
        .login(&pool, "reb123", "reb123")
        .await
        .expect("Login failed");
    assert!(verifying.verify_token(&token).is_none());
}
