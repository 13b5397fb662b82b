use std::collections::HashMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::Router;
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::auth::{self, Claims};
use crate::error::AppError;
use crate::models::ColumnSettingPatch;
use crate::services::{CatalogService, SearchParams, SearchResponse, tabular};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(search_courses))
        .route("/auth/login", post(login))
        .route("/auth/verify", get(verify_session).delete(logout))
        .route("/settings", get(list_settings).put(save_settings))
        .route("/upload", post(upload_dataset))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn search_courses(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = params.get("q").cloned().unwrap_or_default();
    let page = params.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
    let page_size = params
        .get("pageSize")
        .and_then(|v| v.parse().ok())
        .unwrap_or(50);

    let mut filters = Vec::new();
    for (key, value) in &params {
        if let Some(column) = key.strip_prefix("filter_") {
            if !value.is_empty() && value != "All" {
                filters.push((column.to_string(), value.clone()));
            }
        }
    }

    let service = CatalogService::new(state.db.clone());
    let result = service
        .search(SearchParams {
            query,
            filters,
            page,
            page_size,
        })
        .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let username = req.username.unwrap_or_default();
    let password = req.password.unwrap_or_default();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let (token, claims) = state.auth.login(&state.db, &username, &password).await?;

    Ok((
        AppendHeaders([(header::SET_COOKIE, auth::session_cookie(&token))]),
        Json(json!({ "success": true, "username": claims.username })),
    )
        .into_response())
}

async fn verify_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match admin_claims(&state, &headers) {
        Some(claims) => {
            Json(json!({ "authenticated": true, "username": claims.username })).into_response()
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "authenticated": false })),
        )
            .into_response(),
    }
}

async fn logout() -> Response {
    (
        AppendHeaders([(header::SET_COOKIE, auth::clear_session_cookie())]),
        Json(json!({ "success": true })),
    )
        .into_response()
}

async fn list_settings(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let service = CatalogService::new(state.db.clone());
    let settings = service.list_settings().await?;
    Ok(Json(json!({ "settings": settings })))
}

async fn save_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    require_admin(&state, &headers)?;

    let entries = body
        .get("settings")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::BadRequest("Invalid settings format".to_string()))?;
    let patches: Vec<ColumnSettingPatch> = serde_json::from_value(Value::Array(entries.clone()))
        .map_err(|_| AppError::BadRequest("Invalid settings format".to_string()))?;

    let service = CatalogService::new(state.db.clone());
    let settings = service.save_settings(patches).await?;
    Ok(Json(json!({ "success": true, "settings": settings })))
}

/// Admin-gated wholesale import. The body is either CSV (header row = column
/// list) or JSON `{"rows": [...]}`.
async fn upload_dataset(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    require_admin(&state, &headers)?;

    if body.is_empty() {
        return Err(AppError::BadRequest("No file uploaded".to_string()));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let rows = if content_type.contains("json") {
        tabular::parse_json_rows(&body)?
    } else {
        tabular::parse_csv(&body)?
    };

    let service = CatalogService::new(state.db.clone());
    let summary = service.import(rows).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Uploaded {} courses with {} columns",
            summary.row_count,
            summary.columns.len()
        ),
        "columns": summary.columns,
        "rowCount": summary.row_count,
    })))
}

fn admin_claims(state: &AppState, headers: &HeaderMap) -> Option<Claims> {
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok());
    let token = auth::token_from_cookie_header(cookie_header)?;
    state.auth.verify_token(&token)
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Claims, AppError> {
    admin_claims(state, headers).ok_or(AppError::Unauthorized)
}
