use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::{Admin, AttributeBag, ColumnSetting, ColumnSettingUpdate, CourseRow};

// ---- attribute-bag store ----

/// Every course row in insertion order.
pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<CourseRow>, sqlx::Error> {
    sqlx::query_as::<_, CourseRow>("SELECT id, data FROM courses ORDER BY id ASC")
        .fetch_all(db)
        .await
}

pub async fn clear_courses(db: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM courses").execute(db).await?;
    Ok(())
}

/// Append a batch of attribute bags as new course rows. The batch is wrapped
/// in a transaction so concurrent readers see all of it or none of it.
pub async fn insert_courses(db: &SqlitePool, rows: &[AttributeBag]) -> Result<(), AppError> {
    let mut tx = db.begin().await?;
    for row in rows {
        let data = serde_json::to_string(row)?;
        sqlx::query("INSERT INTO courses (data) VALUES (?)")
            .bind(data)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

// ---- column registry ----

const COLUMN_SETTING_FIELDS: &str =
    "id, column_key, display_name, visible, is_filter, filter_label, sort_order";

pub async fn fetch_column_settings(db: &SqlitePool) -> Result<Vec<ColumnSetting>, sqlx::Error> {
    sqlx::query_as::<_, ColumnSetting>(&format!(
        "SELECT {COLUMN_SETTING_FIELDS} FROM column_settings ORDER BY sort_order ASC, id ASC"
    ))
    .fetch_all(db)
    .await
}

pub async fn fetch_visible_columns(db: &SqlitePool) -> Result<Vec<ColumnSetting>, sqlx::Error> {
    sqlx::query_as::<_, ColumnSetting>(&format!(
        "SELECT {COLUMN_SETTING_FIELDS} FROM column_settings WHERE visible = 1 ORDER BY sort_order ASC, id ASC"
    ))
    .fetch_all(db)
    .await
}

pub async fn fetch_filter_columns(db: &SqlitePool) -> Result<Vec<ColumnSetting>, sqlx::Error> {
    sqlx::query_as::<_, ColumnSetting>(&format!(
        "SELECT {COLUMN_SETTING_FIELDS} FROM column_settings WHERE is_filter = 1 ORDER BY sort_order ASC, id ASC"
    ))
    .fetch_all(db)
    .await
}

pub async fn clear_column_settings(db: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM column_settings").execute(db).await?;
    Ok(())
}

/// Insert-or-replace keyed by `column_key`. Replacing overwrites the whole
/// row, id included.
pub async fn upsert_column_setting(
    db: &SqlitePool,
    column_key: &str,
    display_name: &str,
    visible: bool,
    is_filter: bool,
    filter_label: Option<&str>,
    sort_order: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR REPLACE INTO column_settings \
         (column_key, display_name, visible, is_filter, filter_label, sort_order) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(column_key)
    .bind(display_name)
    .bind(visible)
    .bind(is_filter)
    .bind(filter_label)
    .bind(sort_order)
    .execute(db)
    .await?;
    Ok(())
}

/// Update only the supplied fields of one registry row. An empty update or an
/// unknown `column_key` touches nothing and reports zero rows affected.
pub async fn update_column_setting<'e, E>(
    executor: E,
    column_key: &str,
    update: &ColumnSettingUpdate,
) -> Result<u64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let mut assignments: Vec<&str> = Vec::new();
    if update.display_name.is_some() {
        assignments.push("display_name = ?");
    }
    if update.visible.is_some() {
        assignments.push("visible = ?");
    }
    if update.is_filter.is_some() {
        assignments.push("is_filter = ?");
    }
    if update.filter_label.is_some() {
        assignments.push("filter_label = ?");
    }
    if assignments.is_empty() {
        return Ok(0);
    }

    let sql = format!(
        "UPDATE column_settings SET {} WHERE column_key = ?",
        assignments.join(", ")
    );
    let mut query = sqlx::query(&sql);
    if let Some(display_name) = &update.display_name {
        query = query.bind(display_name);
    }
    if let Some(visible) = update.visible {
        query = query.bind(visible);
    }
    if let Some(is_filter) = update.is_filter {
        query = query.bind(is_filter);
    }
    if let Some(filter_label) = &update.filter_label {
        query = query.bind(filter_label.as_deref());
    }
    let result = query.bind(column_key).execute(executor).await?;
    Ok(result.rows_affected())
}

// ---- import ----

/// Wholesale replacement of both the course store and the column registry in
/// one transaction: a crash mid-import cannot leave a cleared-but-empty or
/// half-populated state behind.
pub async fn replace_dataset(
    db: &SqlitePool,
    columns: &[String],
    rows: &[AttributeBag],
) -> Result<(), AppError> {
    let mut tx = db.begin().await?;

    sqlx::query("DELETE FROM column_settings")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM courses").execute(&mut *tx).await?;

    // Freshly imported columns start visible and non-filtered; an admin opts
    // columns into filter mode explicitly afterward.
    for (index, column) in columns.iter().enumerate() {
        sqlx::query(
            "INSERT OR REPLACE INTO column_settings \
             (column_key, display_name, visible, is_filter, filter_label, sort_order) \
             VALUES (?, ?, 1, 0, NULL, ?)",
        )
        .bind(column)
        .bind(column)
        .bind(index as i64)
        .execute(&mut *tx)
        .await?;
    }

    for row in rows {
        let data = serde_json::to_string(row)?;
        sqlx::query("INSERT INTO courses (data) VALUES (?)")
            .bind(data)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

// ---- admins ----

pub async fn find_admin_by_username(
    db: &SqlitePool,
    username: &str,
) -> Result<Option<Admin>, sqlx::Error> {
    sqlx::query_as::<_, Admin>(
        "SELECT id, username, password_hash FROM admins WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(db)
    .await
}

pub async fn insert_admin(
    db: &SqlitePool,
    username: &str,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO admins (username, password_hash) VALUES (?, ?)")
        .bind(username)
        .bind(password_hash)
        .execute(db)
        .await?;
    Ok(())
}
