use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{AttributeBag, ColumnSetting, ColumnSettingPatch, attribute_text};

/// Selecting this value in a filter dropdown means "no filter", even if some
/// data value happens to equal it literally.
const FILTER_SENTINEL: &str = "All";

pub struct CatalogService {
    db: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    /// Per-column equality filters, ANDed together.
    pub filters: Vec<(String, String)>,
    pub page: i64,
    pub page_size: i64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: String::new(),
            filters: Vec::new(),
            page: 1,
            page_size: 50,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ColumnView {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct FilterView {
    pub key: String,
    pub label: String,
    pub options: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// One projected record per course: `id` plus the visible columns only.
    pub courses: Vec<AttributeBag>,
    pub columns: Vec<ColumnView>,
    pub filters: Vec<FilterView>,
    pub total: usize,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl CatalogService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Search, filter, project and paginate the course store.
    ///
    /// Search is a case-insensitive substring match across every attribute
    /// value, visible or not. Filters are case-insensitive exact matches,
    /// applied after the search. Filter options are always computed from the
    /// full unfiltered store, so an active filter on one column never narrows
    /// another column's dropdown.
    pub async fn search(&self, params: SearchParams) -> Result<SearchResponse, AppError> {
        if params.page_size < 1 {
            return Err(AppError::BadRequest("pageSize must be at least 1".to_string()));
        }
        let page = params.page.max(1);
        let page_size = params.page_size;

        let rows = repository::fetch_courses(&self.db).await?;
        let mut records: Vec<(i64, AttributeBag)> = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push((row.id, row.attributes()?));
        }

        let needle = params.query.to_lowercase();
        let mut candidates: Vec<&(i64, AttributeBag)> = records
            .iter()
            .filter(|(_, bag)| needle.is_empty() || bag_matches_query(bag, &needle))
            .collect();

        let active_filters: Vec<(&str, String)> = params
            .filters
            .iter()
            .filter(|(_, value)| !value.is_empty() && value != FILTER_SENTINEL)
            .map(|(key, value)| (key.as_str(), value.to_lowercase()))
            .collect();
        if !active_filters.is_empty() {
            candidates.retain(|(_, bag)| {
                active_filters
                    .iter()
                    .all(|(key, wanted)| bag_matches_filter(bag, key, wanted))
            });
        }

        let visible_columns = repository::fetch_visible_columns(&self.db).await?;
        let filter_columns = repository::fetch_filter_columns(&self.db).await?;

        let filters = filter_columns
            .iter()
            .map(|column| FilterView {
                key: column.column_key.clone(),
                label: filter_display_label(column),
                options: collect_filter_options(&records, &column.column_key),
            })
            .collect();

        let total = candidates.len();
        let total_pages = if total == 0 {
            0
        } else {
            (total as i64 + page_size - 1) / page_size
        };

        let start = ((page - 1) * page_size) as usize;
        let courses = candidates
            .iter()
            .skip(start)
            .take(page_size as usize)
            .map(|(id, bag)| project_record(*id, bag, &visible_columns))
            .collect();

        Ok(SearchResponse {
            courses,
            columns: visible_columns
                .iter()
                .map(|column| ColumnView {
                    key: column.column_key.clone(),
                    label: column.display_name.clone(),
                })
                .collect(),
            filters,
            total,
            page,
            page_size,
            total_pages,
        })
    }

    /// Replace the whole course store and column registry from a parsed
    /// tabular dataset. The first row's key order is the authoritative column
    /// list; every imported column starts visible and non-filtered.
    pub async fn import(&self, rows: Vec<AttributeBag>) -> Result<ImportSummary, AppError> {
        if rows.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }

        let columns: Vec<String> = rows[0].keys().cloned().collect();
        repository::replace_dataset(&self.db, &columns, &rows).await?;

        info!(
            "imported {} courses with {} columns",
            rows.len(),
            columns.len()
        );
        Ok(ImportSummary {
            row_count: rows.len(),
            columns,
        })
    }

    pub async fn list_settings(&self) -> Result<Vec<ColumnSetting>, AppError> {
        Ok(repository::fetch_column_settings(&self.db).await?)
    }

    /// Apply a batch of partial registry updates inside one transaction:
    /// either every entry applies or none do. Unknown column keys are silent
    /// no-ops, matching the partial-update contract.
    pub async fn save_settings(
        &self,
        patches: Vec<ColumnSettingPatch>,
    ) -> Result<Vec<ColumnSetting>, AppError> {
        let mut tx = self.db.begin().await?;
        for patch in &patches {
            repository::update_column_setting(&mut *tx, &patch.column_key, &patch.update).await?;
        }
        tx.commit().await?;

        self.list_settings().await
    }
}

fn bag_matches_query(bag: &AttributeBag, needle: &str) -> bool {
    bag.values().any(|value| {
        attribute_text(value)
            .map(|text| text.to_lowercase().contains(needle))
            .unwrap_or(false)
    })
}

fn bag_matches_filter(bag: &AttributeBag, key: &str, wanted_lower: &str) -> bool {
    // A missing key or an empty value never matches a non-empty filter.
    bag.get(key)
        .and_then(attribute_text)
        .map(|text| !text.is_empty() && text.to_lowercase() == wanted_lower)
        .unwrap_or(false)
}

fn filter_display_label(column: &ColumnSetting) -> String {
    column
        .filter_label
        .clone()
        .unwrap_or_else(|| column.display_name.clone())
}

/// Distinct non-empty trimmed values of one column over the entire store,
/// lexicographically sorted. Dedup is case-sensitive; only matching folds case.
fn collect_filter_options(records: &[(i64, AttributeBag)], key: &str) -> Vec<String> {
    let mut options = BTreeSet::new();
    for (_, bag) in records {
        if let Some(text) = bag.get(key).and_then(attribute_text) {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                options.insert(trimmed.to_string());
            }
        }
    }
    options.into_iter().collect()
}

fn project_record(id: i64, bag: &AttributeBag, visible: &[ColumnSetting]) -> AttributeBag {
    let mut record = AttributeBag::new();
    record.insert("id".to_string(), Value::from(id));
    for column in visible {
        let value = bag
            .get(&column.column_key)
            .filter(|value| !value.is_null())
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()));
        record.insert(column.column_key.clone(), value);
    }
    record
}
