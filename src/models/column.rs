use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// One column registry row: display and filter metadata for an attribute key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ColumnSetting {
    pub id: i64,
    pub column_key: String,
    pub display_name: String,
    pub visible: bool,
    pub is_filter: bool,
    pub filter_label: Option<String>,
    pub sort_order: i64,
}

/// Partial update for a registry row: only supplied fields change.
/// `filter_label` is doubly optional so an explicit null (clear the label)
/// is distinguishable from the field being absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnSettingUpdate {
    pub display_name: Option<String>,
    pub visible: Option<bool>,
    pub is_filter: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub filter_label: Option<Option<String>>,
}

impl ColumnSettingUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.visible.is_none()
            && self.is_filter.is_none()
            && self.filter_label.is_none()
    }
}

/// One entry of a settings save request: which column, and what to change.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSettingPatch {
    pub column_key: String,
    #[serde(flatten)]
    pub update: ColumnSettingUpdate,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
