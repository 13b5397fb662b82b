use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

/// Ordered, schema-less mapping from column name to scalar value. Keys and
/// value types come entirely from the most recent import.
pub type AttributeBag = Map<String, Value>;

/// One imported spreadsheet row: an auto-assigned id plus the row itself,
/// serialized losslessly as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourseRow {
    pub id: i64,
    pub data: String,
}

impl CourseRow {
    /// Deserialize the stored attribute bag. Numbers stay numbers, strings
    /// stay strings, and key order survives the round trip.
    pub fn attributes(&self) -> Result<AttributeBag, serde_json::Error> {
        serde_json::from_str(&self.data)
    }
}

/// Text form of a scalar attribute value, used for search and filter
/// matching. Null has no text form and never matches anything.
pub fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
