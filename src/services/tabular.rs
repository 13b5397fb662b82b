use serde_json::Value;

use crate::error::AppError;
use crate::models::AttributeBag;

/// Parse an uploaded CSV document into attribute bags. The header row is the
/// column list; every cell is kept as a string, exactly as written.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<AttributeBag>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| AppError::BadRequest(format!("Failed to parse CSV header: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| AppError::BadRequest(format!("Failed to parse CSV: {e}")))?;
        let mut bag = AttributeBag::new();
        for (index, header) in headers.iter().enumerate() {
            let cell = record.get(index).unwrap_or("");
            bag.insert(header.to_string(), Value::String(cell.to_string()));
        }
        rows.push(bag);
    }
    Ok(rows)
}

/// Parse a JSON upload body of the form `{"rows": [{...}, ...]}`.
pub fn parse_json_rows(bytes: &[u8]) -> Result<Vec<AttributeBag>, AppError> {
    #[derive(serde::Deserialize)]
    struct JsonUpload {
        rows: Vec<AttributeBag>,
    }

    let upload: JsonUpload = serde_json::from_slice(bytes)
        .map_err(|e| AppError::BadRequest(format!("Failed to parse JSON rows: {e}")))?;
    Ok(upload.rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn csv_header_order_becomes_key_order() {
        let csv = "Program,Foreign Course Title,Department\n\
                   Aalto University,Linux Basics,Computer Science\n\
                   American College Dublin,Introduction to Marketing,Marketing\n";
        let rows = parse_csv(csv.as_bytes()).expect("Failed to parse CSV");
        assert_eq!(rows.len(), 2);

        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["Program", "Foreign Course Title", "Department"]);
        assert_eq!(rows[1]["Department"], json!("Marketing"));
    }

    #[test]
    fn short_csv_rows_pad_with_empty_cells() {
        let csv = "A,B,C\n1,2\n";
        let rows = parse_csv(csv.as_bytes()).expect("Failed to parse CSV");
        assert_eq!(rows[0]["C"], json!(""));
    }

    #[test]
    fn header_only_csv_yields_no_rows() {
        let rows = parse_csv(b"A,B,C\n").expect("Failed to parse CSV");
        assert!(rows.is_empty());
    }

    #[test]
    fn json_rows_keep_scalar_types() {
        let body = br#"{"rows":[{"Code":"CS 121","Credits":5}]}"#;
        let rows = parse_json_rows(body).expect("Failed to parse JSON rows");
        assert_eq!(rows[0]["Credits"], json!(5));
    }

    #[test]
    fn malformed_json_is_a_bad_request() {
        let err = parse_json_rows(b"not json").expect_err("Expected an error");
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
