//! Row materializer - source row to row document / 行物化
//!
//! Pure conversion, no I/O. Returns `None` for rows that cannot be identified.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::schema::{CreatedAt, FieldMap, FieldValue, RowDocument};
use super::temporal::{canonical_string, epoch_millis, format_temporal};
use crate::source::{SourceRow, SourceValue};

/// Column whose value becomes the row's creation timestamp (case-insensitive)
pub const CREATED_AT_COLUMN: &str = "created_at";

/// Separator between primary-key components in a row id
pub const ID_SEPARATOR: &str = ":";

/// Normalize a source value into a field value / 规范化列值
pub fn normalize(value: &SourceValue) -> FieldValue {
    match value {
        SourceValue::Null => FieldValue::Null,
        SourceValue::Bool(b) => FieldValue::Bool(*b),
        SourceValue::Int(i) => FieldValue::Int(*i),
        SourceValue::Float(f) => FieldValue::Float(*f),
        SourceValue::Decimal(d) => FieldValue::Text(d.clone()),
        SourceValue::Text(s) => FieldValue::Text(s.clone()),
        SourceValue::Bytes(bytes) => FieldValue::Text(BASE64.encode(bytes)),
        SourceValue::Temporal(t) => FieldValue::Text(format_temporal(t)),
    }
}

pub fn is_created_at(column: &str) -> bool {
    column.eq_ignore_ascii_case(CREATED_AT_COLUMN)
}

/// Row id from the primary-key values in key order / 由主键值生成行ID
///
/// `None` when any key column is missing or null.
pub fn build_id(row: &SourceRow, primary_keys: &[String]) -> Option<String> {
    let mut parts = Vec::with_capacity(primary_keys.len());
    for key in primary_keys {
        parts.push(canonical_string(row.get(key)?)?);
    }
    Some(parts.join(ID_SEPARATOR))
}

/// Build the row document for one scanned row / 构建行文档
///
/// `columns` gives the field order; columns present in the row but not listed
/// are appended in row order.
pub fn materialize(
    table: &str,
    columns: &[String],
    row: &SourceRow,
    primary_keys: &[String],
) -> Option<RowDocument> {
    if primary_keys.is_empty() {
        return None;
    }
    let id = build_id(row, primary_keys)?;

    let mut ordered: Vec<&str> = columns
        .iter()
        .map(String::as_str)
        .filter(|c| row.get(c).is_some())
        .collect();
    for name in row.columns() {
        if !ordered.iter().any(|c| c.eq_ignore_ascii_case(name)) {
            ordered.push(name);
        }
    }

    let mut fields = FieldMap::with_capacity(ordered.len());
    let mut content = Vec::with_capacity(ordered.len());
    let mut created_at = None;

    for column in ordered {
        let value = row.get(column).unwrap_or(&SourceValue::Null);
        let normalized = normalize(value);
        if let Some(text) = normalized.as_content() {
            content.push(text);
        }
        if is_created_at(column) && created_at.is_none() {
            created_at = created_at_of(value);
        }
        fields.push(column, normalized);
    }

    Some(RowDocument {
        table: table.to_string(),
        id,
        fields,
        content: content.join(" "),
        created_at,
    })
}

fn created_at_of(value: &SourceValue) -> Option<CreatedAt> {
    let raw = canonical_string(value)?;
    let epoch_ms = epoch_millis(value)?;
    Some(CreatedAt { raw, epoch_ms })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Temporal;
    use chrono::NaiveDate;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_materialize_basic_row() {
        let row = SourceRow::new()
            .with("id", 7i64)
            .with("name", "a")
            .with("created_at", "2024-01-01T00:00:00Z")
            .with("note", SourceValue::Null);
        let columns = keys(&["id", "name", "created_at", "note"]);

        let doc = materialize("users", &columns, &row, &keys(&["id"])).unwrap();
        assert_eq!(doc.table, "users");
        assert_eq!(doc.id, "7");
        assert_eq!(doc.content, "7 a 2024-01-01T00:00:00Z");
        assert_eq!(doc.fields.get("note"), Some(&FieldValue::Null));
        let created = doc.created_at.unwrap();
        assert_eq!(created.raw, "2024-01-01T00:00:00Z");
        assert_eq!(created.epoch_ms, 1_704_067_200_000);
    }

    #[test]
    fn test_composite_key_is_colon_joined() {
        let row = SourceRow::new()
            .with("order_id", 10i64)
            .with("line", 2i64)
            .with("sku", "X-1");
        let doc = materialize("lines", &[], &row, &keys(&["order_id", "line"])).unwrap();
        assert_eq!(doc.id, "10:2");
    }

    #[test]
    fn test_null_or_missing_key_is_unmaterializable() {
        let row = SourceRow::new().with("id", SourceValue::Null).with("name", "x");
        assert!(materialize("t", &[], &row, &keys(&["id"])).is_none());

        let row = SourceRow::new().with("name", "x");
        assert!(materialize("t", &[], &row, &keys(&["id"])).is_none());

        assert!(materialize("t", &[], &row, &[]).is_none());
    }

    #[test]
    fn test_unparsable_created_at_keeps_document() {
        let row = SourceRow::new().with("id", 1i64).with("CREATED_AT", "someday");
        let doc = materialize("t", &[], &row, &keys(&["id"])).unwrap();
        assert!(doc.created_at.is_none());
        assert_eq!(
            doc.fields.get("CREATED_AT"),
            Some(&FieldValue::Text("someday".to_string()))
        );
    }

    #[test]
    fn test_temporal_and_binary_values_normalize_to_text() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let row = SourceRow::new()
            .with("id", 1i64)
            .with("created_at", Temporal::Date(day))
            .with("blob", SourceValue::Bytes(b"hi".to_vec()))
            .with("price", SourceValue::Decimal("9.90".to_string()));
        let doc = materialize("t", &[], &row, &keys(&["id"])).unwrap();

        assert_eq!(doc.fields.get("created_at"), Some(&FieldValue::from("2024-03-01")));
        assert_eq!(doc.fields.get("blob"), Some(&FieldValue::from("aGk=")));
        assert_eq!(doc.fields.get("price"), Some(&FieldValue::from("9.90")));
        assert_eq!(doc.created_at.unwrap().raw, "2024-03-01");
    }

    #[test]
    fn test_column_list_decides_field_order() {
        let row = SourceRow::new().with("b", 2i64).with("id", 1i64).with("extra", "e");
        let doc = materialize("t", &keys(&["id", "b"]), &row, &keys(&["id"])).unwrap();
        let names: Vec<&str> = doc.fields.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["id", "b", "extra"]);
    }
}
