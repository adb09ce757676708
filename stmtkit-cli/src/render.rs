//! Row rendering for the `query` command.

use serde_json::{Map, Number};
use stmtkit_db::Value;

/// Renders one value the way the `sqlite3` shell's list mode does: NULL is
/// empty, blobs are shown as `x'…'` literals.
pub(crate) fn plain(value: &Value) -> String {
    match value {
        Value::Integer(v) => v.to_string(),
        Value::Real(v) => v.to_string(),
        Value::Text(v) => v.clone(),
        Value::Blob(v) => format!("x'{}'", hex::encode(v)),
        Value::Null => String::new(),
    }
}

/// `|`-joined row.
pub(crate) fn plain_row(values: &[Value]) -> String {
    values.iter().map(plain).collect::<Vec<_>>().join("|")
}

fn json(value: &Value) -> serde_json::Value {
    match value {
        Value::Integer(v) => serde_json::Value::from(*v),
        Value::Real(v) => {
            Number::from_f64(*v).map_or(serde_json::Value::Null, serde_json::Value::Number)
        }
        Value::Text(v) => serde_json::Value::String(v.clone()),
        Value::Blob(v) => serde_json::Value::String(hex::encode(v)),
        Value::Null => serde_json::Value::Null,
    }
}

/// JSON object keyed by column name. Later duplicates win.
pub(crate) fn json_row(columns: &[String], values: &[Value]) -> serde_json::Value {
    let object: Map<String, serde_json::Value> = columns
        .iter()
        .cloned()
        .zip(values.iter().map(json))
        .collect();
    serde_json::Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_row() {
        let row = [
            Value::Integer(1),
            Value::Null,
            Value::Blob(vec![0xab]),
            Value::Text("x".to_string()),
        ];
        assert_eq!(plain_row(&row), "1||x'ab'|x");
    }

    #[test]
    fn test_json_row() {
        let columns = ["id".to_string(), "score".to_string(), "tag".to_string()];
        let row = [Value::Integer(7), Value::Real(0.5), Value::Null];
        assert_eq!(
            json_row(&columns, &row).to_string(),
            r#"{"id":7,"score":0.5,"tag":null}"#
        );
    }
}
