use crate::domain::model::Record;
use crate::utils::error::{MigrationError, Result};
use serde_json::Value;

/// Follows `path` through nested objects starting at `root`.
pub fn get_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |value, key| value.as_object()?.get(*key))
}

/// Reads `field` of `record`, then descends `path` inside it. A missing step is an error.
pub fn record_path(record: &Record, field: &str, path: &[&str]) -> Result<Value> {
    let root = record.get(field).ok_or_else(|| MigrationError::MissingField {
        path: field.to_string(),
    })?;

    get_path(root, path)
        .cloned()
        .ok_or_else(|| MigrationError::MissingField {
            path: std::iter::once(field)
                .chain(path.iter().copied())
                .collect::<Vec<_>>()
                .join("."),
        })
}

/// Builds a nested object from `(path, value)` pairs, creating intermediate objects.
pub fn build_nested(entries: Vec<(&[&str], Value)>) -> Value {
    let mut root = Value::Object(serde_json::Map::new());
    for (path, value) in entries {
        let Some((last, parents)) = path.split_last() else {
            continue;
        };
        let mut cursor = &mut root;
        for key in parents {
            if !cursor.get(*key).is_some_and(Value::is_object) {
                cursor[*key] = Value::Object(serde_json::Map::new());
            }
            cursor = &mut cursor[*key];
        }
        cursor[*last] = value;
    }
    root
}
