use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: serde_json::Value) -> Self {
        let data = match value {
            serde_json::Value::Object(obj) => obj.into_iter().collect(),
            _ => HashMap::new(),
        };
        Self { data }
    }

    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.data.get(field)
    }

    /// Missing keys and explicit JSON nulls both read as null.
    pub fn is_null(&self, field: &str) -> bool {
        self.data.get(field).map_or(true, serde_json::Value::is_null)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: serde_json::Value) {
        self.data.insert(field.into(), value);
    }

    /// Human readable identity used in logs and errors.
    pub fn identity(&self, field: &str) -> String {
        match self.data.get(field) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => format!("<no {}>", field),
            Some(other) => other.to_string(),
        }
    }
}

/// Row selection understood by every store.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordFilter {
    All,
    NotNull(String),
    Equals(String, serde_json::Value),
}

impl RecordFilter {
    pub fn not_null(field: impl Into<String>) -> Self {
        Self::NotNull(field.into())
    }

    pub fn equals(field: impl Into<String>, value: serde_json::Value) -> Self {
        Self::Equals(field.into(), value)
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::NotNull(field) => !record.is_null(field),
            Self::Equals(field, value) => record.get(field) == Some(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChange {
    RemoveField { table: String, field: String },
    AddField { table: String, field: String },
    DeleteTable { table: String, unique: Vec<String> },
    CreateTable { table: String, unique: Vec<String> },
}

impl SchemaChange {
    pub fn remove_field(table: &str, field: &str) -> Self {
        Self::RemoveField {
            table: table.to_string(),
            field: field.to_string(),
        }
    }

    /// `unique` names the constraints a rollback recreates the table with.
    pub fn delete_table(table: &str, unique: &[&str]) -> Self {
        Self::DeleteTable {
            table: table.to_string(),
            unique: unique.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// The change that undoes this one. Dropped data does not come back;
    /// re-added fields start out null.
    pub fn inverse(&self) -> SchemaChange {
        match self {
            Self::RemoveField { table, field } => Self::AddField {
                table: table.clone(),
                field: field.clone(),
            },
            Self::AddField { table, field } => Self::RemoveField {
                table: table.clone(),
                field: field.clone(),
            },
            Self::DeleteTable { table, unique } => Self::CreateTable {
                table: table.clone(),
                unique: unique.clone(),
            },
            Self::CreateTable { table, unique } => Self::DeleteTable {
                table: table.clone(),
                unique: unique.clone(),
            },
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Self::RemoveField { table, .. }
            | Self::AddField { table, .. }
            | Self::DeleteTable { table, .. }
            | Self::CreateTable { table, .. } => table,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Reverse => write!(f, "reverse"),
        }
    }
}

/// Outcome of one migration operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReport {
    pub step: String,
    pub direction: Direction,
    pub source: String,
    pub destination: String,
    pub records: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_not_null() {
        let submitted = Record::from_json(json!({"id": 1, "mme_submitted_data": {"patient": {}}}));
        let explicit_null = Record::from_json(json!({"id": 2, "mme_submitted_data": null}));
        let missing = Record::from_json(json!({"id": 3}));

        let filter = RecordFilter::not_null("mme_submitted_data");
        assert!(filter.matches(&submitted));
        assert!(!filter.matches(&explicit_null));
        assert!(!filter.matches(&missing));
    }

    #[test]
    fn test_filter_equals() {
        let record = Record::from_json(json!({"name": "0002"}));
        assert!(RecordFilter::equals("name", json!("0002")).matches(&record));
        assert!(!RecordFilter::equals("name", json!("0003")).matches(&record));
        assert!(RecordFilter::All.matches(&record));
    }

    #[test]
    fn test_schema_change_inverse() {
        let remove = SchemaChange::remove_field("seqr_individual", "mme_id");
        assert_eq!(
            remove.inverse(),
            SchemaChange::AddField {
                table: "seqr_individual".to_string(),
                field: "mme_id".to_string()
            }
        );
        assert_eq!(remove.inverse().inverse(), remove);
    }

    #[test]
    fn test_record_identity() {
        let record = Record::from_json(json!({"guid": "I0001", "id": 7}));
        assert_eq!(record.identity("guid"), "I0001");
        assert_eq!(record.identity("id"), "7");
        assert_eq!(record.identity("missing"), "<no missing>");
    }
}
