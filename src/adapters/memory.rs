use crate::domain::model::{Record, RecordFilter, SchemaChange};
use crate::domain::ports::{RecordStore, Transaction, TransactionalStore};
use crate::utils::error::{MigrationError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

const PRIMARY_KEY: &str = "id";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Fields besides `id` whose non-null values must be distinct.
    #[serde(default)]
    pub unique: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Record>,
}

/// Every table of a store, keyed by name. Serializes as `{ "<table>": { "unique": [...], "rows": [...] } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Database {
    pub tables: BTreeMap<String, Table>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, unique: &[&str]) -> Self {
        self.tables.insert(
            name.to_string(),
            Table {
                unique: unique.iter().map(|f| f.to_string()).collect(),
                rows: Vec::new(),
            },
        );
        self
    }

    /// Seeds rows without constraint checks.
    pub fn with_rows(mut self, name: &str, rows: Vec<serde_json::Value>) -> Self {
        let table = self.tables.entry(name.to_string()).or_default();
        table.rows.extend(rows.into_iter().map(Record::from_json));
        self
    }

    pub fn rows(&self, name: &str) -> Option<&[Record]> {
        self.tables.get(name).map(|t| t.rows.as_slice())
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.tables.get(name).ok_or_else(|| MigrationError::TableNotFound {
            table: name.to_string(),
        })
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| MigrationError::TableNotFound {
                table: name.to_string(),
            })
    }

    pub fn query(&self, name: &str, filter: &RecordFilter) -> Result<Vec<Record>> {
        Ok(self
            .table(name)?
            .rows
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect())
    }

    pub fn bulk_insert(&mut self, name: &str, records: Vec<Record>) -> Result<usize> {
        let table = self.table_mut(name)?;

        let mut last_id = table
            .rows
            .iter()
            .filter_map(|row| row.get(PRIMARY_KEY).and_then(|v| v.as_i64()))
            .max()
            .unwrap_or(0);

        let mut prepared = Vec::with_capacity(records.len());
        for mut record in records {
            if record.is_null(PRIMARY_KEY) {
                last_id = last_id
                    .checked_add(1)
                    .ok_or_else(|| MigrationError::InvalidValue {
                        field: PRIMARY_KEY.to_string(),
                        reason: format!("{} has no id left after {}", name, last_id),
                    })?;
                record.insert(PRIMARY_KEY, serde_json::Value::from(last_id));
            }
            prepared.push(record);
        }

        let mut constrained = vec![PRIMARY_KEY.to_string()];
        constrained.extend(table.unique.iter().cloned());

        for field in &constrained {
            let mut seen: HashSet<String> = table
                .rows
                .iter()
                .filter(|row| !row.is_null(field))
                .filter_map(|row| row.get(field).map(|v| v.to_string()))
                .collect();

            for record in &prepared {
                if record.is_null(field) {
                    continue;
                }
                let value = record.get(field).map(|v| v.to_string()).unwrap_or_default();
                if !seen.insert(value.clone()) {
                    return Err(MigrationError::ConstraintViolation {
                        table: name.to_string(),
                        field: field.clone(),
                        value,
                    });
                }
            }
        }

        let inserted = prepared.len();
        table.rows.extend(prepared);
        Ok(inserted)
    }

    pub fn update(&mut self, name: &str, key: &str, records: Vec<Record>) -> Result<usize> {
        let table = self.table_mut(name)?;

        let mut targets = Vec::with_capacity(records.len());
        for record in &records {
            let key_value = match record.get(key) {
                Some(value) if !value.is_null() => value,
                _ => {
                    return Err(MigrationError::InvalidValue {
                        field: key.to_string(),
                        reason: format!("update of {} needs a non-null key", name),
                    })
                }
            };
            let index = table
                .rows
                .iter()
                .position(|row| row.get(key) == Some(key_value))
                .ok_or_else(|| MigrationError::RecordNotFound {
                    table: name.to_string(),
                    key: key.to_string(),
                    value: key_value.to_string(),
                })?;
            targets.push(index);
        }

        let updated = targets.len();
        for (index, record) in targets.into_iter().zip(records) {
            table.rows[index].data.extend(record.data);
        }
        Ok(updated)
    }

    pub fn delete(&mut self, name: &str, filter: &RecordFilter) -> Result<usize> {
        let table = self.table_mut(name)?;
        let before = table.rows.len();
        table.rows.retain(|row| !filter.matches(row));
        Ok(before - table.rows.len())
    }

    pub fn apply_schema(&mut self, change: &SchemaChange) -> Result<()> {
        match change {
            SchemaChange::RemoveField { table, field } => {
                let table = self.table_mut(table)?;
                for row in &mut table.rows {
                    row.data.remove(field);
                }
                table.unique.retain(|f| f != field);
            }
            SchemaChange::AddField { table, field } => {
                let table = self.table_mut(table)?;
                for row in &mut table.rows {
                    row.data
                        .entry(field.clone())
                        .or_insert(serde_json::Value::Null);
                }
            }
            SchemaChange::DeleteTable { table, .. } => {
                if self.tables.remove(table).is_none() {
                    return Err(MigrationError::TableNotFound {
                        table: table.clone(),
                    });
                }
            }
            SchemaChange::CreateTable { table, unique } => {
                if self.tables.contains_key(table) {
                    return Err(MigrationError::TableExists {
                        table: table.clone(),
                    });
                }
                self.tables.insert(
                    table.clone(),
                    Table {
                        unique: unique.clone(),
                        rows: Vec::new(),
                    },
                );
            }
        }
        Ok(())
    }
}

/// Works on a private copy of the database; `commit` publishes it.
pub struct MemoryTransaction {
    working: Database,
    origin: Arc<Mutex<Database>>,
}

#[async_trait]
impl RecordStore for MemoryTransaction {
    async fn query(&mut self, table: &str, filter: &RecordFilter) -> Result<Vec<Record>> {
        self.working.query(table, filter)
    }

    async fn bulk_insert(&mut self, table: &str, records: Vec<Record>) -> Result<usize> {
        self.working.bulk_insert(table, records)
    }

    async fn update(&mut self, table: &str, key: &str, records: Vec<Record>) -> Result<usize> {
        self.working.update(table, key, records)
    }

    async fn delete(&mut self, table: &str, filter: &RecordFilter) -> Result<usize> {
        self.working.delete(table, filter)
    }

    async fn apply_schema(&mut self, change: &SchemaChange) -> Result<()> {
        self.working.apply_schema(change)
    }

    async fn has_table(&mut self, table: &str) -> Result<bool> {
        Ok(self.working.tables.contains_key(table))
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(&mut self) -> Result<()> {
        let mut origin = self.origin.lock().await;
        *origin = self.working.clone();
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    db: Arc<Mutex<Database>>,
}

impl MemoryStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    pub async fn snapshot(&self) -> Database {
        self.db.lock().await.clone()
    }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx> {
        let working = self.db.lock().await.clone();
        Ok(MemoryTransaction {
            working,
            origin: Arc::clone(&self.db),
        })
    }
}
