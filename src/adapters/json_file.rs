use crate::adapters::memory::Database;
use crate::domain::model::{Record, RecordFilter, SchemaChange};
use crate::domain::ports::{RecordStore, Transaction, TransactionalStore};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A store backed by one JSON snapshot file holding every table.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Database> {
        let bytes = tokio::fs::read(&self.path).await?;
        let db = serde_json::from_slice(&bytes)?;
        Ok(db)
    }

    pub async fn save(&self, db: &Database) -> Result<()> {
        let data = serde_json::to_vec_pretty(db)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Write next to the target and rename so a crash never leaves half a snapshot.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

pub struct JsonFileTransaction {
    working: Database,
    store: JsonFileStore,
}

#[async_trait]
impl RecordStore for JsonFileTransaction {
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
impl Transaction for JsonFileTransaction {
    async fn commit(&mut self) -> Result<()> {
        tracing::debug!("Writing snapshot to {}", self.store.path.display());
        self.store.save(&self.working).await
    }
}

#[async_trait]
impl TransactionalStore for JsonFileStore {
    type Tx = JsonFileTransaction;

    async fn begin(&self) -> Result<Self::Tx> {
        let working = self.load().await?;
        Ok(JsonFileTransaction {
            working,
            store: self.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::MigrationError;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_commit_persists_and_drop_discards() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("seqr.json"));
        store
            .save(&Database::new().with_table("notes", &["guid"]))
            .await
            .unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.bulk_insert("notes", vec![Record::from_json(json!({"guid": "N1"}))])
                .await
                .unwrap();
        }
        assert!(store.load().await.unwrap().rows("notes").unwrap().is_empty());

        let mut tx = store.begin().await.unwrap();
        tx.bulk_insert("notes", vec![Record::from_json(json!({"guid": "N1"}))])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let db = store.load().await.unwrap();
        assert_eq!(db.rows("notes").unwrap()[0].get("guid"), Some(&json!("N1")));
        assert_eq!(db.rows("notes").unwrap()[0].get("id"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_snapshot_file_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        tokio::fs::write(
            &path,
            r#"{"seqr_individual": {"rows": [{"id": 1, "guid": "I0001"}]}}"#,
        )
        .await
        .unwrap();

        let db = JsonFileStore::new(&path).load().await.unwrap();
        assert!(db.tables["seqr_individual"].unique.is_empty());
        assert_eq!(db.rows("seqr_individual").unwrap()[0].identity("guid"), "I0001");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.begin().await, Err(MigrationError::IoError(_))));
    }
}
