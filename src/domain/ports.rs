use crate::domain::model::{Record, RecordFilter, SchemaChange};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Operations a migration may perform inside an open transaction.
#[async_trait]
pub trait RecordStore: Send {
    async fn query(&mut self, table: &str, filter: &RecordFilter) -> Result<Vec<Record>>;

    /// Inserts every record or none. Rows without an `id` get the next free one.
    async fn bulk_insert(&mut self, table: &str, records: Vec<Record>) -> Result<usize>;

    /// Merges each record into the existing row whose `key` field matches.
    async fn update(&mut self, table: &str, key: &str, records: Vec<Record>) -> Result<usize>;

    async fn delete(&mut self, table: &str, filter: &RecordFilter) -> Result<usize>;

    async fn apply_schema(&mut self, change: &SchemaChange) -> Result<()>;

    async fn has_table(&mut self, table: &str) -> Result<bool>;
}

/// A unit of work. Dropping it without `commit` discards every change.
#[async_trait]
pub trait Transaction: RecordStore {
    async fn commit(&mut self) -> Result<()>;
}

#[async_trait]
pub trait TransactionalStore: Send + Sync {
    type Tx: Transaction + 'static;

    async fn begin(&self) -> Result<Self::Tx>;
}
