use crate::core::transfer::{transfer, TransferPlan};
use crate::domain::model::{Direction, SchemaChange, TransferReport};
use crate::domain::ports::RecordStore;
use crate::utils::error::Result;

#[derive(Debug)]
pub enum Operation {
    /// A data copy with its own hand-written rollback.
    Transfer {
        name: String,
        forward: TransferPlan,
        reverse: TransferPlan,
    },
    Schema(SchemaChange),
}

impl Operation {
    pub fn name(&self) -> String {
        match self {
            Operation::Transfer { name, .. } => name.clone(),
            Operation::Schema(change) => describe_change(change),
        }
    }

    async fn run(&self, store: &mut dyn RecordStore, direction: Direction) -> Result<TransferReport> {
        match self {
            Operation::Transfer {
                name,
                forward,
                reverse,
            } => {
                let plan = match direction {
                    Direction::Forward => forward,
                    Direction::Reverse => reverse,
                };
                let records = transfer(store, plan).await?;
                Ok(TransferReport {
                    step: name.clone(),
                    direction,
                    source: plan.source.clone(),
                    destination: plan.destination.clone(),
                    records,
                })
            }
            Operation::Schema(change) => {
                let change = match direction {
                    Direction::Forward => change.clone(),
                    Direction::Reverse => change.inverse(),
                };
                tracing::debug!("{}", describe_change(&change));
                store.apply_schema(&change).await?;
                Ok(TransferReport {
                    step: describe_change(&change),
                    direction,
                    source: change.table().to_string(),
                    destination: change.table().to_string(),
                    records: 0,
                })
            }
        }
    }
}

fn describe_change(change: &SchemaChange) -> String {
    match change {
        SchemaChange::RemoveField { table, field } => format!("remove field {}.{}", table, field),
        SchemaChange::AddField { table, field } => format!("add field {}.{}", table, field),
        SchemaChange::DeleteTable { table, .. } => format!("delete table {}", table),
        SchemaChange::CreateTable { table, .. } => format!("create table {}", table),
    }
}

/// An ordered list of operations that can be applied and rolled back.
#[derive(Debug)]
pub struct Migration {
    pub name: String,
    pub operations: Vec<Operation>,
}

impl Migration {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            operations: Vec::new(),
        }
    }

    pub fn transfer(mut self, name: &str, forward: TransferPlan, reverse: TransferPlan) -> Self {
        self.operations.push(Operation::Transfer {
            name: name.to_string(),
            forward,
            reverse,
        });
        self
    }

    pub fn schema(mut self, change: SchemaChange) -> Self {
        self.operations.push(Operation::Schema(change));
        self
    }

    /// Runs every operation in order. Stops at the first error.
    pub async fn up(&self, store: &mut dyn RecordStore) -> Result<Vec<TransferReport>> {
        let mut reports = Vec::with_capacity(self.operations.len());
        for operation in &self.operations {
            reports.push(operation.run(store, Direction::Forward).await?);
        }
        Ok(reports)
    }

    /// Undoes the operations last to first, using each transfer's reverse plan.
    pub async fn down(&self, store: &mut dyn RecordStore) -> Result<Vec<TransferReport>> {
        let mut reports = Vec::with_capacity(self.operations.len());
        for operation in self.operations.iter().rev() {
            reports.push(operation.run(store, Direction::Reverse).await?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{Database, MemoryStore};
    use crate::core::mapping::FieldMapping;
    use crate::domain::model::RecordFilter;
    use crate::domain::ports::TransactionalStore;
    use serde_json::json;

    fn notes_migration() -> Migration {
        Migration::new("0001_move_notes")
            .transfer(
                "copy notes",
                TransferPlan::new("old_notes", "new_notes", FieldMapping::copy_all(&["guid", "text"])),
                TransferPlan::new("new_notes", "old_notes", FieldMapping::copy_all(&["guid", "text"]))
                    .purging_source(),
            )
            .schema(SchemaChange::delete_table("old_notes", &["guid"]))
    }

    #[tokio::test]
    async fn test_up_then_down() {
        let db = Database::new()
            .with_table("old_notes", &["guid"])
            .with_table("new_notes", &["guid"])
            .with_rows("old_notes", vec![json!({"id": 1, "guid": "N1", "text": "hello"})]);
        let store = MemoryStore::new(db);
        let mut tx = store.begin().await.unwrap();
        let migration = notes_migration();

        let reports = migration.up(&mut tx).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].records, 1);
        assert_eq!(reports[1].step, "delete table old_notes");
        assert!(!tx.has_table("old_notes").await.unwrap());

        let reports = migration.down(&mut tx).await.unwrap();
        assert_eq!(reports[0].step, "create table old_notes");
        assert_eq!(reports[1].direction, Direction::Reverse);

        let restored = tx.query("old_notes", &RecordFilter::All).await.unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].get("text"), Some(&json!("hello")));
        assert!(tx.query("new_notes", &RecordFilter::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_up_stops_at_first_failure() {
        let store = MemoryStore::new(Database::new().with_table("new_notes", &[]));
        let mut tx = store.begin().await.unwrap();

        let err = notes_migration().up(&mut tx).await.unwrap_err();
        assert!(matches!(
            err,
            crate::utils::error::MigrationError::TableNotFound { ref table } if table == "old_notes"
        ));
    }
}
