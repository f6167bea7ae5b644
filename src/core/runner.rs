use crate::core::migration::Migration;
use crate::domain::model::{Direction, Record, RecordFilter, SchemaChange, TransferReport};
use crate::domain::ports::{RecordStore, Transaction, TransactionalStore};
use crate::utils::error::{MigrationError, Result};
use serde_json::json;
use std::time::Instant;

/// Bookkeeping table with one row per applied migration.
pub const MIGRATIONS_TABLE: &str = "schema_migrations";

pub struct MigrationRunner<S: TransactionalStore> {
    store: S,
}

impl<S: TransactionalStore> MigrationRunner<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn status(&self, migration: &Migration) -> Result<bool> {
        let mut tx = self.store.begin().await?;
        is_applied(&mut tx, &migration.name).await
    }

    pub async fn apply(&self, migration: &Migration) -> Result<Vec<TransferReport>> {
        self.execute(migration, Direction::Forward, true).await
    }

    pub async fn revert(&self, migration: &Migration) -> Result<Vec<TransferReport>> {
        self.execute(migration, Direction::Reverse, true).await
    }

    /// Runs the migration in one direction and throws the transaction away.
    pub async fn dry_run(
        &self,
        migration: &Migration,
        direction: Direction,
    ) -> Result<Vec<TransferReport>> {
        self.execute(migration, direction, false).await
    }

    async fn execute(
        &self,
        migration: &Migration,
        direction: Direction,
        commit: bool,
    ) -> Result<Vec<TransferReport>> {
        let started = Instant::now();
        tracing::info!("Running {} ({})", migration.name, direction);

        let mut tx = self.store.begin().await?;
        let applied = is_applied(&mut tx, &migration.name).await?;

        let reports = match direction {
            Direction::Forward => {
                if applied {
                    return Err(MigrationError::AlreadyApplied {
                        name: migration.name.clone(),
                    });
                }
                let reports = migration.up(&mut tx).await?;
                record_applied(&mut tx, &migration.name).await?;
                reports
            }
            Direction::Reverse => {
                if !applied {
                    return Err(MigrationError::NotApplied {
                        name: migration.name.clone(),
                    });
                }
                let reports = migration.down(&mut tx).await?;
                tx.delete(
                    MIGRATIONS_TABLE,
                    &RecordFilter::equals("name", json!(migration.name)),
                )
                .await?;
                reports
            }
        };

        for report in &reports {
            tracing::debug!(
                "{} [{}]: {} -> {} ({} records)",
                report.step,
                report.direction,
                report.source,
                report.destination,
                report.records
            );
        }

        if commit {
            tx.commit().await?;
            tracing::info!(
                "{} {} in {:?}",
                migration.name,
                match direction {
                    Direction::Forward => "applied",
                    Direction::Reverse => "reverted",
                },
                started.elapsed()
            );
        } else {
            tracing::info!("Dry run of {} finished, changes discarded", migration.name);
        }

        Ok(reports)
    }
}

async fn is_applied(store: &mut dyn RecordStore, name: &str) -> Result<bool> {
    if !store.has_table(MIGRATIONS_TABLE).await? {
        return Ok(false);
    }
    let rows = store
        .query(MIGRATIONS_TABLE, &RecordFilter::equals("name", json!(name)))
        .await?;
    Ok(!rows.is_empty())
}

async fn record_applied(store: &mut dyn RecordStore, name: &str) -> Result<()> {
    if !store.has_table(MIGRATIONS_TABLE).await? {
        store
            .apply_schema(&SchemaChange::CreateTable {
                table: MIGRATIONS_TABLE.to_string(),
                unique: vec!["name".to_string()],
            })
            .await?;
    }
    let row = Record::from_json(json!({
        "name": name,
        "applied_at": chrono::Utc::now().to_rfc3339(),
    }));
    store.bulk_insert(MIGRATIONS_TABLE, vec![row]).await?;
    Ok(())
}
