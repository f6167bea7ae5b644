pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod matchmaker;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::MigrateConfig;

pub use adapters::{Database, JsonFileStore, MemoryStore};
pub use core::{
    dedup::DuplicatePolicy,
    mapping::FieldMapping,
    migration::Migration,
    runner::MigrationRunner,
    transfer::{transfer, TransferPlan},
};
pub use utils::error::{MigrationError, Result};
