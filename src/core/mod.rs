pub mod dedup;
pub mod mapping;
pub mod migration;
pub mod nested;
pub mod runner;
pub mod transfer;

pub use crate::domain::model::{Direction, Record, RecordFilter, SchemaChange, TransferReport};
pub use crate::domain::ports::{RecordStore, Transaction, TransactionalStore};
pub use crate::utils::error::Result;
