// Adapters layer: concrete stores behind the domain ports.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::{Database, MemoryStore, Table};
