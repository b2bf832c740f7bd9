//! Vector store implementations

mod in_memory;
mod migrations;
mod pgvector;

pub use in_memory::InMemoryVectorStore;
pub use migrations::{run_storage_migrations, storage_migrations, Migration, PostgresMigrator};
pub use pgvector::{PgvectorConfig, PgvectorStore};
