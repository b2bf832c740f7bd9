//! Document entities and the domain label set

mod entity;

pub use entity::{DocumentDomain, DocumentRecord, FetchedDocument, NewDocument, StoredChunk};
