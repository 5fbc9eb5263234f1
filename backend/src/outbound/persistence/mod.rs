//! Persistence adapters for [`crate::domain::ports::ForumStore`].
//!
//! Two implementations share the same document semantics: a SQLite-backed
//! store holding one JSON document per row, and an in-memory store used by
//! unit tests and ephemeral deployments.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryForumStore;
pub use sqlite::SqliteForumStore;
