//! In-memory object store for persistence by reachability.
//!
//! [`InMemoryStore`] is the [`CommandSink`](reach_graph::CommandSink) a walk
//! writes into. It allocates persistent identifiers as the walk asks for
//! them, queues create commands in the order received, and turns them into
//! versioned [`StoredRecord`]s on commit.
//!
//! # Design Rules
//!
//! 1. Identifiers are never reused, even after a rollback.
//! 2. A key is created at most once.
//! 3. Commit is all-or-nothing.
//! 4. Lookups ignore identity state and version; [`InMemoryStore::touch`]
//!    checks the version when one is supplied.

pub mod config;
pub mod error;
pub mod memory;

pub use config::{IdentifierStrategy, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryStore, StoredRecord};
