//! Persistence by reachability.
//!
//! Making one object persistent makes everything transient it refers to
//! persistent too. This crate holds the in-memory side of that: an arena of
//! object adapters, the metamodel view the walk consults, and the walk
//! itself.
//!
//! # Key Types
//!
//! - [`ObjectGraph`] -- arena of [`ObjectAdapter`]s addressed by [`AdapterId`]
//! - [`ObjectSpecification`] -- what the walk needs to know about a type;
//!   [`TypeSpec`] is the static implementation
//! - [`CommandSink`] -- allocates identities and receives
//!   [`CreateObjectCommand`]s
//! - [`make_persistent`] -- the walk
//!
//! # Ordering
//!
//! Identities are allocated on the way down and create commands are
//! submitted on the way up. For acyclic references a dependency's command
//! therefore always precedes its dependent's. Inside a cycle, the object
//! reached first is created last, and the others already hold its
//! identity.

pub mod adapter;
pub mod error;
pub mod graph;
pub mod sink;
pub mod spec;
pub mod walker;

pub use adapter::{AdapterId, ObjectAdapter, ResolveState};
pub use error::{
    GraphError, GraphResult, PersistError, PersistResult, SinkError, SinkResult,
};
pub use graph::ObjectGraph;
pub use sink::{CommandSink, CreateObjectCommand, ObjectReference};
pub use spec::{Association, AssociationKind, ObjectSpecification, SpecRegistry, TypeKind, TypeSpec};
pub use walker::{make_persistent, PersistReport, SkipReason};
