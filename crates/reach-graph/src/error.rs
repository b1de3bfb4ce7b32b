//! Error types for the object graph and the reachability walker.

use reach_oid::OidError;

use crate::adapter::{AdapterId, ResolveState};
use crate::spec::AssociationKind;
use crate::walker::SkipReason;

/// Errors from misuse of the [`ObjectGraph`](crate::ObjectGraph) arena.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The id does not name an adapter of this graph.
    #[error("adapter not found: {0}")]
    AdapterNotFound(AdapterId),

    /// The requested resolve-state change is not allowed.
    #[error("invalid resolve-state transition for {oid}: {from:?} -> {to:?}")]
    InvalidTransition {
        oid: String,
        from: ResolveState,
        to: ResolveState,
    },

    /// The adapter cannot own aggregated objects or collections.
    #[error("{oid} cannot own {what}")]
    InvalidOwner { oid: String, what: &'static str },

    /// The adapter is not a collection.
    #[error("{oid} is not a collection")]
    NotACollection { oid: String },

    /// The adapter's type does not declare the association.
    #[error("{oid} has no association named {name:?}")]
    UnknownAssociation { oid: String, name: String },

    /// The association exists but holds the other kind of target.
    #[error("association {name:?} of {oid} is not {expected:?}")]
    WrongAssociationKind {
        oid: String,
        name: String,
        expected: AssociationKind,
    },

    /// The identity does not fit the operation, e.g. a transient oid for a
    /// loaded object or a remap of a parented adapter.
    #[error("unexpected identity {oid}: {reason}")]
    UnexpectedOid { oid: String, reason: String },

    /// An identity could not be built from the adapter's components.
    #[error(transparent)]
    Oid(#[from] OidError),
}

/// Errors raised by a [`CommandSink`](crate::CommandSink).
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The sink could not allocate a persistent identity.
    #[error("identity allocation failed for {oid}: {reason}")]
    Allocation { oid: String, reason: String },

    /// The sink refused a create command.
    #[error("create command for {oid} rejected: {reason}")]
    Rejected { oid: String, reason: String },
}

/// Errors from [`make_persistent`](crate::make_persistent).
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Top-level persist requested on an object that must never be
    /// persisted directly.
    #[error("cannot make {oid} persistent: {reason}")]
    NotPersistable { oid: String, reason: SkipReason },

    /// Propagated unchanged from the sink.
    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;

/// Convenience alias for sink results.
pub type SinkResult<T> = Result<T, SinkError>;

/// Convenience alias for walker results.
pub type PersistResult<T> = Result<T, PersistError>;
