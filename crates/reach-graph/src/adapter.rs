use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use reach_oid::{Oid, RootOid};

use crate::spec::ObjectSpecification;

/// Index of an adapter within its [`ObjectGraph`](crate::ObjectGraph).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdapterId(pub(crate) usize);

impl AdapterId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle marker of an in-memory adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveState {
    /// Created in memory, never stored.
    Transient,
    /// Known by identity only; state not loaded.
    Ghost,
    /// State being loaded.
    Resolving,
    /// State fully loaded or freshly persisted.
    Resolved,
    /// Being written to the store.
    Updating,
    /// Deleted from the store.
    Destroyed,
}

impl ResolveState {
    /// Returns `true` if the adapter may move from `self` to `next`.
    pub fn can_change_to(self, next: ResolveState) -> bool {
        use ResolveState::*;
        matches!(
            (self, next),
            (Transient, Updating | Resolved | Destroyed)
                | (Ghost, Resolving | Updating | Destroyed)
                | (Resolving, Resolved | Ghost)
                | (Resolved, Ghost | Updating | Destroyed)
                | (Updating, Resolved)
        )
    }

    pub fn is_resolved(self) -> bool {
        self == ResolveState::Resolved
    }
}

/// An in-memory object (or collection) together with its identity,
/// resolve-state and type.
///
/// Adapters live in an [`ObjectGraph`](crate::ObjectGraph) arena and refer
/// to each other by [`AdapterId`]. Only the graph mutates them.
#[derive(Clone)]
pub struct ObjectAdapter {
    pub(crate) id: AdapterId,
    pub(crate) oid: Oid,
    pub(crate) state: ResolveState,
    pub(crate) spec: Arc<dyn ObjectSpecification>,
    /// Adapter whose identity this one's identity is derived from.
    pub(crate) owner: Option<AdapterId>,
    /// Aggregated objects and parented collections derived from this one.
    pub(crate) owned: Vec<AdapterId>,
    /// Association name -> referenced object or collection adapter.
    pub(crate) slots: BTreeMap<String, AdapterId>,
    /// Elements, for collection adapters.
    pub(crate) elements: Vec<AdapterId>,
}

impl ObjectAdapter {
    pub fn id(&self) -> AdapterId {
        self.id
    }

    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    /// The identity if this adapter is a root.
    pub fn root_oid(&self) -> Option<&RootOid> {
        self.oid.as_root()
    }

    pub fn resolve_state(&self) -> ResolveState {
        self.state
    }

    pub fn specification(&self) -> &Arc<dyn ObjectSpecification> {
        &self.spec
    }

    pub fn is_value(&self) -> bool {
        self.spec.is_value()
    }

    pub fn is_persistent(&self) -> bool {
        self.oid.is_persistent()
    }

    pub fn is_transient(&self) -> bool {
        self.oid.is_transient()
    }

    /// Returns `true` if this adapter is owned by another and never
    /// persisted as an independent root.
    pub fn is_parented(&self) -> bool {
        self.oid.is_parented()
    }

    pub fn is_collection(&self) -> bool {
        self.spec.is_parented_or_free_collection()
    }

    pub fn owner(&self) -> Option<AdapterId> {
        self.owner
    }

    /// The adapter held in the named association slot, if set.
    pub fn slot(&self, association: &str) -> Option<AdapterId> {
        self.slots.get(association).copied()
    }

    pub fn elements(&self) -> &[AdapterId] {
        &self.elements
    }
}

impl fmt::Debug for ObjectAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectAdapter")
            .field("id", &self.id)
            .field("oid", &self.oid.to_string())
            .field("state", &self.state)
            .field("type", &self.spec.logical_type_name())
            .finish()
    }
}
