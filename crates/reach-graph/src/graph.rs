//! Arena of object adapters.
//!
//! [`ObjectGraph`] owns every adapter of one unit of work and hands out
//! [`AdapterId`]s. References between objects are ids, so cyclic object
//! graphs need no shared ownership and resolve-state can be mutated in place
//! without aliasing.
//!
//! # Invariants
//!
//! - Every id stored in a slot, element list or owner link resolves.
//! - Aggregated and parented-collection identities are derived from their
//!   owner's identity and follow it through [`ObjectGraph::remap`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use reach_oid::{AggregatedOid, CollectionOid, ObjectKey, Oid, ParentOid, RootOid};

use crate::adapter::{AdapterId, ObjectAdapter, ResolveState};
use crate::error::{GraphError, GraphResult};
use crate::spec::{Association, AssociationKind, ObjectSpecification};

/// The in-memory object graph a walk operates on.
#[derive(Debug, Default)]
pub struct ObjectGraph {
    adapters: Vec<ObjectAdapter>,
    next_transient: u64,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of adapters, collections included.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectAdapter> {
        self.adapters.iter()
    }

    // ---------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------

    /// Wrap a new, never-stored object. It receives a transient identity.
    pub fn add_transient(&mut self, spec: Arc<dyn ObjectSpecification>) -> GraphResult<AdapterId> {
        self.next_transient += 1;
        let oid = RootOid::transient(spec.logical_type_name(), self.next_transient.to_string())?;
        Ok(self.push(oid.into(), ResolveState::Transient, spec, None))
    }

    /// Wrap an object loaded from the store under its persistent identity.
    pub fn add_loaded(
        &mut self,
        spec: Arc<dyn ObjectSpecification>,
        oid: RootOid,
    ) -> GraphResult<AdapterId> {
        if oid.is_transient() {
            return Err(GraphError::UnexpectedOid {
                oid: oid.to_string(),
                reason: "loaded objects must have a persistent identity".into(),
            });
        }
        Ok(self.push(oid.into(), ResolveState::Resolved, spec, None))
    }

    /// Wrap an object owned by `owner` under an aggregated identity.
    pub fn add_aggregated(
        &mut self,
        owner: AdapterId,
        spec: Arc<dyn ObjectSpecification>,
        local_id: &str,
    ) -> GraphResult<AdapterId> {
        let (parent, state) = self.owner_parts(owner, "aggregated objects")?;
        let oid = AggregatedOid::new(spec.logical_type_name(), parent, local_id)?;
        let id = self.push(oid.into(), state, spec, Some(owner));
        self.get_mut(owner)?.owned.push(id);
        Ok(id)
    }

    /// Create the collection held by `owner` under the one-to-many
    /// `association` and store it in the owner's slot.
    pub fn add_collection(
        &mut self,
        owner: AdapterId,
        association: &str,
        spec: Arc<dyn ObjectSpecification>,
    ) -> GraphResult<AdapterId> {
        self.declared_association(owner, association, AssociationKind::OneToMany)?;
        let (parent, state) = self.owner_parts(owner, "collections")?;
        let oid = CollectionOid::new(parent, association)?;
        let id = self.push(oid.into(), state, spec, Some(owner));
        let owner_adapter = self.get_mut(owner)?;
        owner_adapter.owned.push(id);
        owner_adapter.slots.insert(association.to_string(), id);
        Ok(id)
    }

    /// Create a collection that belongs to no object.
    pub fn add_free_collection(
        &mut self,
        spec: Arc<dyn ObjectSpecification>,
    ) -> GraphResult<AdapterId> {
        self.add_transient(spec)
    }

    /// Point `owner`'s one-to-one `association` at `target`, or clear it.
    ///
    /// One-to-many slots hold collections and are filled by
    /// [`ObjectGraph::add_collection`] only.
    pub fn set_reference(
        &mut self,
        owner: AdapterId,
        association: &str,
        target: Option<AdapterId>,
    ) -> GraphResult<()> {
        self.declared_association(owner, association, AssociationKind::OneToOne)?;
        if let Some(target) = target {
            self.get(target)?;
        }
        let adapter = self.get_mut(owner)?;
        match target {
            Some(target) => {
                adapter.slots.insert(association.to_string(), target);
            }
            None => {
                adapter.slots.remove(association);
            }
        }
        Ok(())
    }

    /// Append `element` to a collection adapter.
    pub fn push_element(&mut self, collection: AdapterId, element: AdapterId) -> GraphResult<()> {
        self.get(element)?;
        let adapter = self.get_mut(collection)?;
        if !adapter.is_collection() {
            return Err(GraphError::NotACollection {
                oid: adapter.oid.to_string(),
            });
        }
        adapter.elements.push(element);
        Ok(())
    }

    fn push(
        &mut self,
        oid: Oid,
        state: ResolveState,
        spec: Arc<dyn ObjectSpecification>,
        owner: Option<AdapterId>,
    ) -> AdapterId {
        let id = AdapterId(self.adapters.len());
        debug!(adapter = %id, oid = %oid, "added adapter");
        self.adapters.push(ObjectAdapter {
            id,
            oid,
            state,
            spec,
            owner,
            owned: Vec::new(),
            slots: BTreeMap::new(),
            elements: Vec::new(),
        });
        id
    }

    fn owner_parts(
        &self,
        owner: AdapterId,
        what: &'static str,
    ) -> GraphResult<(ParentOid, ResolveState)> {
        let adapter = self.get(owner)?;
        if adapter.is_collection() {
            return Err(GraphError::InvalidOwner {
                oid: adapter.oid.to_string(),
                what,
            });
        }
        let parent = ParentOid::try_from(adapter.oid.clone()).map_err(|_| {
            GraphError::InvalidOwner {
                oid: adapter.oid.to_string(),
                what,
            }
        })?;
        let state = if adapter.is_transient() {
            ResolveState::Transient
        } else {
            ResolveState::Resolved
        };
        Ok((parent, state))
    }

    fn declared_association(
        &self,
        owner: AdapterId,
        name: &str,
        expected: AssociationKind,
    ) -> GraphResult<()> {
        let adapter = self.get(owner)?;
        let Some(association) = adapter.spec.association(name) else {
            return Err(GraphError::UnknownAssociation {
                oid: adapter.oid.to_string(),
                name: name.to_string(),
            });
        };
        if association.kind() != expected {
            return Err(GraphError::WrongAssociationKind {
                oid: adapter.oid.to_string(),
                name: name.to_string(),
                expected,
            });
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn get(&self, id: AdapterId) -> GraphResult<&ObjectAdapter> {
        self.adapters
            .get(id.0)
            .ok_or(GraphError::AdapterNotFound(id))
    }

    fn get_mut(&mut self, id: AdapterId) -> GraphResult<&mut ObjectAdapter> {
        self.adapters
            .get_mut(id.0)
            .ok_or(GraphError::AdapterNotFound(id))
    }

    pub fn oid(&self, id: AdapterId) -> GraphResult<&Oid> {
        Ok(&self.get(id)?.oid)
    }

    /// The adapter reached from `id` through `association`, if any.
    pub fn association_target(
        &self,
        id: AdapterId,
        association: &Association,
    ) -> GraphResult<Option<AdapterId>> {
        Ok(self.get(id)?.slot(association.name()))
    }

    /// Elements currently held by a collection adapter.
    pub fn collection_elements(&self, id: AdapterId) -> GraphResult<Vec<AdapterId>> {
        let adapter = self.get(id)?;
        if !adapter.is_collection() {
            return Err(GraphError::NotACollection {
                oid: adapter.oid.to_string(),
            });
        }
        Ok(adapter.elements.clone())
    }

    /// Find a root adapter by key, whatever its state or version.
    pub fn find(&self, key: &ObjectKey) -> Option<AdapterId> {
        self.adapters
            .iter()
            .find(|a| a.root_oid().is_some_and(|root| &root.key() == key))
            .map(ObjectAdapter::id)
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Move an adapter to a new resolve-state. Re-entering the current
    /// state is a no-op.
    pub fn change_state(&mut self, id: AdapterId, next: ResolveState) -> GraphResult<()> {
        let adapter = self.get_mut(id)?;
        if adapter.state == next {
            return Ok(());
        }
        if !adapter.state.can_change_to(next) {
            return Err(GraphError::InvalidTransition {
                oid: adapter.oid.to_string(),
                from: adapter.state,
                to: next,
            });
        }
        adapter.state = next;
        Ok(())
    }

    /// Replace a root adapter's identity and re-derive the identities of
    /// everything it owns.
    ///
    /// Once the new identity is persistent, owned adapters still marked
    /// transient become resolved, as if added under a persistent owner.
    pub fn remap(&mut self, id: AdapterId, oid: RootOid) -> GraphResult<()> {
        let adapter = self.get_mut(id)?;
        if adapter.oid.is_parented() {
            return Err(GraphError::UnexpectedOid {
                oid: adapter.oid.to_string(),
                reason: "only root identities can be remapped".into(),
            });
        }
        debug!(adapter = %id, from = %adapter.oid, to = %oid, "remapped adapter");
        adapter.oid = oid.into();
        self.reparent_owned(id)
    }

    fn reparent_owned(&mut self, id: AdapterId) -> GraphResult<()> {
        let adapter = self.get(id)?;
        let owned = adapter.owned.clone();
        let parent = ParentOid::try_from(adapter.oid.clone())?;
        let persistent = parent.root().is_persistent();

        for child in owned {
            let child_adapter = self.get_mut(child)?;
            child_adapter.oid = match &child_adapter.oid {
                Oid::Aggregated(agg) => agg.with_parent(parent.clone()).into(),
                Oid::Collection(coll) => coll.with_parent(parent.clone()).into(),
                Oid::Root(_) => continue,
            };
            if persistent && child_adapter.state == ResolveState::Transient {
                child_adapter.state = ResolveState::Resolved;
            }
            self.reparent_owned(child)?;
        }
        Ok(())
    }
}
