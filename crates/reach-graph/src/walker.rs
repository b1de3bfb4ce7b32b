//! Persistence by reachability.
//!
//! [`make_persistent`] takes a transient root and decides which objects
//! reachable from it must be created in the store, and in what order.
//!
//! The walk is depth-first. For each object it:
//!
//! 1. allocates the persistent identity through the sink *before* visiting
//!    anything the object refers to, so any back-edge met later in the same
//!    walk finds the object already persistent and stops there;
//! 2. walks every persisted association;
//! 3. submits the object's create command *after* its dependents.
//!
//! Steps 1 and 3 must stay separated by step 2. Merging them would loop
//! forever on cyclic graphs.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::adapter::{AdapterId, ObjectAdapter, ResolveState};
use crate::error::{PersistError, PersistResult};
use crate::graph::ObjectGraph;
use crate::sink::{CommandSink, CreateObjectCommand, ObjectReference};
use crate::spec::{AssociationKind, ObjectSpecification};

/// Why the walker left an object alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyPersistent,
    NotPersistable,
    /// Owned by another object or a collection container.
    Parented,
    Value,
    Service,
    /// Encodeable with no persisted associations.
    NothingToReach,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::AlreadyPersistent => "already persistent",
            SkipReason::NotPersistable => "type is not persistable",
            SkipReason::Parented => "owned by a parent",
            SkipReason::Value => "value type",
            SkipReason::Service => "domain service",
            SkipReason::NothingToReach => "encodeable leaf",
        };
        f.write_str(text)
    }
}

/// What a walk did.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistReport {
    /// Identities allocated, in allocation order.
    pub allocated: Vec<AdapterId>,
    /// Create commands submitted, in submission order.
    pub created: Vec<AdapterId>,
    /// Objects visited and left alone.
    pub skipped: usize,
}

/// Make `root` and everything transient reachable from it persistent.
///
/// If `root` is a collection, its elements are persisted. Otherwise `root`
/// must be neither persistent already nor of a non-persistable type; that
/// misuse is reported as [`PersistError::NotPersistable`]. Reachable objects
/// in either state are skipped silently.
pub fn make_persistent<S>(
    graph: &mut ObjectGraph,
    root: AdapterId,
    sink: &mut S,
) -> PersistResult<PersistReport>
where
    S: CommandSink + ?Sized,
{
    let mut walker = Walker {
        graph,
        sink,
        report: PersistReport::default(),
        depth: 0,
    };
    walker.make_persistent(root)?;
    debug!(
        allocated = walker.report.allocated.len(),
        created = walker.report.created.len(),
        skipped = walker.report.skipped,
        "persistence walk complete"
    );
    Ok(walker.report)
}

struct Walker<'a, S: ?Sized> {
    graph: &'a mut ObjectGraph,
    sink: &'a mut S,
    report: PersistReport,
    depth: usize,
}

impl<S: CommandSink + ?Sized> Walker<'_, S> {
    fn make_persistent(&mut self, id: AdapterId) -> PersistResult<()> {
        let adapter = self.graph.get(id)?;

        if adapter.specification().is_parented_or_free_collection() {
            self.mark_loaded(id)?;
            let elements = self.graph.collection_elements(id)?;
            trace!(collection = %id, elements = elements.len(), depth = self.depth, "walking collection");
            for element in elements {
                self.persist(element)?;
            }
            return Ok(());
        }

        if let Some(reason) = refusal(adapter) {
            return Err(PersistError::NotPersistable {
                oid: adapter.oid().to_string(),
                reason,
            });
        }
        self.persist(id)
    }

    fn persist(&mut self, id: AdapterId) -> PersistResult<()> {
        let adapter = self.graph.get(id)?;
        if let Some(reason) = skip_reason(adapter) {
            trace!(adapter = %id, oid = %adapter.oid(), %reason, "skipped");
            self.report.skipped += 1;
            return Ok(());
        }
        let spec = Arc::clone(adapter.specification());

        let oid = self.sink.remap_as_persistent(adapter)?;
        debug!(adapter = %id, oid = %oid, depth = self.depth, "allocated identity");
        self.graph.remap(id, oid)?;
        self.report.allocated.push(id);
        self.graph.change_state(id, ResolveState::Updating)?;

        self.depth += 1;
        for association in spec.associations().iter().filter(|a| a.is_persisted()) {
            let Some(target) = self.graph.association_target(id, association)? else {
                continue;
            };
            match association.kind() {
                AssociationKind::OneToMany => self.make_persistent(target)?,
                AssociationKind::OneToOne => self.persist(target)?,
            }
        }
        self.depth -= 1;

        let command = self.create_command(id, spec.as_ref())?;
        debug!(oid = %command.oid, references = command.references.len(), "create command");
        self.sink.add_create_object_command(command)?;
        self.report.created.push(id);
        self.graph.change_state(id, ResolveState::Resolved)?;
        Ok(())
    }

    /// Collections are containers; once walked they count as loaded.
    fn mark_loaded(&mut self, id: AdapterId) -> PersistResult<()> {
        let state = self.graph.get(id)?.resolve_state();
        if state == ResolveState::Ghost {
            self.graph.change_state(id, ResolveState::Resolving)?;
        }
        self.graph.change_state(id, ResolveState::Resolved)?;
        Ok(())
    }

    fn create_command(
        &self,
        id: AdapterId,
        spec: &dyn ObjectSpecification,
    ) -> PersistResult<CreateObjectCommand> {
        let adapter = self.graph.get(id)?;
        let Some(oid) = adapter.root_oid() else {
            return Err(PersistError::NotPersistable {
                oid: adapter.oid().to_string(),
                reason: SkipReason::Parented,
            });
        };
        let mut command = CreateObjectCommand::new(oid.clone());

        for association in spec.associations().iter().filter(|a| a.is_persisted()) {
            let Some(target) = self.graph.association_target(id, association)? else {
                continue;
            };
            let targets = match association.kind() {
                AssociationKind::OneToMany => self.graph.collection_elements(target)?,
                AssociationKind::OneToOne => vec![target],
            };
            for target in targets {
                // Targets the walk left transient have no stored identity.
                let target = self.graph.oid(target)?;
                if !target.is_persistent() {
                    continue;
                }
                command.references.push(ObjectReference {
                    association: association.name().to_string(),
                    target: target.clone(),
                });
            }
        }
        Ok(command)
    }
}

/// Why an explicit top-level persist of `adapter` is a programming error.
fn refusal(adapter: &ObjectAdapter) -> Option<SkipReason> {
    if adapter.is_persistent() {
        Some(SkipReason::AlreadyPersistent)
    } else if !adapter.specification().is_persistable() {
        Some(SkipReason::NotPersistable)
    } else {
        None
    }
}

/// Why a reachable `adapter` needs no work.
fn skip_reason(adapter: &ObjectAdapter) -> Option<SkipReason> {
    let spec = adapter.specification();
    if let Some(reason) = refusal(adapter) {
        return Some(reason);
    }
    if adapter.is_parented() || spec.is_parented_or_free_collection() {
        return Some(SkipReason::Parented);
    }
    if adapter.is_value() {
        return Some(SkipReason::Value);
    }
    if spec.is_service() {
        return Some(SkipReason::Service);
    }
    if !spec.has_persisted_associations() && spec.is_encodeable() {
        return Some(SkipReason::NothingToReach);
    }
    None
}
