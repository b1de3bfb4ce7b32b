use serde::{Deserialize, Serialize};

use reach_oid::{Oid, RootOid};

use crate::adapter::ObjectAdapter;
use crate::error::SinkResult;

/// One persisted association value captured in a create command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReference {
    /// Name of the association on the created object.
    pub association: String,
    /// Identity of the referenced object (or collection element).
    pub target: Oid,
}

/// Instruction to insert one object into the backing store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateObjectCommand {
    /// The object's freshly allocated persistent identity.
    pub oid: RootOid,
    /// Persisted associations, one entry per referenced object, in
    /// declaration order. Targets reached through a cycle may not have been
    /// created yet when this command is submitted.
    pub references: Vec<ObjectReference>,
}

impl CreateObjectCommand {
    pub fn new(oid: RootOid) -> Self {
        Self {
            oid,
            references: Vec::new(),
        }
    }

    /// Logical type name of the object to create.
    pub fn object_type(&self) -> &str {
        self.oid.object_type()
    }

    /// Identities referenced through `association`.
    pub fn targets<'a>(&'a self, association: &'a str) -> impl Iterator<Item = &'a Oid> + 'a {
        self.references
            .iter()
            .filter(move |r| r.association == association)
            .map(|r| &r.target)
    }
}

/// Receiver of the walker's output.
///
/// Implementations allocate persistent identities and queue create commands
/// for later execution. Commands must be executed in the order submitted.
/// Errors are propagated to the caller of the walk unchanged; commands
/// already accepted are left to the sink's own transaction to discard.
pub trait CommandSink {
    /// Allocate the persistent identity for a transient root adapter.
    ///
    /// Called at most once per adapter per walk.
    fn remap_as_persistent(&mut self, adapter: &ObjectAdapter) -> SinkResult<RootOid>;

    /// Queue the insert of an object whose identity is already allocated.
    fn add_create_object_command(&mut self, command: CreateObjectCommand) -> SinkResult<()>;
}

impl<S: CommandSink + ?Sized> CommandSink for &mut S {
    fn remap_as_persistent(&mut self, adapter: &ObjectAdapter) -> SinkResult<RootOid> {
        (**self).remap_as_persistent(adapter)
    }

    fn add_create_object_command(&mut self, command: CreateObjectCommand) -> SinkResult<()> {
        (**self).add_create_object_command(command)
    }
}
