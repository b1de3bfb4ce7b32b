//! The metamodel view consumed by the walker.
//!
//! The walker never reflects over objects itself. It asks an
//! [`ObjectSpecification`] whether a type is persistable, what kind of type
//! it is, and which associations lead to other objects. [`TypeSpec`] is a
//! static implementation for metamodels declared in code or loaded from a
//! description file.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Cardinality of an association.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// A reference to at most one other object.
    OneToOne,
    /// A collection of other objects.
    OneToMany,
}

/// A named association from one type to others.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    name: String,
    kind: AssociationKind,
    #[serde(default = "default_true")]
    persisted: bool,
}

impl Association {
    pub fn new(name: impl Into<String>, kind: AssociationKind, persisted: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            persisted,
        }
    }

    /// A persisted one-to-one reference.
    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(name, AssociationKind::OneToOne, true)
    }

    /// A persisted one-to-many collection.
    pub fn collection(name: impl Into<String>) -> Self {
        Self::new(name, AssociationKind::OneToMany, true)
    }

    /// The same association, explicitly excluded from persistence.
    pub fn not_persisted(mut self) -> Self {
        self.persisted = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AssociationKind {
        self.kind
    }

    pub fn is_one_to_many(&self) -> bool {
        self.kind == AssociationKind::OneToMany
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }
}

/// What the walker needs to know about an object's type.
pub trait ObjectSpecification: fmt::Debug + Send + Sync {
    /// Short or fully-qualified type tag used in identities.
    fn logical_type_name(&self) -> &str;

    /// `false` for types that may only ever exist transiently.
    fn is_persistable(&self) -> bool;

    /// `true` for leaf values representable without graph traversal.
    fn is_encodeable(&self) -> bool;

    /// `true` for collection containers, parented or free-standing.
    fn is_parented_or_free_collection(&self) -> bool;

    /// `true` for domain-service singletons.
    fn is_service(&self) -> bool;

    /// `true` for value types, which are never persisted as roots.
    fn is_value(&self) -> bool;

    /// Associations in declaration order.
    fn associations(&self) -> &[Association];

    fn association(&self, name: &str) -> Option<&Association> {
        self.associations().iter().find(|a| a.name() == name)
    }

    fn has_persisted_associations(&self) -> bool {
        self.associations().iter().any(Association::is_persisted)
    }
}

/// Broad category of a [`TypeSpec`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Entity,
    Value,
    Service,
    Collection,
}

/// Static, builder-style [`ObjectSpecification`].
///
/// ```
/// use reach_graph::{ObjectSpecification, TypeSpec};
///
/// let customer = TypeSpec::entity("CUS")
///     .reference("address")
///     .collection_of("orders")
///     .excluded_reference("cachedTotal");
/// assert_eq!(customer.associations().len(), 3);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    name: String,
    #[serde(default)]
    kind: TypeKind,
    #[serde(default = "default_true")]
    persistable: bool,
    #[serde(default)]
    encodeable: bool,
    #[serde(default)]
    associations: Vec<Association>,
}

fn default_true() -> bool {
    true
}

impl TypeSpec {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            persistable: true,
            encodeable: kind == TypeKind::Value,
            associations: Vec::new(),
        }
    }

    pub fn entity(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Entity)
    }

    /// A value type. Values are encodeable.
    pub fn value(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Value)
    }

    pub fn service(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Service)
    }

    pub fn collection(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Collection)
    }

    pub fn reference(self, name: impl Into<String>) -> Self {
        self.with_association(Association::reference(name))
    }

    pub fn collection_of(self, name: impl Into<String>) -> Self {
        self.with_association(Association::collection(name))
    }

    pub fn excluded_reference(self, name: impl Into<String>) -> Self {
        self.with_association(Association::reference(name).not_persisted())
    }

    pub fn excluded_collection(self, name: impl Into<String>) -> Self {
        self.with_association(Association::collection(name).not_persisted())
    }

    pub fn with_association(mut self, association: Association) -> Self {
        self.associations.push(association);
        self
    }

    /// Mark the type as representable without graph traversal.
    pub fn encodeable(mut self) -> Self {
        self.encodeable = true;
        self
    }

    /// Mark the type as never persistable.
    pub fn transient_only(mut self) -> Self {
        self.persistable = false;
        self
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Wrap for sharing between adapters.
    pub fn shared(self) -> Arc<dyn ObjectSpecification> {
        Arc::new(self)
    }
}

impl ObjectSpecification for TypeSpec {
    fn logical_type_name(&self) -> &str {
        &self.name
    }

    fn is_persistable(&self) -> bool {
        self.persistable
    }

    fn is_encodeable(&self) -> bool {
        self.encodeable
    }

    fn is_parented_or_free_collection(&self) -> bool {
        self.kind == TypeKind::Collection
    }

    fn is_service(&self) -> bool {
        self.kind == TypeKind::Service
    }

    fn is_value(&self) -> bool {
        self.kind == TypeKind::Value
    }

    fn associations(&self) -> &[Association] {
        &self.associations
    }
}

/// Specifications by logical type name.
#[derive(Debug, Default)]
pub struct SpecRegistry {
    specs: BTreeMap<String, Arc<dyn ObjectSpecification>>,
}

impl SpecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a specification, replacing any previous one of the same name.
    pub fn register(&mut self, spec: Arc<dyn ObjectSpecification>) {
        self.specs.insert(spec.logical_type_name().to_string(), spec);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ObjectSpecification>> {
        self.specs.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }
}
