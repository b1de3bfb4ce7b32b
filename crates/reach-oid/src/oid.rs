//! The identity model: root, aggregated and collection oids.
//!
//! Only [`RootOid`] carries a lifecycle [`OidState`] and a [`Version`].
//! Aggregated and collection oids hang off a [`ParentOid`] and inherit both
//! from the root at the top of their parent chain.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OidError, Result};
use crate::marshal::OidMarshaller;
use crate::version::Version;

/// Characters that delimit the parts of an encoded oid.
pub const RESERVED_CHARS: &[char] = &['~', '$', '^'];

/// Lifecycle state of a root identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OidState {
    /// Not yet allocated in the backing store.
    Transient,
    /// Allocated in the backing store.
    Persistent,
}

impl OidState {
    pub fn is_transient(self) -> bool {
        self == OidState::Transient
    }

    pub fn is_persistent(self) -> bool {
        self == OidState::Persistent
    }
}

/// The three identity variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OidKind {
    Root,
    Aggregated,
    Collection,
}

impl fmt::Display for OidKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OidKind::Root => "root",
            OidKind::Aggregated => "aggregated",
            OidKind::Collection => "collection",
        };
        f.write_str(name)
    }
}

/// Result of comparing two observations of what may be the same object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Equivalence {
    /// Type, identifier or state differ.
    NotEquivalent,
    /// Same object, same version sequence.
    EquivalentAndUnchanged,
    /// Same object, different version sequence.
    EquivalentButChanged,
    /// Same object, but at least one side carries no version.
    EquivalentButNoVersionInfo,
}

impl Equivalence {
    /// Returns `true` for every variant except [`Equivalence::NotEquivalent`].
    pub fn is_equivalent(self) -> bool {
        self != Equivalence::NotEquivalent
    }
}

impl fmt::Display for Equivalence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Equivalence::NotEquivalent => "not equivalent",
            Equivalence::EquivalentAndUnchanged => "equivalent and unchanged",
            Equivalence::EquivalentButChanged => "equivalent but changed",
            Equivalence::EquivalentButNoVersionInfo => "equivalent but no version info",
        };
        f.write_str(name)
    }
}

/// State- and version-agnostic lookup key for a root identity.
///
/// Two [`RootOid`]s with the same key name the same logical object, whether
/// observed while transient, persistent, or at different versions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub object_type: String,
    pub identifier: String,
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&OidMarshaller::join_as_oid(&self.object_type, &self.identifier))
    }
}

// ---------------------------------------------------------------------------
// Component validation
// ---------------------------------------------------------------------------

pub(crate) fn check_type_name(value: &str) -> std::result::Result<(), String> {
    if value.is_empty() {
        return Err("must not be empty".into());
    }
    if let Some(ch) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '_'))
    {
        return Err(format!("contains forbidden character: {ch:?}"));
    }
    Ok(())
}

pub(crate) fn check_identifier(value: &str) -> std::result::Result<(), String> {
    if value.is_empty() {
        return Err("must not be empty".into());
    }
    if let Some(ch) = value.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return Err(format!("contains reserved character: {ch:?}"));
    }
    Ok(())
}

pub(crate) fn check_user(value: &str) -> std::result::Result<(), String> {
    if value.is_empty() {
        return Err("must not be empty (use no user instead)".into());
    }
    if let Some(ch) = value
        .chars()
        .find(|c| *c == ':' || RESERVED_CHARS.contains(c))
    {
        return Err(format!("contains reserved character: {ch:?}"));
    }
    Ok(())
}

fn validate(
    component: &'static str,
    value: &str,
    check: fn(&str) -> std::result::Result<(), String>,
) -> Result<()> {
    check(value).map_err(|reason| OidError::InvalidComponent {
        component,
        value: value.to_string(),
        reason,
    })
}

// ---------------------------------------------------------------------------
// RootOid
// ---------------------------------------------------------------------------

/// Identity of an independently persistable entity.
///
/// Equality, hashing and ordering consider `(object_type, identifier, state)`
/// only; the version is metadata about when the state was observed. Use
/// [`RootOid::key`] for lookups that must also ignore the state.
///
/// Because state takes part in ordering, a transient and a persistent oid
/// for the same `(object_type, identifier)` sort as distinct entries. Sort
/// or index by [`RootOid::key`] to order on type and identifier alone.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RootOid {
    object_type: String,
    identifier: String,
    state: OidState,
    version: Option<Version>,
}

impl RootOid {
    /// Create a root identity, validating its components.
    pub fn new(
        object_type: impl Into<String>,
        identifier: impl Into<String>,
        state: OidState,
    ) -> Result<Self> {
        let object_type = object_type.into();
        let identifier = identifier.into();
        validate("type name", &object_type, check_type_name)?;
        validate("identifier", &identifier, check_identifier)?;
        Ok(Self {
            object_type,
            identifier,
            state,
            version: None,
        })
    }

    pub fn transient(object_type: impl Into<String>, identifier: impl Into<String>) -> Result<Self> {
        Self::new(object_type, identifier, OidState::Transient)
    }

    pub fn persistent(
        object_type: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Result<Self> {
        Self::new(object_type, identifier, OidState::Persistent)
    }

    /// Attach (or replace) the version.
    pub fn with_version(mut self, version: Version) -> Result<Self> {
        if let Some(user) = &version.user {
            Version::validate_user(user)?;
        }
        self.version = Some(version);
        Ok(self)
    }

    /// Drop the version, keeping the identity.
    pub fn without_version(&self) -> Self {
        Self {
            version: None,
            ..self.clone()
        }
    }

    /// The persistent identity this transient one becomes once the store
    /// has allocated `identifier` for it.
    ///
    /// The state only ever moves from transient to persistent; calling this
    /// on a persistent oid is rejected.
    pub fn as_persistent(&self, identifier: impl Into<String>) -> Result<Self> {
        if self.state.is_persistent() {
            return Err(OidError::InvalidComponent {
                component: "state",
                value: OidMarshaller::marshal_root(self),
                reason: "already persistent".into(),
            });
        }
        let mut oid = Self::persistent(self.object_type.clone(), identifier)?;
        oid.version = self.version.clone();
        Ok(oid)
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn state(&self) -> OidState {
        self.state
    }

    pub fn is_transient(&self) -> bool {
        self.state.is_transient()
    }

    pub fn is_persistent(&self) -> bool {
        self.state.is_persistent()
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// State- and version-agnostic key.
    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            object_type: self.object_type.clone(),
            identifier: self.identifier.clone(),
        }
    }

    /// Compare two observations of (possibly) the same object.
    pub fn compare_against(&self, other: &RootOid) -> Equivalence {
        if self != other {
            return Equivalence::NotEquivalent;
        }
        match (&self.version, &other.version) {
            (Some(mine), Some(theirs)) if mine.differs_from(theirs) => {
                Equivalence::EquivalentButChanged
            }
            (Some(_), Some(_)) => Equivalence::EquivalentAndUnchanged,
            _ => Equivalence::EquivalentButNoVersionInfo,
        }
    }

    /// Construct without validation. Callers must have checked every component.
    pub(crate) fn from_parts(
        object_type: String,
        identifier: String,
        state: OidState,
        version: Option<Version>,
    ) -> Self {
        Self {
            object_type,
            identifier,
            state,
            version,
        }
    }
}

impl PartialEq for RootOid {
    fn eq(&self, other: &Self) -> bool {
        self.object_type == other.object_type
            && self.identifier == other.identifier
            && self.state == other.state
    }
}

impl Eq for RootOid {}

impl Hash for RootOid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.object_type.hash(state);
        self.identifier.hash(state);
        self.state.hash(state);
    }
}

/// Orders by type, identifier, then state. See [`RootOid::key`] for an
/// ordering that ignores state.
impl Ord for RootOid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.object_type
            .cmp(&other.object_type)
            .then_with(|| self.identifier.cmp(&other.identifier))
            .then_with(|| self.state.cmp(&other.state))
    }
}

impl PartialOrd for RootOid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for RootOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootOid({})", OidMarshaller::marshal_root(self))
    }
}

impl fmt::Display for RootOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&OidMarshaller::marshal_root(self))
    }
}

impl FromStr for RootOid {
    type Err = OidError;

    fn from_str(s: &str) -> Result<Self> {
        OidMarshaller::unmarshal_root(s)
    }
}

impl From<RootOid> for String {
    fn from(oid: RootOid) -> Self {
        OidMarshaller::marshal_root(&oid)
    }
}

impl TryFrom<String> for RootOid {
    type Error = OidError;

    fn try_from(s: String) -> Result<Self> {
        OidMarshaller::unmarshal_root(&s)
    }
}

// ---------------------------------------------------------------------------
// ParentOid
// ---------------------------------------------------------------------------

/// An identity that can own aggregated objects and collections.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParentOid {
    Root(RootOid),
    Aggregated(AggregatedOid),
}

impl ParentOid {
    /// The root at the top of the parent chain.
    pub fn root(&self) -> &RootOid {
        match self {
            ParentOid::Root(root) => root,
            ParentOid::Aggregated(agg) => agg.root(),
        }
    }

    pub fn object_type(&self) -> &str {
        match self {
            ParentOid::Root(root) => root.object_type(),
            ParentOid::Aggregated(agg) => agg.object_type(),
        }
    }

    pub fn into_oid(self) -> Oid {
        match self {
            ParentOid::Root(root) => Oid::Root(root),
            ParentOid::Aggregated(agg) => Oid::Aggregated(agg),
        }
    }
}

impl From<RootOid> for ParentOid {
    fn from(root: RootOid) -> Self {
        ParentOid::Root(root)
    }
}

impl From<AggregatedOid> for ParentOid {
    fn from(agg: AggregatedOid) -> Self {
        ParentOid::Aggregated(agg)
    }
}

impl TryFrom<Oid> for ParentOid {
    type Error = OidError;

    fn try_from(oid: Oid) -> Result<Self> {
        match oid {
            Oid::Root(root) => Ok(ParentOid::Root(root)),
            Oid::Aggregated(agg) => Ok(ParentOid::Aggregated(agg)),
            Oid::Collection(coll) => Err(OidError::InvalidComponent {
                component: "parent",
                value: OidMarshaller::marshal_collection(&coll),
                reason: "a collection cannot own aggregated objects or collections".into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// AggregatedOid
// ---------------------------------------------------------------------------

/// Identity of a value object or child entity owned by its parent.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AggregatedOid {
    object_type: String,
    parent: Box<ParentOid>,
    local_id: String,
}

impl AggregatedOid {
    pub fn new(
        object_type: impl Into<String>,
        parent: impl Into<ParentOid>,
        local_id: impl Into<String>,
    ) -> Result<Self> {
        let object_type = object_type.into();
        let local_id = local_id.into();
        validate("type name", &object_type, check_type_name)?;
        validate("local id", &local_id, check_identifier)?;
        Ok(Self::from_parts(object_type, parent.into(), local_id))
    }

    pub(crate) fn from_parts(object_type: String, parent: ParentOid, local_id: String) -> Self {
        Self {
            object_type,
            parent: Box::new(parent),
            local_id,
        }
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn parent(&self) -> &ParentOid {
        &self.parent
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn root(&self) -> &RootOid {
        self.parent.root()
    }

    /// Number of aggregation levels below the root (at least one).
    pub fn depth(&self) -> usize {
        match self.parent.as_ref() {
            ParentOid::Root(_) => 1,
            ParentOid::Aggregated(agg) => agg.depth() + 1,
        }
    }

    /// The same identity re-parented onto `parent`.
    pub fn with_parent(&self, parent: impl Into<ParentOid>) -> Self {
        Self::from_parts(self.object_type.clone(), parent.into(), self.local_id.clone())
    }
}

impl fmt::Debug for AggregatedOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AggregatedOid({})", OidMarshaller::marshal_aggregated(self))
    }
}

// ---------------------------------------------------------------------------
// CollectionOid
// ---------------------------------------------------------------------------

/// Identity of a named collection attached to a parent.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CollectionOid {
    parent: ParentOid,
    collection_id: String,
}

impl CollectionOid {
    pub fn new(parent: impl Into<ParentOid>, collection_id: impl Into<String>) -> Result<Self> {
        let collection_id = collection_id.into();
        validate("collection id", &collection_id, check_identifier)?;
        Ok(Self::from_parts(parent.into(), collection_id))
    }

    pub(crate) fn from_parts(parent: ParentOid, collection_id: String) -> Self {
        Self {
            parent,
            collection_id,
        }
    }

    pub fn parent(&self) -> &ParentOid {
        &self.parent
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn root(&self) -> &RootOid {
        self.parent.root()
    }

    /// The same collection re-parented onto `parent`.
    pub fn with_parent(&self, parent: impl Into<ParentOid>) -> Self {
        Self::from_parts(parent.into(), self.collection_id.clone())
    }
}

impl fmt::Debug for CollectionOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionOid({})", OidMarshaller::marshal_collection(self))
    }
}

// ---------------------------------------------------------------------------
// Oid
// ---------------------------------------------------------------------------

/// Any object identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Oid {
    Root(RootOid),
    Aggregated(AggregatedOid),
    Collection(CollectionOid),
}

impl Oid {
    pub fn kind(&self) -> OidKind {
        match self {
            Oid::Root(_) => OidKind::Root,
            Oid::Aggregated(_) => OidKind::Aggregated,
            Oid::Collection(_) => OidKind::Collection,
        }
    }

    /// The root that carries state and version for this identity.
    pub fn root(&self) -> &RootOid {
        match self {
            Oid::Root(root) => root,
            Oid::Aggregated(agg) => agg.root(),
            Oid::Collection(coll) => coll.root(),
        }
    }

    /// Logical type name. Collections report their owner's type.
    pub fn object_type(&self) -> &str {
        match self {
            Oid::Root(root) => root.object_type(),
            Oid::Aggregated(agg) => agg.object_type(),
            Oid::Collection(coll) => coll.parent().object_type(),
        }
    }

    pub fn as_root(&self) -> Option<&RootOid> {
        match self {
            Oid::Root(root) => Some(root),
            _ => None,
        }
    }

    pub fn state(&self) -> OidState {
        self.root().state()
    }

    pub fn is_transient(&self) -> bool {
        self.root().is_transient()
    }

    pub fn is_persistent(&self) -> bool {
        self.root().is_persistent()
    }

    /// Returns `true` for identities owned by a parent.
    pub fn is_parented(&self) -> bool {
        !matches!(self, Oid::Root(_))
    }

    pub fn version(&self) -> Option<&Version> {
        self.root().version()
    }
}

impl From<RootOid> for Oid {
    fn from(root: RootOid) -> Self {
        Oid::Root(root)
    }
}

impl From<AggregatedOid> for Oid {
    fn from(agg: AggregatedOid) -> Self {
        Oid::Aggregated(agg)
    }
}

impl From<CollectionOid> for Oid {
    fn from(coll: CollectionOid) -> Self {
        Oid::Collection(coll)
    }
}

impl From<ParentOid> for Oid {
    fn from(parent: ParentOid) -> Self {
        parent.into_oid()
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&OidMarshaller::marshal(self))
    }
}

impl FromStr for Oid {
    type Err = OidError;

    fn from_str(s: &str) -> Result<Self> {
        OidMarshaller::unmarshal_any(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        OidMarshaller::marshal(&oid)
    }
}

impl TryFrom<String> for Oid {
    type Error = OidError;

    fn try_from(s: String) -> Result<Self> {
        OidMarshaller::unmarshal_any(&s)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use super::*;

    fn cus(state: OidState) -> RootOid {
        RootOid::new("CUS", "123", state).unwrap()
    }

    #[test]
    fn equality_ignores_version() {
        let a = cus(OidState::Persistent)
            .with_version(Version::sequence_only(1))
            .unwrap();
        let b = cus(OidState::Persistent)
            .with_version(Version::new(2, Some("joe".into()), Some(99)))
            .unwrap();
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn state_affects_equality() {
        let persistent = cus(OidState::Persistent);
        let transient = cus(OidState::Transient);
        assert_ne!(persistent, transient);
        assert_eq!(
            persistent.compare_against(&transient),
            Equivalence::NotEquivalent
        );
    }

    #[test]
    fn compare_against_versions() {
        let v1 = cus(OidState::Persistent)
            .with_version(Version::sequence_only(1))
            .unwrap();
        let v1_again = cus(OidState::Persistent)
            .with_version(Version::new(1, Some("other".into()), None))
            .unwrap();
        let v2 = cus(OidState::Persistent)
            .with_version(Version::sequence_only(2))
            .unwrap();
        let unversioned = cus(OidState::Persistent);

        assert_eq!(v1.compare_against(&v1_again), Equivalence::EquivalentAndUnchanged);
        assert_eq!(v1.compare_against(&v2), Equivalence::EquivalentButChanged);
        assert_eq!(
            v1.compare_against(&unversioned),
            Equivalence::EquivalentButNoVersionInfo
        );
        assert_eq!(
            unversioned.compare_against(&v2),
            Equivalence::EquivalentButNoVersionInfo
        );
        assert!(v1.compare_against(&v2).is_equivalent());
    }

    #[test]
    fn different_identifier_is_not_equivalent() {
        let a = RootOid::persistent("CUS", "1").unwrap();
        let b = RootOid::persistent("CUS", "2").unwrap();
        assert_eq!(a.compare_against(&b), Equivalence::NotEquivalent);
    }

    #[test]
    fn key_ignores_state_and_version() {
        let transient = cus(OidState::Transient);
        let persistent = cus(OidState::Persistent)
            .with_version(Version::sequence_only(5))
            .unwrap();
        assert_eq!(transient.key(), persistent.key());

        let mut map = BTreeMap::new();
        map.insert(transient.key(), "current");
        assert_eq!(map.get(&persistent.key()), Some(&"current"));
    }

    #[test]
    fn key_ordering_ignores_state() {
        let transient = RootOid::transient("CUS", "2").unwrap();
        let persistent = RootOid::persistent("CUS", "2").unwrap();
        let other = RootOid::persistent("CUS", "1").unwrap();

        let by_oid: BTreeMap<RootOid, ()> = [&transient, &persistent, &other]
            .into_iter()
            .map(|oid| (oid.clone(), ()))
            .collect();
        assert_eq!(by_oid.len(), 3);

        let by_key: BTreeMap<ObjectKey, ()> = [&transient, &persistent, &other]
            .into_iter()
            .map(|oid| (oid.key(), ()))
            .collect();
        assert_eq!(by_key.len(), 2);
        assert_eq!(by_key.keys().next(), Some(&other.key()));
    }

    #[test]
    fn ordering_is_by_type_then_identifier() {
        let a = RootOid::persistent("A", "2").unwrap();
        let b = RootOid::persistent("B", "1").unwrap();
        let a1 = RootOid::persistent("A", "1").unwrap();
        let mut oids = vec![b.clone(), a.clone(), a1.clone()];
        oids.sort();
        assert_eq!(oids, vec![a1, a, b]);
    }

    #[test]
    fn as_persistent_flips_state_once() {
        let transient = RootOid::transient("CUS", "t1").unwrap();
        let persistent = transient.as_persistent("42").unwrap();
        assert!(persistent.is_persistent());
        assert_eq!(persistent.identifier(), "42");
        assert!(persistent.as_persistent("43").is_err());
    }

    #[test]
    fn constructors_reject_reserved_characters() {
        assert!(RootOid::persistent("CUS:X", "1").is_err());
        assert!(RootOid::persistent("CUS", "1~2").is_err());
        assert!(RootOid::persistent("CUS", "").is_err());
        assert!(RootOid::persistent("", "1").is_err());
        assert!(RootOid::persistent("com.example.Customer_2", "a:b").is_ok());

        let root = cus(OidState::Persistent);
        assert!(root
            .clone()
            .with_version(Version::new(1, Some("joe:x".into()), None))
            .is_err());
        assert!(root
            .with_version(Version::new(1, Some(String::new()), None))
            .is_err());
    }

    #[test]
    fn aggregated_chain_reports_root_and_depth() {
        let root = cus(OidState::Transient);
        let name = AggregatedOid::new("NME", root.clone(), "2").unwrap();
        let part = AggregatedOid::new("PRT", name.clone(), "x").unwrap();
        assert_eq!(part.depth(), 2);
        assert_eq!(part.root(), &root);
        assert!(Oid::from(part).is_transient());
    }

    #[test]
    fn aggregated_equality_includes_parent_chain() {
        let a = AggregatedOid::new("NME", cus(OidState::Persistent), "2").unwrap();
        let b = AggregatedOid::new("NME", cus(OidState::Transient), "2").unwrap();
        assert_ne!(a, b);
        let c = AggregatedOid::new(
            "NME",
            cus(OidState::Persistent)
                .with_version(Version::sequence_only(3))
                .unwrap(),
            "2",
        )
        .unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn collection_cannot_be_a_parent() {
        let coll = CollectionOid::new(cus(OidState::Persistent), "items").unwrap();
        assert!(ParentOid::try_from(Oid::from(coll)).is_err());
    }

    #[test]
    fn collection_reports_owner_type() {
        let coll = Oid::from(CollectionOid::new(cus(OidState::Persistent), "items").unwrap());
        assert_eq!(coll.kind(), OidKind::Collection);
        assert_eq!(coll.object_type(), "CUS");
        assert!(coll.is_parented());
    }

    #[test]
    fn serde_uses_marshalled_form() {
        let oid = Oid::from(
            AggregatedOid::new(
                "NME",
                cus(OidState::Persistent)
                    .with_version(Version::new(7, Some("joe".into()), Some(10)))
                    .unwrap(),
                "2",
            )
            .unwrap(),
        );
        let json = serde_json::to_string(&oid).unwrap();
        assert_eq!(json, "\"CUS:123^7:joe:10~NME:2\"");
        let parsed: Oid = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, oid);
        assert_eq!(parsed.version(), oid.version());
    }

    #[test]
    fn serde_rejects_malformed() {
        let result: std::result::Result<RootOid, _> = serde_json::from_str("\"xxx\"");
        assert!(result.is_err());
    }
}
