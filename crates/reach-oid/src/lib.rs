//! Object identities for persistence by reachability.
//!
//! This crate provides the identity model shared by the walker, the stores
//! and anything that needs to carry a reference to a domain object across a
//! process or storage boundary (lookup keys, URL path segments, stored
//! columns).
//!
//! # Key Types
//!
//! - [`RootOid`] -- identity of an independently persistable entity, with a
//!   lifecycle [`OidState`] and an optional [`Version`]
//! - [`AggregatedOid`] -- value object or child owned by a parent identity
//! - [`CollectionOid`] -- named collection attached to a parent identity
//! - [`Oid`] -- any of the above
//! - [`OidMarshaller`] -- the bit-exact string codec
//!
//! # Wire Format
//!
//! ```text
//! !CUS:123                      transient root
//! CUS:123^90809:joebloggs:1231  persistent root, version 90809
//! CUS:123~NME:2                 aggregated NME 2 owned by CUS 123
//! CUS:123~NME:2$items           collection "items" of that aggregate
//! ```

pub mod error;
pub mod marshal;
pub mod oid;
pub mod version;

pub use error::{OidError, Result};
pub use marshal::OidMarshaller;
pub use oid::{
    AggregatedOid, CollectionOid, Equivalence, ObjectKey, Oid, OidKind, OidState, ParentOid,
    RootOid,
};
pub use version::Version;
