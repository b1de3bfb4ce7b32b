//! String codec for identities.
//!
//! ```text
//! root        := ["!"] type ":" ident ["^" version]
//! aggregated  := root ("~" type ":" ident)+
//! collection  := (root | aggregated) "$" collectionId
//! version     := sequence ":" [user] ":" [utcMillis]
//! type        := 1*(ALPHA | DIGIT | "." | "_")
//! ```
//!
//! A leading `!` marks a transient root. The version always belongs to the
//! root segment. Empty `user` and `utcMillis` fields decode to `None`.
//!
//! A version whose `sequence` is not an integer is dropped rather than
//! rejected; every other deviation from the grammar is an
//! [`OidError::Malformed`].

use crate::error::{OidError, Result};
use crate::oid::{
    check_identifier, check_type_name, check_user, AggregatedOid, CollectionOid, ObjectKey, Oid,
    OidKind, OidState, ParentOid, RootOid,
};
use crate::version::Version;

/// Prefix marking a transient root.
pub const TRANSIENT_INDICATOR: char = '!';
/// Separates type from identifier, and the fields of a version.
pub const SEPARATOR: char = ':';
/// Introduces an aggregated segment.
pub const SEPARATOR_NESTING: char = '~';
/// Introduces the collection id.
pub const SEPARATOR_COLLECTION: char = '$';
/// Introduces the version of the root.
pub const SEPARATOR_VERSION: char = '^';

/// Encodes and decodes [`Oid`]s to and from their string form.
///
/// `unmarshal(marshal(oid)) == oid` holds for every oid built through the
/// validating constructors, version included.
pub struct OidMarshaller;

impl OidMarshaller {
    // ---------------------------------------------------------------
    // Encoding
    // ---------------------------------------------------------------

    /// Encode any oid, including the root's version if present.
    pub fn marshal(oid: &Oid) -> String {
        let mut buf = String::new();
        write_oid(&mut buf, oid, true);
        buf
    }

    /// Encode any oid without its version, e.g. for use as a lookup key.
    pub fn marshal_without_version(oid: &Oid) -> String {
        let mut buf = String::new();
        write_oid(&mut buf, oid, false);
        buf
    }

    pub fn marshal_root(oid: &RootOid) -> String {
        let mut buf = String::new();
        write_root(&mut buf, oid, true);
        buf
    }

    pub fn marshal_aggregated(oid: &AggregatedOid) -> String {
        let mut buf = String::new();
        write_aggregated(&mut buf, oid, true);
        buf
    }

    pub fn marshal_collection(oid: &CollectionOid) -> String {
        let mut buf = String::new();
        write_collection(&mut buf, oid, true);
        buf
    }

    /// `"type:identifier"`, the persistent form of a root without version.
    pub fn join_as_oid(object_type: &str, identifier: &str) -> String {
        format!("{object_type}{SEPARATOR}{identifier}")
    }

    // ---------------------------------------------------------------
    // Decoding
    // ---------------------------------------------------------------

    /// Decode `input`, requiring it to be an oid of the `expected` kind.
    pub fn unmarshal(input: &str, expected: OidKind) -> Result<Oid> {
        let oid = parse(input)?;
        if oid.kind() != expected {
            return Err(kind_mismatch(input, expected, oid.kind()));
        }
        Ok(oid)
    }

    /// Decode `input` as whatever kind of oid it encodes.
    pub fn unmarshal_any(input: &str) -> Result<Oid> {
        parse(input)
    }

    pub fn unmarshal_root(input: &str) -> Result<RootOid> {
        match parse(input)? {
            Oid::Root(root) => Ok(root),
            other => Err(kind_mismatch(input, OidKind::Root, other.kind())),
        }
    }

    pub fn unmarshal_aggregated(input: &str) -> Result<AggregatedOid> {
        match parse(input)? {
            Oid::Aggregated(agg) => Ok(agg),
            other => Err(kind_mismatch(input, OidKind::Aggregated, other.kind())),
        }
    }

    pub fn unmarshal_collection(input: &str) -> Result<CollectionOid> {
        match parse(input)? {
            Oid::Collection(coll) => Ok(coll),
            other => Err(kind_mismatch(input, OidKind::Collection, other.kind())),
        }
    }

    /// Split `"type:identifier"` into its key parts.
    pub fn split_instance_id(input: &str) -> Result<ObjectKey> {
        let (object_type, identifier) = parse_type_and_id(input, input)?;
        Ok(ObjectKey {
            object_type,
            identifier,
        })
    }
}

// -----------------------------------------------------------------------
// Writers
// -----------------------------------------------------------------------

fn write_oid(buf: &mut String, oid: &Oid, with_version: bool) {
    match oid {
        Oid::Root(root) => write_root(buf, root, with_version),
        Oid::Aggregated(agg) => write_aggregated(buf, agg, with_version),
        Oid::Collection(coll) => write_collection(buf, coll, with_version),
    }
}

fn write_parent(buf: &mut String, parent: &ParentOid, with_version: bool) {
    match parent {
        ParentOid::Root(root) => write_root(buf, root, with_version),
        ParentOid::Aggregated(agg) => write_aggregated(buf, agg, with_version),
    }
}

fn write_root(buf: &mut String, root: &RootOid, with_version: bool) {
    if root.is_transient() {
        buf.push(TRANSIENT_INDICATOR);
    }
    buf.push_str(root.object_type());
    buf.push(SEPARATOR);
    buf.push_str(root.identifier());
    if !with_version {
        return;
    }
    if let Some(version) = root.version() {
        buf.push(SEPARATOR_VERSION);
        buf.push_str(&version.sequence.to_string());
        buf.push(SEPARATOR);
        if let Some(user) = &version.user {
            buf.push_str(user);
        }
        buf.push(SEPARATOR);
        if let Some(utc) = version.utc_timestamp {
            buf.push_str(&utc.to_string());
        }
    }
}

fn write_aggregated(buf: &mut String, agg: &AggregatedOid, with_version: bool) {
    write_parent(buf, agg.parent(), with_version);
    buf.push(SEPARATOR_NESTING);
    buf.push_str(agg.object_type());
    buf.push(SEPARATOR);
    buf.push_str(agg.local_id());
}

fn write_collection(buf: &mut String, coll: &CollectionOid, with_version: bool) {
    write_parent(buf, coll.parent(), with_version);
    buf.push(SEPARATOR_COLLECTION);
    buf.push_str(coll.collection_id());
}

// -----------------------------------------------------------------------
// Parser
// -----------------------------------------------------------------------

fn kind_mismatch(input: &str, expected: OidKind, actual: OidKind) -> OidError {
    OidError::KindMismatch {
        input: input.to_string(),
        expected,
        actual,
    }
}

fn parse(input: &str) -> Result<Oid> {
    let (body, state) = match input.strip_prefix(TRANSIENT_INDICATOR) {
        Some(rest) => (rest, OidState::Transient),
        None => (input, OidState::Persistent),
    };

    let (body, collection_id) = match body.split_once(SEPARATOR_COLLECTION) {
        Some((head, collection_id)) => {
            if collection_id.contains(SEPARATOR_COLLECTION) {
                return Err(OidError::malformed(
                    input,
                    "nested collections are not supported",
                ));
            }
            check_identifier(collection_id)
                .map_err(|reason| OidError::malformed(input, format!("collection id {reason}")))?;
            (head, Some(collection_id.to_string()))
        }
        None => (body, None),
    };

    let mut segments = body.split(SEPARATOR_NESTING);
    let Some(root_segment) = segments.next() else {
        return Err(OidError::malformed(input, "empty identifier"));
    };
    let mut parent = ParentOid::Root(parse_root(input, root_segment, state)?);

    for segment in segments {
        let (object_type, local_id) = parse_type_and_id(input, segment)?;
        parent = ParentOid::Aggregated(AggregatedOid::from_parts(object_type, parent, local_id));
    }

    Ok(match collection_id {
        Some(collection_id) => Oid::Collection(CollectionOid::from_parts(parent, collection_id)),
        None => parent.into_oid(),
    })
}

fn parse_root(input: &str, segment: &str, state: OidState) -> Result<RootOid> {
    let (head, version) = match segment.split_once(SEPARATOR_VERSION) {
        Some((head, version)) => (head, parse_version(input, version)?),
        None => (segment, None),
    };
    let (object_type, identifier) = parse_type_and_id(input, head)?;
    Ok(RootOid::from_parts(object_type, identifier, state, version))
}

fn parse_type_and_id(input: &str, segment: &str) -> Result<(String, String)> {
    let Some((object_type, identifier)) = segment.split_once(SEPARATOR) else {
        return Err(OidError::malformed(
            input,
            format!("expected type{SEPARATOR}identifier, found {segment:?}"),
        ));
    };
    check_type_name(object_type)
        .map_err(|reason| OidError::malformed(input, format!("type name {reason}")))?;
    check_identifier(identifier)
        .map_err(|reason| OidError::malformed(input, format!("identifier {reason}")))?;
    Ok((object_type.to_string(), identifier.to_string()))
}

/// Returns `Ok(None)` when the sequence is not numeric.
fn parse_version(input: &str, raw: &str) -> Result<Option<Version>> {
    let parts: Vec<&str> = raw.splitn(3, SEPARATOR).collect();
    let [sequence, user, utc] = parts.as_slice() else {
        return Err(OidError::malformed(
            input,
            "version must have the form sequence:user:utcMillis",
        ));
    };

    if sequence.is_empty() {
        return Err(OidError::malformed(input, "version sequence is missing"));
    }

    let user = if user.is_empty() {
        None
    } else {
        check_user(user)
            .map_err(|reason| OidError::malformed(input, format!("version user {reason}")))?;
        Some(user.to_string())
    };

    let utc_timestamp = if utc.is_empty() {
        None
    } else {
        let digits = utc.strip_prefix('-').unwrap_or(utc);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(OidError::malformed(
                input,
                format!("version timestamp {utc:?} is not a number"),
            ));
        }
        let millis = utc
            .parse::<i64>()
            .map_err(|e| OidError::malformed(input, format!("version timestamp: {e}")))?;
        Some(millis)
    };

    Ok(sequence
        .parse::<i64>()
        .ok()
        .map(|sequence| Version::new(sequence, user, utc_timestamp)))
}
