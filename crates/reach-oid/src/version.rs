use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{OidError, Result};
use crate::oid::check_user;

/// Optimistic-concurrency token attached to a persistent [`RootOid`].
///
/// A version records *when* the referenced state was observed: a
/// monotonically increasing `sequence`, optionally the user who produced it
/// and the wall-clock time in UTC milliseconds. It never takes part in
/// identity equality.
///
/// [`RootOid`]: crate::RootOid
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Sequence number, bumped on every stored change.
    pub sequence: i64,
    /// User that produced this version, if recorded.
    pub user: Option<String>,
    /// Milliseconds since UNIX epoch (UTC), if recorded.
    pub utc_timestamp: Option<i64>,
}

impl Version {
    /// Create a version with explicit values.
    pub fn new(sequence: i64, user: Option<String>, utc_timestamp: Option<i64>) -> Self {
        Self {
            sequence,
            user,
            utc_timestamp,
        }
    }

    /// Version carrying only a sequence number.
    pub fn sequence_only(sequence: i64) -> Self {
        Self::new(sequence, None, None)
    }

    /// Create a version stamped with the current wall-clock time.
    pub fn now(sequence: i64, user: Option<String>) -> Self {
        Self::new(sequence, user, Some(utc_millis_now()))
    }

    /// The version that follows this one, stamped now.
    ///
    /// Returns `None` once the sequence is exhausted.
    pub fn next(&self, user: Option<String>) -> Option<Self> {
        let sequence = self.sequence.checked_add(1)?;
        Some(Self::now(sequence, user))
    }

    /// Check that `user` can be carried in an encoded version.
    ///
    /// Users must be non-empty and must not contain `:` or any reserved
    /// identity character.
    pub fn validate_user(user: &str) -> Result<()> {
        check_user(user).map_err(|reason| OidError::InvalidComponent {
            component: "version user",
            value: user.to_string(),
            reason,
        })
    }

    /// Returns `true` if the two versions describe different states.
    ///
    /// Only the sequence is compared; user and timestamp are informational.
    pub fn differs_from(&self, other: &Version) -> bool {
        self.sequence != other.sequence
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.sequence)?;
        if let Some(user) = &self.user {
            write!(f, " by {user}")?;
        }
        if let Some(utc) = self.utc_timestamp {
            write!(f, " @{utc}")?;
        }
        Ok(())
    }
}

fn utc_millis_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
