//! Validated instance identifiers.
//!
//! Each instance owns a repository file named after its identifier, so the
//! identifier doubles as a file name under the repository root. Validation
//! happens once, at the boundary, and every store operation takes an
//! [`InstanceId`] afterwards.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Longest identifier accepted; matches common file-name limits.
pub const MAX_INSTANCE_ID_LEN: usize = 255;

/// Suffixes SQLite uses for side files next to a database.
const SIDE_FILE_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

/// Errors raised when a raw string is not a usable instance identifier.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum InstanceIdError {
    /// Raised for empty or whitespace-only identifiers.
    #[error("instance identifier must not be empty")]
    Empty,
    /// Raised when the identifier exceeds [`MAX_INSTANCE_ID_LEN`] bytes.
    #[error("instance identifier is {len} bytes long; the limit is {MAX_INSTANCE_ID_LEN}")]
    TooLong {
        /// Length of the rejected identifier in bytes.
        len: usize,
    },
    /// Raised when the identifier contains a path separator or control
    /// character.
    #[error("instance identifier contains invalid character {character:?}")]
    InvalidCharacter {
        /// Offending character.
        character: char,
    },
    /// Raised for `.`, `..`, and names that collide with SQLite side files.
    #[error("instance identifier {value:?} is reserved")]
    Reserved {
        /// Rejected identifier.
        value: String,
    },
}

/// Stable identifier of a remote instance, safe to use as a file name.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Validates `raw` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceIdError`] when the identifier is empty, too long,
    /// reserved, or contains a path separator or control character.
    pub fn new(raw: impl Into<String>) -> Result<Self, InstanceIdError> {
        let value = raw.into();
        if value.trim().is_empty() {
            return Err(InstanceIdError::Empty);
        }
        if value.len() > MAX_INSTANCE_ID_LEN {
            return Err(InstanceIdError::TooLong { len: value.len() });
        }
        if let Some(character) = value
            .chars()
            .find(|ch| matches!(ch, '/' | '\\') || ch.is_control())
        {
            return Err(InstanceIdError::InvalidCharacter { character });
        }
        if value == "." || value == ".." || is_side_file_name(&value) {
            return Err(InstanceIdError::Reserved { value });
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InstanceId {
    type Err = InstanceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for InstanceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returns true when `name` ends with one of the SQLite side-file suffixes.
pub(crate) fn is_side_file_name(name: &str) -> bool {
    SIDE_FILE_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
}
