//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Checksum
// ============================================================================

/// SHA-256 content digest in lowercase hexadecimal form
///
/// The checksum is the sole identity used for deduplication: two documents
/// with identical bytes share a checksum regardless of name or location.
/// Format: 64 lowercase hex characters (32 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checksum(String);

impl Checksum {
    /// Length of the raw digest in bytes
    pub const DIGEST_LEN: usize = 32;

    /// Length of the hex-encoded form
    pub const HEX_LEN: usize = Self::DIGEST_LEN * 2;

    /// Create a Checksum from its hex representation
    ///
    /// Uppercase input is accepted and normalized to lowercase.
    ///
    /// # Errors
    /// Returns error if the string is not 64 hex characters
    pub fn new(hex_digest: String) -> Result<Self, DomainError> {
        if hex_digest.len() != Self::HEX_LEN {
            return Err(DomainError::InvalidChecksum(format!(
                "expected {} hex characters, got {}",
                Self::HEX_LEN,
                hex_digest.len()
            )));
        }

        if !hex_digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidChecksum(format!(
                "not a hex string: {hex_digest}"
            )));
        }

        Ok(Self(hex_digest.to_ascii_lowercase()))
    }

    /// Create a Checksum from a finished 32-byte digest
    #[must_use]
    pub fn from_digest(digest: &[u8; Self::DIGEST_LEN]) -> Self {
        Self(hex::encode(digest))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log output
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl Display for Checksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Checksum {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for Checksum {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Checksum> for String {
    fn from(checksum: Checksum) -> Self {
        checksum.0
    }
}

// ============================================================================
// RemoteId
// ============================================================================

/// Server-assigned identifier returned after a successful upload
///
/// The remote service decides the format (UUIDs, numeric IDs, ...), so the
/// only requirement is that it is non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or whitespace only
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.trim().is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}
