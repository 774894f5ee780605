//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! mainly validation failures when parsing identifiers.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid checksum format (expected 64 lowercase hex characters)
    #[error("Invalid checksum: {0}")]
    InvalidChecksum(String),

    /// Invalid remote identifier
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}
