//! Domain entities and value types
//!
//! This module contains the core domain types for DocSync:
//! - Newtypes for validated identifiers (checksums, remote IDs)
//! - Documents, recognized document kinds and metadata hints
//! - Upload outcomes and per-pass session counters
//! - Domain-specific error types

pub mod document;
pub mod errors;
pub mod newtypes;
pub mod outcome;

// Re-export commonly used types
pub use document::{Document, DocumentKind, MetadataHints};
pub use errors::DomainError;
pub use newtypes::*;
pub use outcome::{DedupSource, SessionCounters, UploadOutcome};
