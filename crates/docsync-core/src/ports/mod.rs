//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are interfaces that the sync engine depends on, but whose
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteSyncClient`] - Duplicate check and document upload against the remote service

pub mod remote_sync;

pub use remote_sync::{DuplicateCheck, IRemoteSyncClient, UploadRequest, UploadResult};
