//! DocSync Core - Domain types, configuration and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `Checksum`, `Document`, `UploadOutcome`, `SessionCounters`
//! - **Configuration** - YAML-backed `Config` with environment overrides and validation
//! - **Port definitions** - `IRemoteSyncClient`, the boundary to the remote service
//!
//! # Architecture
//!
//! The domain module contains pure data types with no I/O.
//! Ports define trait interfaces that adapter crates implement
//! (`docsync-remote` for HTTP, in-memory fakes for tests).
//! The sync engine in `docsync-sync` drives domain types through the ports.

pub mod config;
pub mod domain;
pub mod ports;
