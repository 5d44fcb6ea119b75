//! `tag-update` - transactional tag updates for remotely controlled devices.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Transactional applier.
pub mod apply;
/// Pre-write value snapshots.
pub mod backup;
/// Device configuration loading.
pub mod config;
/// Inbound envelope decoding and verification.
pub mod envelope;
/// Errors for configuration, decoding and point access.
pub mod error;
/// Transaction outcomes and reports.
pub mod outcome;
/// Tag I/O port interface.
pub mod port;
/// End-to-end envelope processing.
pub mod processor;
/// Tag metadata registry interface.
pub mod registry;
/// Restore of snapshotted values after a failed apply.
pub mod rollback;
/// In-memory simulated device.
pub mod store;
/// Batch validation against live metadata.
pub mod validate;
/// Tag data types and values.
pub mod value;

pub use outcome::{ProcessReport, RestoreStatus, TransactionOutcome};
pub use processor::TagUpdateProcessor;
