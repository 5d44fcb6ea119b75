//! Ordered application of a validated batch.

#![allow(missing_docs)]

use serde::Serialize;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::backup::BackupRecord;
use crate::envelope::UpdateBatch;
use crate::error::IoFault;
use crate::port::TagPort;

/// Step at which an entry failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Reading the pre-write value for the snapshot.
    Snapshot,
    /// Writing the new value.
    Write,
}

/// First failed entry of an apply; later entries were never attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyFailure {
    pub index: usize,
    pub tag: SmolStr,
    pub stage: FailureStage,
    pub fault: IoFault,
}

/// Result of applying a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Entries written successfully, all before `failure.index`.
    pub written: usize,
    pub failure: Option<ApplyFailure>,
    /// Snapshots taken, present only when restore was requested.
    pub backup: Option<BackupRecord>,
}

impl ApplyReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Writes every entry in order, stopping at the first fault.
///
/// The batch must already have passed validation. With
/// `restore_on_failure`, each tag's current value is read once, before the
/// first write to it, and kept in the returned backup.
pub fn apply_batch<P: TagPort + ?Sized>(batch: &UpdateBatch, port: &mut P) -> ApplyReport {
    let mut backup = batch.restore_on_failure.then(BackupRecord::new);
    let mut written = 0;

    for (index, entry) in batch.entries.iter().enumerate() {
        let tag = entry.tag_name.as_str();
        let declared = entry.declared_type();

        if let Some(backup) = backup.as_mut() {
            if !backup.contains(tag) {
                match port.read(tag, declared.native_kind()) {
                    Ok(previous) => {
                        debug!("snapshot {tag} = {previous}");
                        backup.record(entry.tag_name.clone(), previous, declared);
                    }
                    Err(fault) => {
                        warn!("could not read the current value of '{tag}' before update: {fault}");
                        return ApplyReport {
                            written,
                            failure: Some(ApplyFailure {
                                index,
                                tag: entry.tag_name.clone(),
                                stage: FailureStage::Snapshot,
                                fault,
                            }),
                            backup: Some(std::mem::take(backup)),
                        };
                    }
                }
            }
        }

        let native = entry.value.to_native();
        if let Err(fault) = port.write(tag, &native) {
            warn!(
                "the value of tag '{tag}' could not be updated to {}: {fault}",
                entry.value
            );
            // A tag this transaction never changed has nothing to restore.
            let written_before = batch.entries[..index]
                .iter()
                .any(|earlier| earlier.tag_name == entry.tag_name);
            if let (false, Some(backup)) = (written_before, backup.as_mut()) {
                backup.discard(tag);
            }
            return ApplyReport {
                written,
                failure: Some(ApplyFailure {
                    index,
                    tag: entry.tag_name.clone(),
                    stage: FailureStage::Write,
                    fault,
                }),
                backup,
            };
        }
        debug!("updated {tag} = {native}");
        written += 1;
    }

    ApplyReport {
        written,
        failure: None,
        backup,
    }
}
