//! Restore of snapshotted values after a failed apply.

#![allow(missing_docs)]

use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::backup::BackupRecord;
use crate::error::IoFault;
use crate::outcome::RestoreStatus;
use crate::port::TagPort;

/// Per-tag result of a restore pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<SmolStr>,
    pub failed: Vec<IoFault>,
}

impl RestoreReport {
    #[must_use]
    pub fn status(&self) -> RestoreStatus {
        if self.failed.is_empty() {
            RestoreStatus::Full
        } else {
            RestoreStatus::Partial
        }
    }
}

/// Writes every snapshotted value back to its tag.
///
/// Only tags present in the backup are touched. A failed restore of one tag
/// does not stop the others.
pub fn restore<P: TagPort + ?Sized>(backup: BackupRecord, port: &mut P) -> RestoreReport {
    warn!(
        "restoring {} tag value(s) after a failed tag update",
        backup.len()
    );
    let mut report = RestoreReport::default();
    for (tag, entry) in backup.iter() {
        match port.write(tag.as_str(), &entry.value) {
            Ok(()) => {
                debug!("restored {tag} = {} ({})", entry.value, entry.declared);
                report.restored.push(tag.clone());
            }
            Err(fault) => {
                warn!("could not restore '{tag}' to {}: {fault}", entry.value);
                report.failed.push(fault);
            }
        }
    }
    match report.status() {
        RestoreStatus::Full => warn!("tag values have been restored"),
        RestoreStatus::Partial => warn!(
            "tag values have been partially restored ({} of {} failed)",
            report.failed.len(),
            backup.len()
        ),
    }
    report
}
