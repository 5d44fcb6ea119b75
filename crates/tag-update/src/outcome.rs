//! Transaction outcomes, restore status and the result classifier.

#![allow(missing_docs)]

use std::fmt;

use serde::Serialize;
use serde_json::json;
use smol_str::SmolStr;

use crate::apply::{ApplyReport, FailureStage};
use crate::envelope::{RemoteFault, VerifyError};
use crate::rollback::RestoreReport;
use crate::validate::{BatchReport, EntryFault};

/// Final result of processing one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionOutcome {
    Success,
    VerifyFailure,
    MissingTags,
    MismatchedTypes,
    ApplyFailure,
    /// The peer reported its own failure; carries the peer's code unchanged.
    RemoteError(i64),
}

impl TransactionOutcome {
    pub const SUCCESS_CODE: i64 = 2;
    pub const VERIFY_FAILURE_CODE: i64 = 5;
    pub const APPLY_FAILURE_CODE: i64 = 6;
    pub const MISSING_TAGS_CODE: i64 = 7;
    pub const MISMATCHED_TYPES_CODE: i64 = 8;

    /// Numeric result code reported on the wire.
    ///
    /// Local outcomes use the device result-code table; remote errors pass
    /// the peer's code through, so the two ranges may overlap.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Success => Self::SUCCESS_CODE,
            Self::VerifyFailure => Self::VERIFY_FAILURE_CODE,
            Self::ApplyFailure => Self::APPLY_FAILURE_CODE,
            Self::MissingTags => Self::MISSING_TAGS_CODE,
            Self::MismatchedTypes => Self::MISMATCHED_TYPES_CODE,
            Self::RemoteError(code) => code,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::VerifyFailure => "verify_failure",
            Self::MissingTags => "missing_tags",
            Self::MismatchedTypes => "mismatched_types",
            Self::ApplyFailure => "apply_failure",
            Self::RemoteError(_) => "remote_error",
        }
    }

    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Whether the outcome was decided locally (as opposed to by the peer).
    #[must_use]
    pub fn is_local(self) -> bool {
        !matches!(self, Self::RemoteError(_))
    }
}

impl fmt::Display for TransactionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteError(code) => write!(f, "remote error {code}"),
            other => f.write_str(&other.as_str().replace('_', " ")),
        }
    }
}

/// Whether a rollback put back every snapshotted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreStatus {
    Full,
    Partial,
}

/// Entry at which an apply stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub index: usize,
    pub tag: SmolStr,
    pub stage: FailureStage,
    pub reason: SmolStr,
}

/// Outcome plus the facts that explain it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    pub outcome: TransactionOutcome,
    /// Set only when a rollback ran.
    pub restore: Option<RestoreStatus>,
    /// Why verification failed.
    pub verify_error: Option<SmolStr>,
    /// Message accompanying a remote error.
    pub remote_message: Option<SmolStr>,
    /// Validation faults, in batch order.
    pub faults: Vec<EntryFault>,
    pub failed_entry: Option<FailedEntry>,
    /// Tags whose restore write failed.
    pub unrestored: Vec<SmolStr>,
    /// Entries written before the transaction ended.
    pub written: usize,
}

impl ProcessReport {
    fn new(outcome: TransactionOutcome) -> Self {
        Self {
            outcome,
            restore: None,
            verify_error: None,
            remote_message: None,
            faults: Vec::new(),
            failed_entry: None,
            unrestored: Vec::new(),
            written: 0,
        }
    }

    #[must_use]
    pub fn code(&self) -> i64 {
        self.outcome.code()
    }

    /// `Some(true)` when a rollback restored everything, `Some(false)` when
    /// it was partial, `None` when no rollback ran.
    #[must_use]
    pub fn fully_restored(&self) -> Option<bool> {
        self.restore.map(|status| status == RestoreStatus::Full)
    }

    /// One-line human readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.outcome {
            TransactionOutcome::Success => format!("success: {} tag(s) updated", self.written),
            TransactionOutcome::VerifyFailure => format!(
                "verify failure: {}",
                self.verify_error.as_deref().unwrap_or("unknown")
            ),
            TransactionOutcome::MissingTags => {
                let tags: Vec<&str> = self
                    .faults
                    .iter()
                    .filter(|fault| matches!(fault, EntryFault::Missing { .. }))
                    .map(EntryFault::tag)
                    .collect();
                format!("missing tags: {}", tags.join(", "))
            }
            TransactionOutcome::MismatchedTypes => {
                let tags: Vec<String> = self
                    .faults
                    .iter()
                    .filter_map(|fault| match fault {
                        EntryFault::Mismatch {
                            tag,
                            declared,
                            live,
                            ..
                        } => Some(format!("{tag} (declared {declared}, live {live})")),
                        EntryFault::Missing { .. } => None,
                    })
                    .collect();
                format!("mismatched types: {}", tags.join(", "))
            }
            TransactionOutcome::ApplyFailure => {
                let mut text = match &self.failed_entry {
                    Some(entry) => format!(
                        "apply failure at entry {} ('{}'): {}",
                        entry.index, entry.tag, entry.reason
                    ),
                    None => "apply failure".to_string(),
                };
                let restore = match self.restore {
                    Some(RestoreStatus::Full) => "fully restored".to_string(),
                    Some(RestoreStatus::Partial) => {
                        format!("partially restored (not restored: {})", self.unrestored.join(", "))
                    }
                    None => format!("not restored, {} entry(ies) left applied", self.written),
                };
                text.push_str("; ");
                text.push_str(&restore);
                text
            }
            TransactionOutcome::RemoteError(code) => format!(
                "remote error {code}: {}",
                self.remote_message.as_deref().unwrap_or("")
            ),
        }
    }

    /// JSON form relayed back over the transport.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = json!({
            "outcome": self.outcome.as_str(),
            "code": self.code(),
            "written": self.written,
        });
        if let Some(restore) = self.restore {
            value["restore"] = json!(restore);
            value["fullyRestored"] = json!(restore == RestoreStatus::Full);
        }
        if let Some(reason) = &self.verify_error {
            value["reason"] = json!(reason);
        }
        if let Some(message) = &self.remote_message {
            value["message"] = json!(message);
        }
        if !self.faults.is_empty() {
            value["faults"] = json!(self.faults);
        }
        if let Some(entry) = &self.failed_entry {
            value["failedEntry"] = json!(entry);
        }
        if !self.unrestored.is_empty() {
            value["unrestored"] = json!(self.unrestored);
        }
        value
    }
}

/// Terminal state reached by the processing stages.
#[derive(Debug)]
pub enum StageResult {
    /// Envelope verification failed; nothing else ran.
    Unverified(VerifyError),
    /// The peer returned an error payload.
    Remote(RemoteFault),
    /// The batch was rejected by validation; nothing was written.
    Rejected(BatchReport),
    /// The batch was applied (fully or up to a fault) without rollback.
    Applied(ApplyReport),
    /// The apply failed and a rollback ran.
    RolledBack(ApplyReport, RestoreReport),
}

/// Maps a terminal stage to exactly one outcome.
#[must_use]
pub fn classify(result: StageResult) -> ProcessReport {
    match result {
        StageResult::Unverified(error) => {
            let mut report = ProcessReport::new(TransactionOutcome::VerifyFailure);
            report.verify_error = Some(SmolStr::new(error.to_string()));
            report
        }
        StageResult::Remote(fault) => {
            let mut report = ProcessReport::new(TransactionOutcome::RemoteError(fault.code));
            report.remote_message = Some(fault.message);
            report
        }
        StageResult::Rejected(batch) => {
            // A rejected batch always has at least one fault.
            let outcome = batch
                .rejection()
                .unwrap_or(TransactionOutcome::VerifyFailure);
            let mut report = ProcessReport::new(outcome);
            report.faults = batch.faults;
            report
        }
        StageResult::Applied(apply) => applied_report(&apply),
        StageResult::RolledBack(apply, restore) => {
            let mut report = applied_report(&apply);
            report.restore = Some(restore.status());
            report.unrestored = restore
                .failed
                .iter()
                .map(|fault| SmolStr::new(fault.tag()))
                .collect();
            report
        }
    }
}

fn applied_report(apply: &ApplyReport) -> ProcessReport {
    let outcome = if apply.is_success() {
        TransactionOutcome::Success
    } else {
        TransactionOutcome::ApplyFailure
    };
    let mut report = ProcessReport::new(outcome);
    report.written = apply.written;
    report.failed_entry = apply.failure.as_ref().map(|failure| FailedEntry {
        index: failure.index,
        tag: failure.tag.clone(),
        stage: failure.stage,
        reason: SmolStr::new(failure.fault.to_string()),
    });
    report
}
