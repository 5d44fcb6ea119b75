//! Batch validation against live tag metadata.

#![allow(missing_docs)]

use serde::Serialize;
use smol_str::SmolStr;
use tracing::warn;

use crate::envelope::UpdateBatch;
use crate::outcome::TransactionOutcome;
use crate::registry::TagRegistry;
use crate::value::{DataType, DeclaredType};

/// Problem found with a single batch entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "fault", rename_all = "snake_case")]
pub enum EntryFault {
    Missing {
        index: usize,
        tag: SmolStr,
    },
    Mismatch {
        index: usize,
        tag: SmolStr,
        declared: DeclaredType,
        live: DataType,
    },
}

impl EntryFault {
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Missing { index, .. } | Self::Mismatch { index, .. } => *index,
        }
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Missing { tag, .. } | Self::Mismatch { tag, .. } => tag.as_str(),
        }
    }
}

/// Result of scanning a whole batch.
///
/// Every entry is checked even after the first fault so one report covers the
/// whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub faults: Vec<EntryFault>,
}

impl BatchReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.faults.is_empty()
    }

    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.faults
            .iter()
            .filter(|fault| matches!(fault, EntryFault::Missing { .. }))
            .count()
    }

    #[must_use]
    pub fn mismatch_count(&self) -> usize {
        self.faults
            .iter()
            .filter(|fault| matches!(fault, EntryFault::Mismatch { .. }))
            .count()
    }

    /// Outcome when the batch is rejected; missing tags take precedence over
    /// type mismatches.
    #[must_use]
    pub fn rejection(&self) -> Option<TransactionOutcome> {
        if self.missing_count() > 0 {
            Some(TransactionOutcome::MissingTags)
        } else if self.mismatch_count() > 0 {
            Some(TransactionOutcome::MismatchedTypes)
        } else {
            None
        }
    }
}

/// Checks every entry for existence and type compatibility.
pub fn validate_batch<R: TagRegistry + ?Sized>(batch: &UpdateBatch, registry: &R) -> BatchReport {
    let mut report = BatchReport::default();
    for (index, entry) in batch.entries.iter().enumerate() {
        let Some(info) = registry.lookup(entry.tag_name.as_str()) else {
            warn!(
                "tag update references tag '{}' that does not exist",
                entry.tag_name
            );
            report.faults.push(EntryFault::Missing {
                index,
                tag: entry.tag_name.clone(),
            });
            continue;
        };
        let declared = entry.declared_type();
        if !declared.accepts(info.data_type) {
            warn!(
                "tag update for '{}' declares {} but the tag is {}",
                entry.tag_name, declared, info.data_type
            );
            report.faults.push(EntryFault::Mismatch {
                index,
                tag: entry.tag_name.clone(),
                declared,
                live: info.data_type,
            });
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::UpdateEntry;
    use crate::store::MemoryTagStore;
    use crate::value::UpdateValue;

    fn registry() -> MemoryTagStore {
        let mut store = MemoryTagStore::new();
        store.insert("I", DataType::Integer, 0).unwrap();
        store.insert("M", DataType::IntegerMappedString, 0).unwrap();
        store.insert("F", DataType::Float, 0.0).unwrap();
        store
    }

    #[test]
    fn scan_continues_past_first_fault() {
        let batch = UpdateBatch::new(vec![
            UpdateEntry::new("nope", UpdateValue::Integer(1)),
            UpdateEntry::new("F", UpdateValue::Integer(1)),
            UpdateEntry::new("gone", UpdateValue::Float(1.0)),
            UpdateEntry::new("I", UpdateValue::Integer(1)),
        ]);
        let report = validate_batch(&batch, &registry());
        let indices: Vec<_> = report.faults.iter().map(EntryFault::index).collect();
        assert_eq!(indices, [0, 1, 2]);
        assert_eq!(report.missing_count(), 2);
        assert_eq!(report.mismatch_count(), 1);
        assert_eq!(report.rejection(), Some(TransactionOutcome::MissingTags));
    }

    #[test]
    fn mismatch_only_batch_is_rejected_as_mismatch() {
        let batch = UpdateBatch::new(vec![
            UpdateEntry::new("I", UpdateValue::Integer(1)),
            UpdateEntry::new("F", UpdateValue::DWord(1)),
        ]);
        let report = validate_batch(&batch, &registry());
        assert_eq!(report.rejection(), Some(TransactionOutcome::MismatchedTypes));
    }

    #[test]
    fn integer_updates_integer_mapped_string() {
        let batch = UpdateBatch::new(vec![UpdateEntry::new("M", UpdateValue::Integer(3))]);
        let report = validate_batch(&batch, &registry());
        assert!(report.is_valid());
        assert_eq!(report.rejection(), None);
    }
}
