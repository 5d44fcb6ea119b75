//! Pre-write value snapshots for a single transaction.

#![allow(missing_docs)]

use indexmap::map::Entry;
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::value::{DeclaredType, TagValue};

/// Value of a tag as read before the transaction first wrote it.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupEntry {
    /// Native value read from the device.
    pub value: TagValue,
    /// Declared type of the entry that triggered the snapshot.
    pub declared: DeclaredType,
}

/// Per-transaction snapshot map.
///
/// Holds at most one entry per tag; the first snapshot of a tag is never
/// replaced, so it always reflects the value from before this transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupRecord {
    entries: IndexMap<SmolStr, BackupEntry>,
}

impl BackupRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the tag already has a snapshot.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// Stores a snapshot unless one exists. Returns `true` when stored.
    pub fn record(&mut self, tag: SmolStr, value: TagValue, declared: DeclaredType) -> bool {
        match self.entries.entry(tag) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(BackupEntry { value, declared });
                true
            }
        }
    }

    /// Drops a snapshot; returns it when one existed.
    pub fn discard(&mut self, tag: &str) -> Option<BackupEntry> {
        self.entries.shift_remove(tag)
    }

    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&BackupEntry> {
        self.entries.get(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &BackupEntry)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
