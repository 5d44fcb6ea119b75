//! In-memory simulated device.

#![allow(missing_docs)]

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::debug;

use crate::config::DeviceConfig;
use crate::error::{IoFault, TagUpdateError};
use crate::port::TagPort;
use crate::registry::{TagInfo, TagRegistry};
use crate::value::{DataType, TagValue, ValueKind};

/// Simulated point with optional fault injection.
#[derive(Debug, Clone, PartialEq)]
pub struct SimTag {
    pub info: TagInfo,
    pub value: TagValue,
    pub fail_reads: bool,
    /// Successful writes left before the point starts faulting (`None` = never).
    pub fail_writes_after: Option<u32>,
}

/// Journal entry for a write accepted by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub tag: SmolStr,
    pub value: TagValue,
}

/// Tag store acting as both metadata registry and I/O port.
#[derive(Debug, Default, Clone)]
pub struct MemoryTagStore {
    tags: IndexMap<SmolStr, SimTag>,
    next_id: u32,
    reads: u32,
    write_attempts: u32,
    journal: Vec<WriteRecord>,
}

impl MemoryTagStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Builds a store from a device configuration.
    pub fn from_config(config: &DeviceConfig) -> Result<Self, TagUpdateError> {
        let mut store = Self::new();
        for tag in &config.tags {
            store.insert_with_id(tag.id, tag.name.clone(), tag.data_type, tag.value.clone())?;
            if let Some(entry) = store.tags.get_mut(&tag.name) {
                entry.fail_reads = tag.fail_reads;
                entry.fail_writes_after = tag.fail_writes_after;
            }
        }
        Ok(store)
    }

    /// Adds a tag with the next free id and returns that id.
    pub fn insert(
        &mut self,
        name: impl Into<SmolStr>,
        data_type: DataType,
        value: impl Into<TagValue>,
    ) -> Result<u32, TagUpdateError> {
        let id = self.next_free_id();
        self.insert_with_id(id, name.into(), data_type, value.into())?;
        Ok(id)
    }

    /// Adds a tag with an explicit id.
    pub fn insert_with_id(
        &mut self,
        id: u32,
        name: SmolStr,
        data_type: DataType,
        value: TagValue,
    ) -> Result<(), TagUpdateError> {
        if self.tags.contains_key(&name) {
            return Err(TagUpdateError::InvalidConfig(
                format!("duplicate tag name '{name}'").into(),
            ));
        }
        if self.tags.values().any(|tag| tag.info.id == id) {
            return Err(TagUpdateError::InvalidConfig(
                format!("duplicate tag id {id} ('{name}')").into(),
            ));
        }
        check_value(&name, data_type, &value).map_err(|err| {
            TagUpdateError::InvalidConfig(format!("initial value: {err}").into())
        })?;
        self.next_id = self.next_id.max(id.saturating_add(1));
        self.tags.insert(
            name.clone(),
            SimTag {
                info: TagInfo {
                    id,
                    name,
                    data_type,
                },
                value,
                fail_reads: false,
                fail_writes_after: None,
            },
        );
        Ok(())
    }

    /// Makes every write to the tag fail (or succeed again).
    pub fn set_fail_writes(&mut self, name: &str, fail: bool) -> Result<(), TagUpdateError> {
        self.tag_mut(name)?.fail_writes_after = fail.then_some(0);
        Ok(())
    }

    /// Lets `count` more writes succeed, then fails every later write.
    pub fn set_fail_writes_after(&mut self, name: &str, count: u32) -> Result<(), TagUpdateError> {
        self.tag_mut(name)?.fail_writes_after = Some(count);
        Ok(())
    }

    pub fn set_fail_reads(&mut self, name: &str, fail: bool) -> Result<(), TagUpdateError> {
        self.tag_mut(name)?.fail_reads = fail;
        Ok(())
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&TagValue> {
        self.tags.get(name).map(|tag| &tag.value)
    }

    pub fn tags(&self) -> impl Iterator<Item = &SimTag> {
        self.tags.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Number of reads served, including faulted ones.
    #[must_use]
    pub fn read_count(&self) -> u32 {
        self.reads
    }

    /// Number of writes attempted, including faulted ones.
    #[must_use]
    pub fn write_attempts(&self) -> u32 {
        self.write_attempts
    }

    /// Writes accepted by the store, in order.
    #[must_use]
    pub fn journal(&self) -> &[WriteRecord] {
        &self.journal
    }

    fn tag_mut(&mut self, name: &str) -> Result<&mut SimTag, TagUpdateError> {
        self.tags
            .get_mut(name)
            .ok_or_else(|| TagUpdateError::UnknownTag(SmolStr::new(name)))
    }

    fn next_free_id(&self) -> u32 {
        let mut id = self.next_id.max(1);
        while self.tags.values().any(|tag| tag.info.id == id) {
            id += 1;
        }
        id
    }
}

impl TagRegistry for MemoryTagStore {
    fn lookup(&self, name: &str) -> Option<TagInfo> {
        self.tags.get(name).map(|tag| tag.info.clone())
    }
}

impl TagPort for MemoryTagStore {
    fn read(&mut self, name: &str, kind: ValueKind) -> Result<TagValue, IoFault> {
        self.reads += 1;
        let tag = self
            .tags
            .get(name)
            .ok_or_else(|| IoFault::NotFound(SmolStr::new(name)))?;
        if tag.fail_reads {
            return Err(IoFault::ReadFailed {
                tag: tag.info.name.clone(),
                reason: "simulated fault".into(),
            });
        }
        if tag.info.data_type.native_kind() != kind {
            return Err(IoFault::Rejected {
                tag: tag.info.name.clone(),
                kind,
            });
        }
        Ok(tag.value.clone())
    }

    fn write(&mut self, name: &str, value: &TagValue) -> Result<(), IoFault> {
        self.write_attempts += 1;
        let tag = self
            .tags
            .get_mut(name)
            .ok_or_else(|| IoFault::NotFound(SmolStr::new(name)))?;
        if tag.fail_writes_after == Some(0) {
            return Err(IoFault::WriteFailed {
                tag: tag.info.name.clone(),
                reason: "simulated fault".into(),
            });
        }
        check_value(&tag.info.name, tag.info.data_type, value)?;
        if let Some(left) = tag.fail_writes_after.as_mut() {
            *left -= 1;
        }
        debug!("sim write {} = {}", tag.info.name, value);
        tag.value = value.clone();
        self.journal.push(WriteRecord {
            tag: tag.info.name.clone(),
            value: value.clone(),
        });
        Ok(())
    }
}

fn check_value(name: &SmolStr, data_type: DataType, value: &TagValue) -> Result<(), IoFault> {
    if value.kind() != data_type.native_kind() {
        return Err(IoFault::Rejected {
            tag: name.clone(),
            kind: value.kind(),
        });
    }
    if data_type == DataType::Boolean && !matches!(value, TagValue::Integer(0 | 1)) {
        return Err(IoFault::WriteFailed {
            tag: name.clone(),
            reason: format!("boolean tag cannot hold {value}").into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_assigned_sequentially() {
        let mut store = MemoryTagStore::new();
        assert_eq!(store.insert("A", DataType::Integer, 0).unwrap(), 1);
        assert_eq!(store.insert("B", DataType::Float, 0.0).unwrap(), 2);
        assert_eq!(store.lookup("B").unwrap().data_type, DataType::Float);
        assert!(store.lookup("C").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut store = MemoryTagStore::new();
        store.insert("A", DataType::Integer, 0).unwrap();
        let err = store.insert("A", DataType::Integer, 0).unwrap_err();
        assert!(matches!(err, TagUpdateError::InvalidConfig(_)));
    }

    #[test]
    fn boolean_points_hold_only_zero_or_one() {
        let mut store = MemoryTagStore::new();
        store.insert("B", DataType::Boolean, 0).unwrap();
        store.write("B", &TagValue::Integer(1)).unwrap();
        assert!(store.write("B", &TagValue::Integer(2)).is_err());
        assert_eq!(store.value("B"), Some(&TagValue::Integer(1)));
    }

    #[test]
    fn write_budget_counts_down_then_faults() {
        let mut store = MemoryTagStore::new();
        store.insert("A", DataType::Integer, 0).unwrap();
        store.set_fail_writes_after("A", 1).unwrap();
        store.write("A", &TagValue::Integer(5)).unwrap();
        let err = store.write("A", &TagValue::Integer(6)).unwrap_err();
        assert!(matches!(err, IoFault::WriteFailed { .. }));
        assert_eq!(store.value("A"), Some(&TagValue::Integer(5)));
        assert_eq!(store.write_attempts(), 2);
        assert_eq!(store.journal().len(), 1);
    }

    #[test]
    fn reads_check_the_native_kind() {
        let mut store = MemoryTagStore::new();
        store.insert("F", DataType::Float, 1.5).unwrap();
        assert_eq!(store.read("F", ValueKind::Float).unwrap(), TagValue::Float(1.5));
        assert!(matches!(
            store.read("F", ValueKind::Integer),
            Err(IoFault::Rejected { .. })
        ));
    }
}
