//! Tag metadata registry interface.

use smol_str::SmolStr;

use crate::value::DataType;

/// Metadata for one device tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    /// Device-assigned tag id.
    pub id: u32,
    /// Unique tag name.
    pub name: SmolStr,
    /// Live data type.
    pub data_type: DataType,
}

/// Read-only view of the device tag metadata.
///
/// Construction and refresh of the metadata belong to the implementor.
pub trait TagRegistry {
    /// Resolves a tag by name.
    fn lookup(&self, name: &str) -> Option<TagInfo>;
}

impl<R: TagRegistry + ?Sized> TagRegistry for &R {
    fn lookup(&self, name: &str) -> Option<TagInfo> {
        (**self).lookup(name)
    }
}

impl<R: TagRegistry + ?Sized> TagRegistry for &mut R {
    fn lookup(&self, name: &str) -> Option<TagInfo> {
        (**self).lookup(name)
    }
}
