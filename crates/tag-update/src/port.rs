//! Tag I/O port interface.

use crate::error::IoFault;
use crate::value::{TagValue, ValueKind};

/// Point read/write access on the device.
///
/// A transaction assumes exclusive access to the points it touches for its
/// whole duration. Callers serialize transactions against one tag namespace.
pub trait TagPort {
    /// Reads the current value of a tag in the requested native kind.
    fn read(&mut self, name: &str, kind: ValueKind) -> Result<TagValue, IoFault>;

    /// Writes a native value to a tag.
    fn write(&mut self, name: &str, value: &TagValue) -> Result<(), IoFault>;
}

impl<P: TagPort + ?Sized> TagPort for &mut P {
    fn read(&mut self, name: &str, kind: ValueKind) -> Result<TagValue, IoFault> {
        (**self).read(name, kind)
    }

    fn write(&mut self, name: &str, value: &TagValue) -> Result<(), IoFault> {
        (**self).write(name, value)
    }
}
