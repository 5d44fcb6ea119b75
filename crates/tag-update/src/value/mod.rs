//! Tag data types, update values and device-native values.

#![allow(missing_docs)]

mod compat;
mod types;
mod values;

pub use types::*;
pub use values::*;
