use std::fmt;

use serde::Serialize;
use smol_str::SmolStr;

use super::{DeclaredType, ValueKind};

/// Value carried by an update entry, tagged by its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateValue {
    Integer(i32),
    Float(f64),
    String(SmolStr),
    Boolean(bool),
    DWord(u32),
}

impl UpdateValue {
    #[must_use]
    pub fn declared_type(&self) -> DeclaredType {
        match self {
            Self::Integer(_) => DeclaredType::Integer,
            Self::Float(_) => DeclaredType::Float,
            Self::String(_) => DeclaredType::String,
            Self::Boolean(_) => DeclaredType::Boolean,
            Self::DWord(_) => DeclaredType::DWord,
        }
    }

    /// Converts to the representation written to the device.
    #[must_use]
    pub fn to_native(&self) -> TagValue {
        match self {
            Self::Integer(value) => TagValue::Integer(*value),
            Self::Float(value) => TagValue::Float(*value),
            Self::String(value) => TagValue::String(value.clone()),
            Self::Boolean(value) => TagValue::Integer(i32::from(*value)),
            Self::DWord(value) => TagValue::DWord(*value),
        }
    }

    /// Decodes a JSON value for the declared type.
    ///
    /// Returns `None` when the JSON value does not fit: integers must fit in
    /// 32 bits, dwords in an unsigned 32-bit range, booleans and strings must
    /// use their JSON kinds.
    #[must_use]
    pub fn from_json(declared: DeclaredType, value: &serde_json::Value) -> Option<Self> {
        let parsed = match (declared, value) {
            (DeclaredType::Integer, serde_json::Value::Number(number)) => {
                Self::Integer(i32::try_from(number.as_i64()?).ok()?)
            }
            (DeclaredType::Float, serde_json::Value::Number(number)) => {
                Self::Float(number.as_f64()?)
            }
            (DeclaredType::DWord, serde_json::Value::Number(number)) => {
                Self::DWord(u32::try_from(number.as_u64()?).ok()?)
            }
            (DeclaredType::Boolean, serde_json::Value::Bool(flag)) => Self::Boolean(*flag),
            (DeclaredType::String, serde_json::Value::String(text)) => {
                Self::String(SmolStr::new(text))
            }
            _ => return None,
        };
        Some(parsed)
    }
}

impl fmt::Display for UpdateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::DWord(value) => write!(f, "{value}"),
        }
    }
}

/// Device-native point value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    Integer(i32),
    Float(f64),
    DWord(u32),
    String(SmolStr),
}

impl TagValue {
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::DWord(_) => ValueKind::DWord,
            Self::String(_) => ValueKind::String,
        }
    }

    /// Zero value of the given kind.
    #[must_use]
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Integer => Self::Integer(0),
            ValueKind::Float => Self::Float(0.0),
            ValueKind::DWord => Self::DWord(0),
            ValueKind::String => Self::String(SmolStr::default()),
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::DWord(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<i32> for TagValue {
    fn from(value: i32) -> Self {
        TagValue::Integer(value)
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::Float(value)
    }
}

impl From<u32> for TagValue {
    fn from(value: u32) -> Self {
        TagValue::DWord(value)
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::String(SmolStr::new(value))
    }
}
