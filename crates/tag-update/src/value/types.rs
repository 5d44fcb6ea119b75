use std::fmt;

use serde::{Deserialize, Serialize};

/// Live data type of a device tag, as reported by the metadata registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Boolean,
    Float,
    Integer,
    #[serde(alias = "unsigned_long")]
    DWord,
    String,
    IntegerMappedString,
}

impl DataType {
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Some(Self::Boolean),
            "float" | "real" => Some(Self::Float),
            "integer" | "int" => Some(Self::Integer),
            "dword" | "unsigned_long" => Some(Self::DWord),
            "string" => Some(Self::String),
            "integer_mapped_string" | "int_mapped_string" => Some(Self::IntegerMappedString),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Float => "float",
            Self::Integer => "integer",
            Self::DWord => "dword",
            Self::String => "string",
            Self::IntegerMappedString => "integer_mapped_string",
        }
    }

    /// Native value kind the device stores for this type.
    #[must_use]
    pub fn native_kind(self) -> ValueKind {
        match self {
            Self::Boolean | Self::Integer | Self::IntegerMappedString => ValueKind::Integer,
            Self::Float => ValueKind::Float,
            Self::DWord => ValueKind::DWord,
            Self::String => ValueKind::String,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type named by an update entry on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    Integer,
    Float,
    String,
    Boolean,
    #[serde(rename = "dword")]
    DWord,
}

impl DeclaredType {
    /// Parses the exact wire spelling (`integer`, `float`, `string`, `boolean`, `dword`).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            "dword" => Some(Self::DWord),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::DWord => "dword",
        }
    }

    /// Native kind used to read and write a point declared with this type.
    ///
    /// Booleans are stored by the device as integers 0/1.
    #[must_use]
    pub fn native_kind(self) -> ValueKind {
        match self {
            Self::Integer | Self::Boolean => ValueKind::Integer,
            Self::Float => ValueKind::Float,
            Self::String => ValueKind::String,
            Self::DWord => ValueKind::DWord,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Representation used by the tag I/O port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Integer,
    Float,
    #[serde(rename = "dword")]
    DWord,
    String,
}

impl ValueKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::DWord => "dword",
            Self::String => "string",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
