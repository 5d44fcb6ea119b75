//! Device configuration loading (`device.toml`).

#![allow(missing_docs)]

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::TagUpdateError;
use crate::value::{DataType, TagValue, ValueKind};

pub const DEFAULT_EXPECTED_ID: i64 = 1;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub service: ServiceConfig,
    pub tags: Vec<TagConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Envelope id accepted when the caller does not supply one.
    pub expected_id: i64,
    pub log_level: SmolStr,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            expected_id: DEFAULT_EXPECTED_ID,
            log_level: SmolStr::new(DEFAULT_LOG_LEVEL),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagConfig {
    pub id: u32,
    pub name: SmolStr,
    pub data_type: DataType,
    /// Initial native value.
    pub value: TagValue,
    pub fail_reads: bool,
    /// Successful writes before the point starts faulting (`None` = never).
    pub fail_writes_after: Option<u32>,
}

impl DeviceConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TagUpdateError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|err| TagUpdateError::InvalidConfig(format!("device.toml: {err}").into()))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, TagUpdateError> {
        let raw: DeviceToml = toml::from_str(text)
            .map_err(|err| TagUpdateError::InvalidConfig(format!("device.toml: {err}").into()))?;
        raw.into_config()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceToml {
    #[serde(default)]
    service: ServiceSection,
    #[serde(default)]
    tags: Vec<TagSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceSection {
    expected_id: Option<i64>,
    log_level: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TagSection {
    name: String,
    id: Option<u32>,
    #[serde(rename = "type")]
    data_type: String,
    value: Option<toml::Value>,
    #[serde(default)]
    fail_writes: bool,
    fail_writes_after: Option<u32>,
    #[serde(default)]
    fail_reads: bool,
}

impl DeviceToml {
    fn into_config(self) -> Result<DeviceConfig, TagUpdateError> {
        let service = ServiceConfig {
            expected_id: self.service.expected_id.unwrap_or(DEFAULT_EXPECTED_ID),
            log_level: parse_log_level(self.service.log_level.as_deref())?,
        };

        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        let mut next_id = 1_u32;
        let mut tags = Vec::with_capacity(self.tags.len());
        for section in self.tags {
            let name = SmolStr::new(section.name.trim());
            if name.is_empty() {
                return Err(TagUpdateError::InvalidConfig("tags.name must not be empty".into()));
            }
            if !names.insert(name.clone()) {
                return Err(TagUpdateError::InvalidConfig(
                    format!("duplicate tag name '{name}'").into(),
                ));
            }
            let id = match section.id {
                Some(id) => id,
                None => {
                    while ids.contains(&next_id) {
                        next_id += 1;
                    }
                    next_id
                }
            };
            if id == 0 || !ids.insert(id) {
                return Err(TagUpdateError::InvalidConfig(
                    format!("invalid or duplicate id {id} for tag '{name}'").into(),
                ));
            }
            let data_type = DataType::parse(&section.data_type).ok_or_else(|| {
                TagUpdateError::InvalidConfig(
                    format!("unknown type '{}' for tag '{name}'", section.data_type).into(),
                )
            })?;
            let value = match &section.value {
                Some(raw) => initial_value(data_type, raw).ok_or_else(|| {
                    TagUpdateError::InvalidConfig(
                        format!("value {raw} does not fit {data_type} tag '{name}'").into(),
                    )
                })?,
                None => TagValue::zero(data_type.native_kind()),
            };
            if section.fail_writes && section.fail_writes_after.is_some() {
                return Err(TagUpdateError::InvalidConfig(
                    format!("tag '{name}' sets both fail_writes and fail_writes_after").into(),
                ));
            }
            let fail_writes_after = if section.fail_writes {
                Some(0)
            } else {
                section.fail_writes_after
            };
            tags.push(TagConfig {
                id,
                name,
                data_type,
                value,
                fail_reads: section.fail_reads,
                fail_writes_after,
            });
        }

        Ok(DeviceConfig { service, tags })
    }
}

fn parse_log_level(text: Option<&str>) -> Result<SmolStr, TagUpdateError> {
    let Some(text) = text else {
        return Ok(SmolStr::new(DEFAULT_LOG_LEVEL));
    };
    let level = text.trim().to_ascii_lowercase();
    match level.as_str() {
        "error" | "warn" | "info" | "debug" | "trace" => Ok(SmolStr::new(level)),
        _ => Err(TagUpdateError::InvalidConfig(
            format!("invalid service.log_level '{text}'").into(),
        )),
    }
}

/// Converts a TOML initial value into the native value of `data_type`.
fn initial_value(data_type: DataType, raw: &toml::Value) -> Option<TagValue> {
    match (data_type, raw) {
        (DataType::Boolean, toml::Value::Boolean(flag)) => Some(TagValue::Integer(i32::from(*flag))),
        (DataType::Boolean, toml::Value::Integer(value @ (0 | 1))) => {
            i32::try_from(*value).ok().map(TagValue::Integer)
        }
        (DataType::Boolean, _) => None,
        (_, raw) => match (data_type.native_kind(), raw) {
            (ValueKind::Integer, toml::Value::Integer(value)) => {
                i32::try_from(*value).ok().map(TagValue::Integer)
            }
            (ValueKind::DWord, toml::Value::Integer(value)) => {
                u32::try_from(*value).ok().map(TagValue::DWord)
            }
            (ValueKind::Float, toml::Value::Float(value)) => Some(TagValue::Float(*value)),
            #[allow(clippy::cast_precision_loss)]
            (ValueKind::Float, toml::Value::Integer(value)) => Some(TagValue::Float(*value as f64)),
            (ValueKind::String, toml::Value::String(text)) => {
                Some(TagValue::String(SmolStr::new(text)))
            }
            _ => None,
        },
    }
}
