//! Inbound envelope decoding and verification.
//!
//! An envelope is a JSON-RPC 2.0 style response carrying either a batch of
//! tag updates (`result`) or a peer-reported failure (`error`):
//!
//! ```json
//! { "id": 1, "jsonrpc": "2.0",
//!   "result": { "restorePreviousTagValuesOnUpdateFailure": true,
//!               "tagUpdates": [ { "name": "T1", "type": "integer", "value": 5 } ] } }
//! ```
//!
//! [`verify`] checks the id, protocol version and payload shape and decodes the
//! payload into typed values. It never consults the registry or the device.

#![allow(missing_docs)]

use serde::Deserialize;
use smol_str::SmolStr;
use thiserror::Error;

use crate::error::TagUpdateError;
use crate::value::{DeclaredType, UpdateValue};

/// The one supported protocol version string.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Envelope as received, before verification.
///
/// Every field is optional so that any JSON object decodes; shape problems
/// are reported by [`verify`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default, rename = "jsonrpc")]
    pub protocol_version: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl Envelope {
    /// Decodes an envelope from JSON text.
    pub fn parse(text: &str) -> Result<Self, TagUpdateError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|err| TagUpdateError::InvalidEnvelope(err.to_string().into()))?;
        Self::from_value(value)
    }

    /// Decodes an envelope from an already parsed JSON value.
    ///
    /// Only a JSON object is an envelope; derived struct decoding would
    /// otherwise accept an array in field order.
    pub fn from_value(value: serde_json::Value) -> Result<Self, TagUpdateError> {
        if !value.is_object() {
            return Err(TagUpdateError::InvalidEnvelope(
                format!("expected an object, got {}", json_kind(&value)).into(),
            ));
        }
        serde_json::from_value(value)
            .map_err(|err| TagUpdateError::InvalidEnvelope(err.to_string().into()))
    }
}

/// One requested tag change.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateEntry {
    pub tag_name: SmolStr,
    pub value: UpdateValue,
}

impl UpdateEntry {
    pub fn new(tag_name: impl Into<SmolStr>, value: UpdateValue) -> Self {
        Self {
            tag_name: tag_name.into(),
            value,
        }
    }

    #[must_use]
    pub fn declared_type(&self) -> DeclaredType {
        self.value.declared_type()
    }
}

/// Ordered batch of updates; order is both apply order and snapshot order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBatch {
    pub entries: Vec<UpdateEntry>,
    pub restore_on_failure: bool,
}

impl UpdateBatch {
    #[must_use]
    pub fn new(entries: Vec<UpdateEntry>) -> Self {
        Self {
            entries,
            restore_on_failure: false,
        }
    }

    #[must_use]
    pub fn with_restore(mut self, restore_on_failure: bool) -> Self {
        self.restore_on_failure = restore_on_failure;
        self
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

/// Failure reported by the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFault {
    pub code: i64,
    pub message: SmolStr,
}

/// Verified envelope payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Updates(UpdateBatch),
    Remote(RemoteFault),
}

/// Reasons an envelope fails verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("invalid json: {0}")]
    InvalidJson(SmolStr),

    #[error("missing or mismatched id (expected {expected}, got {got})")]
    IdMismatch { expected: i64, got: SmolStr },

    #[error("missing or mismatched protocol version (expected 2.0, got {got})")]
    VersionMismatch { got: SmolStr },

    #[error("envelope has neither a result nor an error")]
    MissingPayload,

    #[error("envelope has both a result and an error")]
    ConflictingPayload,

    #[error("malformed result: {0}")]
    MalformedBody(SmolStr),

    #[error("result has no tagUpdates")]
    MissingTagUpdates,

    #[error("tag update {index} is missing '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("tag update {index} has unknown type '{kind}'")]
    UnknownType { index: usize, kind: SmolStr },

    #[error("tag update {index} ('{tag}') value does not fit type {declared}")]
    InvalidValue {
        index: usize,
        tag: SmolStr,
        declared: DeclaredType,
    },

    #[error("malformed error: {0}")]
    MalformedError(SmolStr),

    #[error("error has no code")]
    MissingErrorCode,
}

/// Verifies an envelope against the expected id and decodes its payload.
pub fn verify(envelope: &Envelope, expected_id: i64) -> Result<Payload, VerifyError> {
    let id = envelope.id.as_ref().and_then(serde_json::Value::as_i64);
    if id != Some(expected_id) {
        return Err(VerifyError::IdMismatch {
            expected: expected_id,
            got: describe(envelope.id.as_ref()),
        });
    }

    let version = envelope
        .protocol_version
        .as_ref()
        .and_then(serde_json::Value::as_str);
    if version != Some(PROTOCOL_VERSION) {
        return Err(VerifyError::VersionMismatch {
            got: describe(envelope.protocol_version.as_ref()),
        });
    }

    match (&envelope.result, &envelope.error) {
        (Some(body), None) => decode_body(body).map(Payload::Updates),
        (None, Some(error)) => decode_error(error).map(Payload::Remote),
        (Some(_), Some(_)) => Err(VerifyError::ConflictingPayload),
        (None, None) => Err(VerifyError::MissingPayload),
    }
}

#[derive(Debug, Deserialize)]
struct RawBody {
    #[serde(default, rename = "restorePreviousTagValuesOnUpdateFailure")]
    restore_on_failure: bool,
    #[serde(default, rename = "tagUpdates")]
    tag_updates: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawError {
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Decodes a bare result body (`restorePreviousTagValuesOnUpdateFailure`,
/// `tagUpdates`) into a typed batch.
pub fn decode_body(body: &serde_json::Value) -> Result<UpdateBatch, VerifyError> {
    if !body.is_object() {
        return Err(VerifyError::MalformedBody(
            format!("result must be an object, got {}", json_kind(body)).into(),
        ));
    }
    let raw: RawBody = serde_json::from_value(body.clone())
        .map_err(|err| VerifyError::MalformedBody(err.to_string().into()))?;
    let raw_entries = raw.tag_updates.ok_or(VerifyError::MissingTagUpdates)?;

    let mut entries = Vec::with_capacity(raw_entries.len());
    for (index, raw_entry) in raw_entries.into_iter().enumerate() {
        if !raw_entry.is_object() {
            return Err(VerifyError::MalformedBody(
                format!("tag update {index} must be an object, got {}", json_kind(&raw_entry))
                    .into(),
            ));
        }
        let raw_entry: RawEntry = serde_json::from_value(raw_entry)
            .map_err(|err| VerifyError::MalformedBody(format!("tag update {index}: {err}").into()))?;
        let name = raw_entry
            .name
            .ok_or(VerifyError::MissingField { index, field: "name" })?;
        let kind = raw_entry
            .kind
            .ok_or(VerifyError::MissingField { index, field: "type" })?;
        let value = raw_entry
            .value
            .ok_or(VerifyError::MissingField { index, field: "value" })?;
        let declared = DeclaredType::parse(&kind).ok_or_else(|| VerifyError::UnknownType {
            index,
            kind: kind.into(),
        })?;
        let value =
            UpdateValue::from_json(declared, &value).ok_or_else(|| VerifyError::InvalidValue {
                index,
                tag: SmolStr::new(&name),
                declared,
            })?;
        entries.push(UpdateEntry::new(name, value));
    }

    Ok(UpdateBatch {
        entries,
        restore_on_failure: raw.restore_on_failure,
    })
}

fn decode_error(error: &serde_json::Value) -> Result<RemoteFault, VerifyError> {
    if !error.is_object() {
        return Err(VerifyError::MalformedError(
            format!("error must be an object, got {}", json_kind(error)).into(),
        ));
    }
    let raw: RawError = serde_json::from_value(error.clone())
        .map_err(|err| VerifyError::MalformedError(err.to_string().into()))?;
    let code = raw
        .code
        .as_ref()
        .ok_or(VerifyError::MissingErrorCode)?
        .as_i64()
        .ok_or_else(|| VerifyError::MalformedError("code is not an integer".into()))?;
    Ok(RemoteFault {
        code,
        message: raw.message.map(SmolStr::from).unwrap_or_default(),
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn describe(value: Option<&serde_json::Value>) -> SmolStr {
    match value {
        None => SmolStr::new_inline("<missing>"),
        Some(value) => SmolStr::new(value.to_string()),
    }
}
