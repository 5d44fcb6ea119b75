//! Errors for configuration, decoding and point access.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

use crate::value::ValueKind;

/// Errors raised outside the transaction outcome path.
///
/// Transaction results are reported as [`crate::TransactionOutcome`] values;
/// this type covers loading, decoding and collaborator faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagUpdateError {
    /// Configuration error.
    #[error("invalid config '{0}'")]
    InvalidConfig(SmolStr),

    /// Envelope text or structure could not be decoded.
    #[error("invalid envelope '{0}'")]
    InvalidEnvelope(SmolStr),

    /// Tag name not known to the device.
    #[error("unknown tag '{0}'")]
    UnknownTag(SmolStr),
}

/// Faults reported by a [`crate::port::TagPort`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoFault {
    /// The point does not exist on the device.
    #[error("tag '{0}' not found")]
    NotFound(SmolStr),

    /// The device refused or failed the read.
    #[error("read of tag '{tag}' failed: {reason}")]
    ReadFailed { tag: SmolStr, reason: SmolStr },

    /// The device refused or failed the write.
    #[error("write of tag '{tag}' failed: {reason}")]
    WriteFailed { tag: SmolStr, reason: SmolStr },

    /// The value kind does not fit the point.
    #[error("tag '{tag}' does not accept {kind} values")]
    Rejected { tag: SmolStr, kind: ValueKind },
}

impl IoFault {
    /// Tag name the fault refers to.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::NotFound(tag)
            | Self::ReadFailed { tag, .. }
            | Self::WriteFailed { tag, .. }
            | Self::Rejected { tag, .. } => tag.as_str(),
        }
    }
}
