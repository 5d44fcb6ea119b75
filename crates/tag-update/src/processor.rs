//! End-to-end processing of a tag update envelope.
//!
//! Envelope verification, then batch validation, then the ordered apply, then
//! (on failure, when requested) the rollback. Each stage runs only when the
//! previous one passed; the classifier turns the terminal stage into one
//! [`ProcessReport`].
//!
//! Processing is synchronous and assumes exclusive access to the device for
//! the duration of one envelope. Callers must not run two transactions
//! against the same tags at once.

use tracing::{debug, info, warn};

use crate::apply::apply_batch;
use crate::envelope::{self, Envelope, Payload, UpdateBatch, VerifyError};
use crate::error::IoFault;
use crate::outcome::{classify, ProcessReport, StageResult};
use crate::port::TagPort;
use crate::registry::{TagInfo, TagRegistry};
use crate::rollback::restore;
use crate::validate::validate_batch;
use crate::value::{TagValue, ValueKind};

/// Separate registry and port presented as one device.
#[derive(Debug, Clone, Default)]
pub struct DeviceHandles<R, P> {
    /// Metadata registry.
    pub registry: R,
    /// Point I/O port.
    pub port: P,
}

impl<R: TagRegistry, P> TagRegistry for DeviceHandles<R, P> {
    fn lookup(&self, name: &str) -> Option<TagInfo> {
        self.registry.lookup(name)
    }
}

impl<R, P: TagPort> TagPort for DeviceHandles<R, P> {
    fn read(&mut self, name: &str, kind: ValueKind) -> Result<TagValue, IoFault> {
        self.port.read(name, kind)
    }

    fn write(&mut self, name: &str, value: &TagValue) -> Result<(), IoFault> {
        self.port.write(name, value)
    }
}

/// Tag update transaction processor bound to one device.
#[derive(Debug)]
pub struct TagUpdateProcessor<D> {
    device: D,
}

impl<D> TagUpdateProcessor<D>
where
    D: TagRegistry + TagPort,
{
    /// Creates a processor over a device (or `&mut` device).
    pub fn new(device: D) -> Self {
        Self { device }
    }

    /// Returns the device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Returns the device mutably, e.g. to inject faults between envelopes.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Consumes the processor and hands back the device.
    pub fn into_inner(self) -> D {
        self.device
    }

    /// Processes a decoded envelope expected to carry `expected_id`.
    pub fn process(&mut self, envelope: &Envelope, expected_id: i64) -> ProcessReport {
        let report = match envelope::verify(envelope, expected_id) {
            Err(error) => {
                warn!("tag update response will not be processed: {error}");
                classify(StageResult::Unverified(error))
            }
            Ok(Payload::Remote(fault)) => {
                warn!(
                    "tag update response returned an error ({}): {}",
                    fault.code, fault.message
                );
                classify(StageResult::Remote(fault))
            }
            Ok(Payload::Updates(batch)) => self.run_batch(&batch),
        };
        log_report(&report);
        report
    }

    /// Decodes JSON text and processes it; undecodable text is a verify failure.
    pub fn process_json(&mut self, text: &str, expected_id: i64) -> ProcessReport {
        match Envelope::parse(text) {
            Ok(envelope) => self.process(&envelope, expected_id),
            Err(err) => {
                let error = VerifyError::InvalidJson(err.to_string().into());
                warn!("tag update response will not be processed: {error}");
                let report = classify(StageResult::Unverified(error));
                log_report(&report);
                report
            }
        }
    }

    /// Processes a bare result body, without envelope id/version checks.
    pub fn process_body(&mut self, body: &serde_json::Value) -> ProcessReport {
        let report = match envelope::decode_body(body) {
            Ok(batch) => self.run_batch(&batch),
            Err(error) => {
                warn!("tag update body will not be processed: {error}");
                classify(StageResult::Unverified(error))
            }
        };
        log_report(&report);
        report
    }

    /// Validates and applies an already decoded batch.
    pub fn process_batch(&mut self, batch: &UpdateBatch) -> ProcessReport {
        let report = self.run_batch(batch);
        log_report(&report);
        report
    }

    /// Runs verification and validation only; nothing is read or written.
    ///
    /// A batch that would be applied reports `Success` with zero writes.
    pub fn check(&self, envelope: &Envelope, expected_id: i64) -> ProcessReport {
        let report = match envelope::verify(envelope, expected_id) {
            Err(error) => {
                warn!("tag update response would not be processed: {error}");
                classify(StageResult::Unverified(error))
            }
            Ok(Payload::Remote(fault)) => classify(StageResult::Remote(fault)),
            Ok(Payload::Updates(batch)) => {
                let validation = validate_batch(&batch, &self.device);
                if validation.is_valid() {
                    debug!("dry run: {} tag update(s) would be applied", batch.len());
                    classify(StageResult::Applied(Default::default()))
                } else {
                    classify(StageResult::Rejected(validation))
                }
            }
        };
        log_report(&report);
        report
    }

    /// [`Self::check`] on JSON text.
    pub fn check_json(&self, text: &str, expected_id: i64) -> ProcessReport {
        match Envelope::parse(text) {
            Ok(envelope) => self.check(&envelope, expected_id),
            Err(err) => {
                let error = VerifyError::InvalidJson(err.to_string().into());
                warn!("tag update response would not be processed: {error}");
                let report = classify(StageResult::Unverified(error));
                log_report(&report);
                report
            }
        }
    }

    fn run_batch(&mut self, batch: &UpdateBatch) -> ProcessReport {
        let validation = validate_batch(batch, &self.device);
        if !validation.is_valid() {
            return classify(StageResult::Rejected(validation));
        }

        let mut applied = apply_batch(batch, &mut self.device);
        if applied.is_success() {
            return classify(StageResult::Applied(applied));
        }

        match applied.backup.take() {
            Some(backup) if batch.restore_on_failure => {
                let restored = restore(backup, &mut self.device);
                classify(StageResult::RolledBack(applied, restored))
            }
            _ => classify(StageResult::Applied(applied)),
        }
    }
}

fn log_report(report: &ProcessReport) {
    if report.outcome.is_success() {
        info!("tag update processed: {}", report.summary());
    } else {
        warn!(
            "tag update failed (code {}): {}",
            report.code(),
            report.summary()
        );
    }
}
