use std::cell::Cell;

use serde_json::json;
use tag_update::envelope::Envelope;
use tag_update::error::IoFault;
use tag_update::port::TagPort;
use tag_update::registry::{TagInfo, TagRegistry};
use tag_update::store::MemoryTagStore;
use tag_update::value::{DataType, TagValue, ValueKind};
use tag_update::{RestoreStatus, TagUpdateProcessor, TransactionOutcome};

struct CountingDevice {
    store: MemoryTagStore,
    lookups: Cell<u32>,
    reads: u32,
    writes: Vec<String>,
    /// Fails only the n-th write (1-based) to the named tag.
    fail_nth_write: Option<(&'static str, usize)>,
}

impl CountingDevice {
    fn new(store: MemoryTagStore) -> Self {
        Self {
            store,
            lookups: Cell::new(0),
            reads: 0,
            writes: Vec::new(),
            fail_nth_write: None,
        }
    }
}

impl TagRegistry for CountingDevice {
    fn lookup(&self, name: &str) -> Option<TagInfo> {
        self.lookups.set(self.lookups.get() + 1);
        self.store.lookup(name)
    }
}

impl TagPort for CountingDevice {
    fn read(&mut self, name: &str, kind: ValueKind) -> Result<TagValue, IoFault> {
        self.reads += 1;
        self.store.read(name, kind)
    }

    fn write(&mut self, name: &str, value: &TagValue) -> Result<(), IoFault> {
        self.writes.push(name.to_string());
        if let Some((tag, nth)) = self.fail_nth_write {
            let attempts = self.writes.iter().filter(|written| *written == tag).count();
            if tag == name && attempts == nth {
                return Err(IoFault::WriteFailed {
                    tag: name.into(),
                    reason: "transient fault".into(),
                });
            }
        }
        self.store.write(name, value)
    }
}

fn device() -> CountingDevice {
    let mut store = MemoryTagStore::new();
    store.insert("T1", DataType::Integer, 10).expect("T1");
    store.insert("T2", DataType::Float, 0.5).expect("T2");
    store.insert("T3", DataType::Integer, 30).expect("T3");
    store.insert("Flag", DataType::Boolean, 0).expect("Flag");
    store.insert("Mode", DataType::IntegerMappedString, 1).expect("Mode");
    store.insert("Count", DataType::DWord, 4_u32).expect("Count");
    store.insert("Label", DataType::String, "idle").expect("Label");
    CountingDevice::new(store)
}

fn envelope(id: i64, result: serde_json::Value) -> Envelope {
    Envelope::from_value(json!({"id": id, "jsonrpc": "2.0", "result": result})).expect("envelope")
}

#[test]
fn missing_tag_rejects_whole_batch_without_writes() {
    let mut processor = TagUpdateProcessor::new(device());
    let report = processor.process(
        &envelope(
            1,
            json!({"tagUpdates": [
                {"name": "T1", "type": "integer", "value": 5},
                {"name": "Ghost", "type": "integer", "value": 1},
                {"name": "T2", "type": "integer", "value": 1},
            ]}),
        ),
        1,
    );
    assert_eq!(report.outcome, TransactionOutcome::MissingTags);
    assert_eq!(report.code(), 7);
    // Scanning continues past the first fault.
    assert_eq!(report.faults.len(), 2);
    let device = processor.into_inner();
    assert_eq!(device.lookups.get(), 3);
    assert!(device.writes.is_empty());
    assert_eq!(device.reads, 0);
}

#[test]
fn mismatched_type_blocks_compatible_entries_too() {
    let mut processor = TagUpdateProcessor::new(device());
    let report = processor.process(
        &envelope(
            1,
            json!({"tagUpdates": [
                {"name": "T1", "type": "integer", "value": 5},
                {"name": "Count", "type": "integer", "value": 9},
            ]}),
        ),
        1,
    );
    assert_eq!(report.outcome, TransactionOutcome::MismatchedTypes);
    assert_eq!(report.code(), 8);
    let device = processor.into_inner();
    assert!(device.writes.is_empty());
    assert_eq!(device.store.value("T1"), Some(&TagValue::Integer(10)));
}

#[test]
fn integer_is_accepted_for_integer_mapped_string() {
    let mut processor = TagUpdateProcessor::new(device());
    let report = processor.process(
        &envelope(
            1,
            json!({"tagUpdates": [
                {"name": "Mode", "type": "integer", "value": 3},
                {"name": "Count", "type": "dword", "value": 4000000000_u32},
                {"name": "Label", "type": "string", "value": "run"},
            ]}),
        ),
        1,
    );
    assert_eq!(report.outcome, TransactionOutcome::Success);
    assert_eq!(report.written, 3);
    let device = processor.into_inner();
    assert_eq!(device.store.value("Mode"), Some(&TagValue::Integer(3)));
    assert_eq!(device.store.value("Count"), Some(&TagValue::DWord(4_000_000_000)));
    assert_eq!(device.store.value("Label"), Some(&TagValue::from("run")));
}

#[test]
fn failure_without_restore_leaves_prefix_applied() {
    let mut device = device();
    device.store.set_fail_writes("T2", true).expect("T2");
    let mut processor = TagUpdateProcessor::new(device);
    let report = processor.process(
        &envelope(
            1,
            json!({"tagUpdates": [
                {"name": "T1", "type": "integer", "value": 5},
                {"name": "T2", "type": "float", "value": 1.5},
                {"name": "T3", "type": "integer", "value": 7},
            ]}),
        ),
        1,
    );
    assert_eq!(report.outcome, TransactionOutcome::ApplyFailure);
    assert_eq!(report.code(), 6);
    assert_eq!(report.restore, None);
    assert_eq!(report.written, 1);
    assert_eq!(report.failed_entry.as_ref().map(|entry| entry.index), Some(1));
    let device = processor.into_inner();
    assert_eq!(device.writes, vec!["T1", "T2"]);
    assert_eq!(device.reads, 0);
    assert_eq!(device.store.value("T1"), Some(&TagValue::Integer(5)));
    assert_eq!(device.store.value("T3"), Some(&TagValue::Integer(30)));
}

#[test]
fn failure_with_restore_puts_back_prior_values() {
    let mut device = device();
    device.store.set_fail_writes("T2", true).expect("T2");
    let mut processor = TagUpdateProcessor::new(device);
    let report = processor.process(
        &envelope(
            1,
            json!({
                "restorePreviousTagValuesOnUpdateFailure": true,
                "tagUpdates": [
                    {"name": "T1", "type": "integer", "value": 5},
                    {"name": "T2", "type": "float", "value": 1.5},
                    {"name": "T3", "type": "integer", "value": 7},
                ]
            }),
        ),
        1,
    );
    assert_eq!(report.outcome, TransactionOutcome::ApplyFailure);
    assert_eq!(report.restore, Some(RestoreStatus::Full));
    assert_eq!(report.fully_restored(), Some(true));

    let mut device = processor.into_inner();
    assert!(!device.writes.iter().any(|tag| tag == "T3"));
    assert_eq!(
        device.read("T1", ValueKind::Integer).expect("read T1"),
        TagValue::Integer(10)
    );
    assert_eq!(
        device.read("T2", ValueKind::Float).expect("read T2"),
        TagValue::Float(0.5)
    );
    assert_eq!(
        device.read("T3", ValueKind::Integer).expect("read T3"),
        TagValue::Integer(30)
    );
}

#[test]
fn restore_failure_is_reported_as_partial() {
    let mut device = device();
    // T1 accepts the update, then faults on the restore write.
    device.store.set_fail_writes_after("T1", 1).expect("T1");
    device.store.set_fail_writes("T2", true).expect("T2");
    let mut processor = TagUpdateProcessor::new(device);
    let report = processor.process(
        &envelope(
            1,
            json!({
                "restorePreviousTagValuesOnUpdateFailure": true,
                "tagUpdates": [
                    {"name": "T1", "type": "integer", "value": 5},
                    {"name": "T3", "type": "integer", "value": 6},
                    {"name": "T2", "type": "float", "value": 1.5},
                ]
            }),
        ),
        1,
    );
    assert_eq!(report.outcome, TransactionOutcome::ApplyFailure);
    assert_eq!(report.restore, Some(RestoreStatus::Partial));
    assert_eq!(report.unrestored, vec!["T1"]);
    let device = processor.into_inner();
    assert_eq!(device.store.value("T1"), Some(&TagValue::Integer(5)));
    assert_eq!(device.store.value("T3"), Some(&TagValue::Integer(30)));
}

#[test]
fn snapshot_read_fault_is_an_apply_failure_and_rolls_back() {
    let mut device = device();
    device.store.set_fail_reads("T3", true).expect("T3");
    let mut processor = TagUpdateProcessor::new(device);
    let report = processor.process(
        &envelope(
            1,
            json!({
                "restorePreviousTagValuesOnUpdateFailure": true,
                "tagUpdates": [
                    {"name": "T1", "type": "integer", "value": 5},
                    {"name": "T3", "type": "integer", "value": 7},
                ]
            }),
        ),
        1,
    );
    assert_eq!(report.outcome, TransactionOutcome::ApplyFailure);
    assert_eq!(report.restore, Some(RestoreStatus::Full));
    let device = processor.into_inner();
    assert_eq!(device.writes, vec!["T1", "T1"]);
    assert_eq!(device.store.value("T1"), Some(&TagValue::Integer(10)));
    assert_eq!(device.store.value("T3"), Some(&TagValue::Integer(30)));
}

#[test]
fn boolean_updates_are_written_as_device_integers() {
    let mut processor = TagUpdateProcessor::new(device());
    let on = processor.process(
        &envelope(1, json!({"tagUpdates": [{"name": "Flag", "type": "boolean", "value": true}]})),
        1,
    );
    assert!(on.outcome.is_success());
    assert_eq!(
        processor
            .device_mut()
            .read("Flag", ValueKind::Integer)
            .expect("read Flag"),
        TagValue::Integer(1)
    );

    let off = processor.process(
        &envelope(2, json!({"tagUpdates": [{"name": "Flag", "type": "boolean", "value": false}]})),
        2,
    );
    assert!(off.outcome.is_success());
    assert_eq!(
        processor
            .device_mut()
            .read("Flag", ValueKind::Integer)
            .expect("read Flag"),
        TagValue::Integer(0)
    );
}

#[test]
fn bad_id_or_version_touches_nothing() {
    let cases = [
        json!({"id": 2, "jsonrpc": "2.0", "result": {"tagUpdates": []}}),
        json!({"jsonrpc": "2.0", "result": {"tagUpdates": []}}),
        json!({"id": 1, "jsonrpc": "1.0", "result": {"tagUpdates": []}}),
        json!({"id": 1, "result": {"tagUpdates": []}}),
        json!({"id": 1, "jsonrpc": "2.0"}),
        json!({"id": 1, "jsonrpc": "2.0", "result": {"tagUpdates": []}, "error": {"code": 1}}),
        json!({"id": 1, "jsonrpc": "2.0", "result": {}}),
        json!({"id": 1, "jsonrpc": "2.0", "result": {"tagUpdates": [{"name": "T1", "type": "long", "value": 1}]}}),
    ];
    for case in cases {
        let mut processor = TagUpdateProcessor::new(device());
        let report = processor.process(&Envelope::from_value(case.clone()).expect("envelope"), 1);
        assert_eq!(report.outcome, TransactionOutcome::VerifyFailure, "{case}");
        assert_eq!(report.code(), 5);
        let device = processor.into_inner();
        assert_eq!(device.lookups.get(), 0, "{case}");
        assert_eq!(device.reads, 0, "{case}");
        assert!(device.writes.is_empty(), "{case}");
    }
}

#[test]
fn remote_error_passes_code_through_untouched() {
    let mut processor = TagUpdateProcessor::new(device());
    let report = processor.process_json(
        r#"{"id": 9, "jsonrpc": "2.0", "error": {"code": -32601, "message": "method not found"}}"#,
        9,
    );
    assert_eq!(report.outcome, TransactionOutcome::RemoteError(-32601));
    assert_eq!(report.code(), -32601);
    assert_eq!(report.remote_message.as_deref(), Some("method not found"));
    let device = processor.into_inner();
    assert_eq!(device.lookups.get(), 0);
    assert!(device.writes.is_empty());
}

#[test]
fn undecodable_text_is_a_verify_failure() {
    let mut processor = TagUpdateProcessor::new(device());
    let report = processor.process_json("{not json", 1);
    assert_eq!(report.outcome, TransactionOutcome::VerifyFailure);
    assert!(report
        .verify_error
        .as_deref()
        .is_some_and(|reason| reason.starts_with("invalid json")));
}

#[test]
fn empty_batch_succeeds_without_io() {
    let mut processor = TagUpdateProcessor::new(device());
    let report = processor.process(&envelope(1, json!({"tagUpdates": []})), 1);
    assert_eq!(report.outcome, TransactionOutcome::Success);
    assert_eq!(report.written, 0);
    assert!(processor.device().writes.is_empty());
}

#[test]
fn report_json_carries_code_and_restore_flag() {
    let mut device = device();
    device.store.set_fail_writes("T2", true).expect("T2");
    let mut processor = TagUpdateProcessor::new(device);
    let report = processor.process(
        &envelope(
            1,
            json!({
                "restorePreviousTagValuesOnUpdateFailure": true,
                "tagUpdates": [
                    {"name": "T1", "type": "integer", "value": 5},
                    {"name": "T2", "type": "float", "value": 1.5},
                ]
            }),
        ),
        1,
    );
    let value = report.to_json();
    assert_eq!(value["outcome"], "apply_failure");
    assert_eq!(value["code"], 6);
    assert_eq!(value["fullyRestored"], true);
    assert_eq!(value["failedEntry"]["tag"], "T2");
    assert_eq!(value["failedEntry"]["stage"], "write");
}

#[test]
fn repeated_tag_failing_later_is_restored_to_its_pre_transaction_value() {
    let mut device = device();
    device.fail_nth_write = Some(("T1", 2));
    let mut processor = TagUpdateProcessor::new(device);
    let report = processor.process(
        &envelope(
            1,
            json!({
                "restorePreviousTagValuesOnUpdateFailure": true,
                "tagUpdates": [
                    {"name": "T1", "type": "integer", "value": 5},
                    {"name": "T3", "type": "integer", "value": 6},
                    {"name": "T1", "type": "integer", "value": 7},
                ]
            }),
        ),
        1,
    );
    assert_eq!(report.outcome, TransactionOutcome::ApplyFailure);
    assert_eq!(report.written, 2);
    assert_eq!(report.failed_entry.as_ref().map(|entry| entry.index), Some(2));
    assert_eq!(report.restore, Some(RestoreStatus::Full));

    let device = processor.into_inner();
    // One snapshot read per distinct tag; the restore writes T1 back once.
    assert_eq!(device.reads, 2);
    assert_eq!(device.writes, vec!["T1", "T3", "T1", "T1", "T3"]);
    assert_eq!(device.store.value("T1"), Some(&TagValue::Integer(10)));
    assert_eq!(device.store.value("T3"), Some(&TagValue::Integer(30)));
}

#[test]
fn positional_arrays_are_rejected_without_touching_tags() {
    let cases = [
        r#"[1, "2.0", {"tagUpdates": [{"name": "T1", "type": "integer", "value": 99}]}]"#,
        r#"{"id": 1, "jsonrpc": "2.0", "result": [true, [{"name": "T1", "type": "integer", "value": 99}]]}"#,
        r#"{"id": 1, "jsonrpc": "2.0", "result": {"tagUpdates": [["T1", "integer", 99]]}}"#,
        r#"{"id": 1, "jsonrpc": "2.0", "error": [3]}"#,
    ];
    for case in cases {
        let mut processor = TagUpdateProcessor::new(device());
        let report = processor.process_json(case, 1);
        assert_eq!(report.outcome, TransactionOutcome::VerifyFailure, "{case}");
        let device = processor.into_inner();
        assert_eq!(device.lookups.get(), 0, "{case}");
        assert_eq!(device.reads, 0, "{case}");
        assert!(device.writes.is_empty(), "{case}");
        assert_eq!(device.store.value("T1"), Some(&TagValue::Integer(10)), "{case}");
    }
}
