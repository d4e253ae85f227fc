#![no_main]

use libfuzzer_sys::fuzz_target;
use phasekeeper::model::{AssignmentRecord, FlagKey, ParticipantId};
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    // Treat the input as a host flag bag; decoding must never panic
    let Ok(Value::Object(bag)) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let participant = ParticipantId::new("fuzz");
    let record = AssignmentRecord::from_flags(&participant, |key: FlagKey| {
        bag.get(key.as_str()).cloned()
    });
    assert!(record.order.is_finite());
});
