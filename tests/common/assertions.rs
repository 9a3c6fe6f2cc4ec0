//! Custom assertions for integration tests

use std::time::Duration;

use serde_json::Value;
use vicky::MemorySink;

/// Assert that output is valid JSON and return parsed value
pub fn assert_valid_json(output: &str, context: &str) -> Value {
    serde_json::from_str(output).unwrap_or_else(|e| {
        panic!(
            "Expected valid JSON ({}): {}\nOutput:\n{}",
            context, e, output
        )
    })
}

/// Assert that a reply is an `action/result` for `game` and return its data
pub fn assert_action_result<'a>(reply: &'a Value, game: &str) -> &'a serde_json::Map<String, Value> {
    assert_eq!(reply["command"], "action/result", "Unexpected reply: {}", reply);
    assert_eq!(reply["game"], game, "Unexpected game in reply: {}", reply);
    reply["data"]
        .as_object()
        .unwrap_or_else(|| panic!("Reply data is not an object: {}", reply))
}

/// Wait until the log contains `needle`. Connection tasks log asynchronously,
/// so lines may appear shortly after the client sees the effect.
pub async fn wait_for_log(log: &MemorySink, needle: &str) {
    for _ in 0..100 {
        if log.contains(needle) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "Log never contained {:?}. Lines:\n{:#?}",
        needle,
        log.records()
    );
}
