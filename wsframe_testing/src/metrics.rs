//! Helpers for asserting on `metrics` counters.

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

/// Creates a debugging recorder and its snapshotter.
#[must_use]
pub fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

/// Sum of counter `name` across series carrying label `key=value`.
#[must_use]
pub fn counter_value(snapshotter: &Snapshotter, name: &str, label: (&str, &str)) -> u64 {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(key, _, _, _)| {
            key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label.0 && l.value() == label.1)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(count) => count,
            _ => 0,
        })
        .sum()
}
