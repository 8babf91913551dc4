//! Helpers for asserting on counters recorded through `metrics`.
//!
//! A `DebuggingRecorder` snapshot only reports counters that changed since
//! the previous snapshot, so take one [`Counters`] capture per test and query
//! it as often as needed.

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

/// Create a debugging recorder and its snapshotter.
#[must_use]
pub fn recorder() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

#[derive(Debug)]
struct Recorded {
    name: String,
    labels: Vec<(String, String)>,
    value: u64,
}

/// Counter values captured from a single snapshot.
#[derive(Debug, Default)]
pub struct Counters {
    recorded: Vec<Recorded>,
}

impl Counters {
    /// Take one snapshot from `snapshotter` and keep every counter in it.
    #[must_use]
    pub fn capture(snapshotter: &Snapshotter) -> Self {
        let recorded = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter_map(|(key, _, _, value)| match value {
                DebugValue::Counter(value) => Some(Recorded {
                    name: key.key().name().to_owned(),
                    labels: key
                        .key()
                        .labels()
                        .map(|label| (label.key().to_owned(), label.value().to_owned()))
                        .collect(),
                    value,
                }),
                _ => None,
            })
            .collect();
        Self { recorded }
    }

    /// Sum of every counter named `name` whose labels include `label`.
    ///
    /// Pass `None` to ignore labels.
    #[must_use]
    pub fn value(&self, name: &str, label: Option<(&str, &str)>) -> u64 {
        self.recorded
            .iter()
            .filter(|counter| counter.name == name)
            .filter(|counter| {
                label.is_none_or(|(k, v)| counter.labels.iter().any(|(lk, lv)| lk == k && lv == v))
            })
            .map(|counter| counter.value)
            .sum()
    }
}
