//! Metrics regression tests for the resilience components.
//!
//! These tests ensure that metric names, types, and labels remain stable
//! across releases. Dashboards and alerts are built on these names, so we
//! treat them as part of the public API.

#[cfg(feature = "metrics")]
mod metrics_regression {
    mod circuitbreaker;
    mod retry;
    mod stats;

    /// Lookups against a process-wide debugging recorder.
    pub(crate) mod helpers {
        use metrics::Label;
        use metrics_util::debugging::{DebugValue, DebuggingRecorder};
        use std::sync::LazyLock;

        static RECORDER: LazyLock<DebuggingRecorder> = LazyLock::new(DebuggingRecorder::default);

        /// Installs the recorder. Only the first call in the process wins,
        /// later calls are no-ops.
        pub(crate) fn init_recorder() {
            let _ = metrics::set_global_recorder(&*RECORDER);
        }

        /// Every recorded series named `name`, as (labels, value).
        fn series(name: &str) -> Vec<(Vec<Label>, DebugValue)> {
            RECORDER
                .snapshotter()
                .snapshot()
                .into_vec()
                .into_iter()
                .filter(|(key, ..)| key.key().name() == name)
                .map(|(key, _, _, value)| (key.key().labels().cloned().collect(), value))
                .collect()
        }

        pub(crate) fn assert_counter_exists(name: &str) {
            assert!(
                series(name)
                    .iter()
                    .any(|(_, value)| matches!(value, DebugValue::Counter(_))),
                "no counter named {name}"
            );
        }

        pub(crate) fn assert_gauge_exists(name: &str) {
            assert!(
                series(name)
                    .iter()
                    .any(|(_, value)| matches!(value, DebugValue::Gauge(_))),
                "no gauge named {name}"
            );
        }

        pub(crate) fn assert_metric_has_label(name: &str, key: &str, value: &str) {
            let found = series(name).iter().any(|(labels, _)| {
                labels
                    .iter()
                    .any(|label| label.key() == key && label.value() == value)
            });
            assert!(found, "no {name} series labelled {key}={value}");
        }
    }
}
