//! Prometheus metrics definitions.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, register_int_gauge, IntCounterVec, IntGauge};

/// Derived images written, per directory index.
pub static IMAGES_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "imgwatch_images_processed_total",
        "Total number of derived images written",
        &["directory"]
    )
    .unwrap()
});

/// Transform failures, per directory index.
pub static IMAGES_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "imgwatch_images_failed_total",
        "Total number of images that failed to process",
        &["directory"]
    )
    .unwrap()
});

/// Configured directory pairs.
pub static WATCHED_DIRECTORIES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "imgwatch_watched_directories",
        "Number of watched directory pairs"
    )
    .unwrap()
});

/// Request counter.
pub static REQUEST_COUNT: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "imgwatch_requests_total",
        "Total number of dashboard requests",
        &["endpoint", "status"]
    )
    .unwrap()
});

/// Initialize all metrics (call once at startup).
pub fn init_metrics() {
    // Access lazy statics to register them
    let _ = &*IMAGES_PROCESSED;
    let _ = &*IMAGES_FAILED;
    let _ = &*WATCHED_DIRECTORIES;
    let _ = &*REQUEST_COUNT;

    tracing::debug!("Prometheus metrics initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_init() {
        init_metrics();

        WATCHED_DIRECTORIES.set(3);
        assert_eq!(WATCHED_DIRECTORIES.get(), 3);

        let before = IMAGES_FAILED.with_label_values(&["metrics-test"]).get();
        IMAGES_FAILED.with_label_values(&["metrics-test"]).inc();
        assert_eq!(
            IMAGES_FAILED.with_label_values(&["metrics-test"]).get(),
            before + 1
        );
    }
}
