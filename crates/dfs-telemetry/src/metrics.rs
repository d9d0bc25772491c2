//! Prometheus metrics for the file registry.
//!
//! All metrics follow the naming convention: `dfs_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: committed and rejected operations, notifications
//! - **Gauge**: live records and access entries
//! - **Histogram**: request handling latency

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec,
    Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // REGISTRY METRICS
    // =========================================================================

    /// Committed operations by kind
    pub static ref REGISTRY_OPERATIONS: CounterVec = CounterVec::new(
        Opts::new("dfs_registry_operations_total", "Committed registry operations"),
        &["operation"]  // register/grant_access/revoke_access/delete_record
    ).expect("metric creation failed");

    /// Rejected operations by kind and reason
    pub static ref REGISTRY_REJECTIONS: CounterVec = CounterVec::new(
        Opts::new("dfs_registry_rejections_total", "Rejected registry requests"),
        &["operation", "reason"]  // reason: invalid_input/not_found/unauthorized/journal
    ).expect("metric creation failed");

    /// Live records
    pub static ref ACTIVE_RECORDS: Gauge = Gauge::new(
        "dfs_registry_active_records",
        "Number of records that have not been deleted"
    ).expect("metric creation failed");

    /// Live access entries
    pub static ref ACTIVE_GRANTS: Gauge = Gauge::new(
        "dfs_registry_active_grants",
        "Number of access entries on live records"
    ).expect("metric creation failed");

    /// Request handling duration
    pub static ref OPERATION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "dfs_registry_operation_duration_seconds",
            "Time spent handling a registry request"
        ).buckets(exponential_buckets(0.00001, 2.0, 16).expect("valid buckets")),
        &["operation"]
    ).expect("metric creation failed");

    // =========================================================================
    // NOTIFICATION METRICS
    // =========================================================================

    /// Notifications observed on the bus
    pub static ref BUS_NOTIFICATIONS: CounterVec = CounterVec::new(
        Opts::new("dfs_bus_notifications_total", "Notifications observed on the bus"),
        &["kind"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
///
/// # Errors
///
/// `TelemetryError::MetricsInit` if a metric conflicts with one already
/// registered under a different descriptor.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(REGISTRY_OPERATIONS.clone()),
        Box::new(REGISTRY_REJECTIONS.clone()),
        Box::new(ACTIVE_RECORDS.clone()),
        Box::new(ACTIVE_GRANTS.clone()),
        Box::new(OPERATION_DURATION.clone()),
        Box::new(BUS_NOTIFICATIONS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
///
/// # Errors
///
/// `TelemetryError::MetricsInit` if encoding fails.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Write all metrics to `path` in Prometheus textfile format.
///
/// The text is written to a sibling temporary file and renamed into place,
/// so a collector never reads a partial file.
///
/// # Errors
///
/// `TelemetryError::MetricsInit` if encoding fails, `TelemetryError::Export`
/// if the file cannot be written.
pub fn write_metrics(path: &Path) -> Result<(), TelemetryError> {
    let text = encode_metrics()?;
    let export_err = |source| TelemetryError::Export {
        path: path.to_path_buf(),
        source,
    };

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    fs::write(&staging, text).map_err(export_err)?;
    fs::rename(&staging, path).map_err(export_err)
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: Instant::now(),
        }
    }

    /// Start a timer for one operation label of [`OPERATION_DURATION`].
    pub fn for_operation(operation: &str) -> Self {
        Self::new(&OPERATION_DURATION.with_label_values(&[operation]))
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_twice() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_counter_increment() {
        REGISTRY_OPERATIONS.with_label_values(&["register"]).inc();
        assert!(REGISTRY_OPERATIONS.with_label_values(&["register"]).get() >= 1.0);
    }

    #[test]
    fn test_gauge_set() {
        ACTIVE_GRANTS.set(3.0);
        assert_eq!(ACTIVE_GRANTS.get(), 3.0);
    }

    #[test]
    fn test_encode_includes_registered_metrics() {
        register_metrics().unwrap();
        BUS_NOTIFICATIONS.with_label_values(&["deleted"]).inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("dfs_bus_notifications_total"));
    }

    #[test]
    fn test_write_metrics_textfile() {
        register_metrics().unwrap();
        ACTIVE_RECORDS.set(2.0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dfs.prom");
        write_metrics(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("dfs_registry_active_records"));
        assert!(!dir.path().join("dfs.prom.tmp").exists());
    }

    #[test]
    fn test_write_metrics_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("dfs.prom");
        assert!(matches!(
            write_metrics(&path),
            Err(TelemetryError::Export { .. })
        ));
    }

    #[test]
    fn test_histogram_timer() {
        {
            let _timer = HistogramTimer::for_operation("stats");
        }
        assert!(OPERATION_DURATION.with_label_values(&["stats"]).get_sample_count() >= 1);
    }
}
