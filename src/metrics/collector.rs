//! Metrics collection and registry.

use crate::session::{ErrorKind, PermissionState, SessionState, SessionStats};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registering or encoding a metric failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of session state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Whether the platform supports capture.
    pub is_supported: bool,
    /// Whether an acquisition is in flight.
    pub is_loading: bool,
    /// Whether a stream is held.
    pub is_streaming: bool,
    /// Permission tri-state as a gauge value (1 granted, 0 unknown, -1 denied).
    pub permission: i64,
    /// Acquisitions handed to the platform.
    pub acquisitions: u64,
    /// Acquisitions that produced a stream.
    pub acquisitions_succeeded: u64,
    /// Failures by kind.
    pub failures: Vec<(ErrorKind, u64)>,
    /// Streams released.
    pub releases: u64,
    /// Camera switches.
    pub switches: u64,
    /// Permission probes.
    pub permission_probes: u64,
    /// Requests rejected while another was in flight.
    pub rejected: u64,
}

/// Prometheus metrics registry for camera sessions.
pub struct MetricsRegistry {
    registry: Registry,

    // State gauges
    supported: IntGauge,
    loading: IntGauge,
    streaming: IntGauge,
    permission: IntGauge,

    // Lifecycle counters
    acquisitions_total: IntCounter,
    acquisitions_succeeded_total: IntCounter,
    failures_total: IntCounterVec,
    releases_total: IntCounter,
    switches_total: IntCounter,
    permission_probes_total: IntCounter,
    rejected_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all session metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let supported = IntGauge::new(
            "camera_session_supported",
            "Whether the platform supports video capture (1=yes, 0=no)",
        )?;
        let loading = IntGauge::new(
            "camera_session_loading",
            "Whether an acquisition is in flight",
        )?;
        let streaming = IntGauge::new(
            "camera_session_streaming",
            "Whether a camera stream is currently held",
        )?;
        let permission = IntGauge::new(
            "camera_session_permission",
            "Camera permission (1=granted, 0=unknown, -1=denied)",
        )?;

        let acquisitions_total = IntCounter::new(
            "camera_session_acquisitions_total",
            "Total stream acquisitions handed to the platform",
        )?;
        let acquisitions_succeeded_total = IntCounter::new(
            "camera_session_acquisitions_succeeded_total",
            "Total acquisitions that produced a stream",
        )?;
        let failures_total = IntCounterVec::new(
            Opts::new(
                "camera_session_failures_total",
                "Total failed acquisitions by error kind",
            ),
            &["kind"],
        )?;
        let releases_total = IntCounter::new(
            "camera_session_releases_total",
            "Total camera streams released",
        )?;
        let switches_total = IntCounter::new(
            "camera_session_switches_total",
            "Total camera facing-mode switches",
        )?;
        let permission_probes_total = IntCounter::new(
            "camera_session_permission_probes_total",
            "Total throwaway permission acquisitions",
        )?;
        let rejected_total = IntCounter::new(
            "camera_session_rejected_total",
            "Total requests rejected while another was in flight",
        )?;

        registry.register(Box::new(supported.clone()))?;
        registry.register(Box::new(loading.clone()))?;
        registry.register(Box::new(streaming.clone()))?;
        registry.register(Box::new(permission.clone()))?;
        registry.register(Box::new(acquisitions_total.clone()))?;
        registry.register(Box::new(acquisitions_succeeded_total.clone()))?;
        registry.register(Box::new(failures_total.clone()))?;
        registry.register(Box::new(releases_total.clone()))?;
        registry.register(Box::new(switches_total.clone()))?;
        registry.register(Box::new(permission_probes_total.clone()))?;
        registry.register(Box::new(rejected_total.clone()))?;

        // Pre-create every kind so dashboards see zeros
        for kind in ErrorKind::ALL {
            failures_total.with_label_values(&[kind.as_str()]);
        }

        Ok(Self {
            registry,
            supported,
            loading,
            streaming,
            permission,
            acquisitions_total,
            acquisitions_succeeded_total,
            failures_total,
            releases_total,
            switches_total,
            permission_probes_total,
            rejected_total,
        })
    }

    /// Updates all metrics from a snapshot of session state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.supported.set(snapshot.is_supported as i64);
        self.loading.set(snapshot.is_loading as i64);
        self.streaming.set(snapshot.is_streaming as i64);
        self.permission.set(snapshot.permission);

        // Counters only move forward; increment by the difference
        advance(&self.acquisitions_total, snapshot.acquisitions);
        advance(&self.acquisitions_succeeded_total, snapshot.acquisitions_succeeded);
        advance(&self.releases_total, snapshot.releases);
        advance(&self.switches_total, snapshot.switches);
        advance(&self.permission_probes_total, snapshot.permission_probes);
        advance(&self.rejected_total, snapshot.rejected);

        for (kind, count) in &snapshot.failures {
            advance(&self.failures_total.with_label_values(&[kind.as_str()]), *count);
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from a session's published state and counters.
    pub fn from_session(state: &SessionState, stats: &SessionStats) -> Self {
        let permission = match state.has_permission {
            PermissionState::Granted => 1,
            PermissionState::Unknown => 0,
            PermissionState::Denied => -1,
        };
        let failures = ErrorKind::ALL
            .iter()
            .map(|kind| (*kind, stats.failures_of(*kind)))
            .collect();

        Self {
            is_supported: state.is_supported,
            is_loading: state.is_loading,
            is_streaming: state.is_streaming(),
            permission,
            acquisitions: stats.acquisitions,
            acquisitions_succeeded: stats.acquisitions_succeeded,
            failures,
            releases: stats.releases,
            switches: stats.switches,
            permission_probes: stats.permission_probes,
            rejected: stats.rejected,
        }
    }
}
