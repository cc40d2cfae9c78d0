//! Prometheus metrics for editor-server.
//!
//! Provides metrics collection and a Prometheus-compatible `/metrics` endpoint.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// Metric names as constants for consistency
const WS_CONNECTIONS_ACTIVE: &str = "editor_ws_connections_active";
const ENVELOPES_TOTAL: &str = "editor_envelopes_total";
const ENVELOPES_REJECTED_TOTAL: &str = "editor_envelopes_rejected_total";

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Set the number of open editor sessions.
#[allow(clippy::cast_precision_loss)]
pub fn set_ws_connections(count: usize) {
    gauge!(WS_CONNECTIONS_ACTIVE).set(count as f64);
}

/// Record an envelope crossing the socket.
///
/// # Arguments
///
/// * `direction` - "inbound" or "outbound"
/// * `kind` - Envelope type (e.g., "patch", "state.move"); inbound text
///   frames are counted as "frame" before decoding
pub fn record_envelope(direction: &str, kind: &str) {
    counter!(
        ENVELOPES_TOTAL,
        "direction" => direction.to_string(),
        "type" => kind.to_string()
    )
    .increment(1);
}

/// Record a rejected inbound frame.
///
/// # Arguments
///
/// * `reason` - "message_size", "binary_frame" or "protocol"
pub fn record_rejected(reason: &str) {
    counter!(
        ENVELOPES_REJECTED_TOTAL,
        "reason" => reason.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_render_through_local_recorder() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_envelope("outbound", "patch");
            record_envelope("outbound", "patch");
            record_rejected("protocol");
            set_ws_connections(3);
        });

        let rendered = handle.render();
        assert!(rendered.contains(ENVELOPES_TOTAL));
        assert!(rendered.contains(r#"type="patch""#));
        assert!(rendered.contains(ENVELOPES_REJECTED_TOTAL));
        assert!(rendered.contains(WS_CONNECTIONS_ACTIVE));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_envelope("inbound", "zoom_in");
        record_rejected("message_size");
        set_ws_connections(0);
    }
}
