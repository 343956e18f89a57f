//! Prometheus metrics.
//!
//! Metrics are recorded through the `metrics` facade; [`MetricsHandle`]
//! renders whatever the installed recorder has collected in the text
//! exposition format.

use crate::error::{NanoserviceError, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const ECHO_MESSAGES_TOTAL: &str = "echo_messages_total";

/// Content type of the Prometheus text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Clone)]
pub struct MetricsHandle {
    handle: PrometheusHandle,
}

impl std::fmt::Debug for MetricsHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsHandle").finish_non_exhaustive()
    }
}

impl MetricsHandle {
    /// Install a Prometheus recorder as the process-wide recorder.
    ///
    /// Fails if another recorder is already installed.
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| NanoserviceError::Telemetry(e.to_string()))?;
        Ok(Self { handle })
    }

    /// A recorder that is not installed globally; renders empty unless fed
    /// through `metrics::with_local_recorder`.
    pub fn detached() -> Self {
        Self {
            handle: PrometheusBuilder::new().build_recorder().handle(),
        }
    }

    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    pub fn render(&self) -> String {
        self.handle.run_upkeep();
        self.handle.render()
    }
}

/// Count and time one handled request. `path` is the route template, not the raw URI.
pub fn record_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    metrics::counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_echo() {
    metrics::counter!(ECHO_MESSAGES_TOTAL).increment(1);
}
