//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Domain-level gauges (applications, leases, payments by
//! status; unread notifications) are updated on each `/metrics` scrape
//! (pull model) — see the metrics handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{Encoder, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain gauges (pull model, updated on /metrics scrape) --
    applications_total: GaugeVec,
    leases_total: GaugeVec,
    payments_total: GaugeVec,
    notifications_unread_total: prometheus::Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics").finish_non_exhaustive()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("haven_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "haven_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("haven_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let applications_total = GaugeVec::new(
            Opts::new("haven_applications_total", "Applications by status"),
            &["status"],
        )
        .expect("metric can be created");

        let leases_total = GaugeVec::new(
            Opts::new("haven_leases_total", "Leases by status"),
            &["status"],
        )
        .expect("metric can be created");

        let payments_total = GaugeVec::new(
            Opts::new("haven_payments_total", "Payments by status"),
            &["status"],
        )
        .expect("metric can be created");

        let notifications_unread_total = prometheus::Gauge::new(
            "haven_notifications_unread_total",
            "Unread notifications across all inboxes",
        )
        .expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(applications_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(leases_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(payments_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(notifications_unread_total.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                applications_total,
                leases_total,
                payments_total,
                notifications_unread_total,
            }),
        }
    }

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Access the applications gauge for updating.
    pub fn applications_total(&self) -> &GaugeVec {
        &self.inner.applications_total
    }

    /// Access the leases gauge for updating.
    pub fn leases_total(&self) -> &GaugeVec {
        &self.inner.leases_total
    }

    /// Access the payments gauge for updating.
    pub fn payments_total(&self) -> &GaugeVec {
        &self.inner.payments_total
    }

    /// Access the unread-notifications gauge for updating.
    pub fn notifications_unread_total(&self) -> &prometheus::Gauge {
        &self.inner.notifications_unread_total
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a request path by replacing UUID segments with `{id}`.
///
/// Prevents cardinality explosion in Prometheus labels.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.len() == 36
                && segment.chars().enumerate().all(|(i, c)| {
                    if i == 8 || i == 13 || i == 18 || i == 23 {
                        c == '-'
                    } else {
                        c.is_ascii_hexdigit()
                    }
                })
            {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Axum middleware recording request count, duration, and errors.
pub async fn metrics_middleware(
    axum::Extension(metrics): axum::Extension<ApiMetrics>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());
    let start = Instant::now();

    let response = next.run(req).await;

    metrics.record_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_replaces_uuids() {
        let path = "/v1/payments/4f9c1b2a-0000-4000-8000-aabbccddeeff/verify";
        assert_eq!(normalize_path(path), "/v1/payments/{id}/verify");
    }

    #[test]
    fn test_normalize_path_leaves_plain_segments() {
        assert_eq!(normalize_path("/v1/applications"), "/v1/applications");
    }

    #[test]
    fn test_encode_includes_recorded_request() {
        let metrics = ApiMetrics::new();
        metrics.record_request("GET", "/v1/applications", 200, 0.01);
        let text = metrics.gather_and_encode().unwrap();
        assert!(text.contains("haven_http_requests_total"));
    }
}
