// Prometheus metrics definitions for the stats backend.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Once;
use std::time::Instant;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Counters ─────────────────────────────────────────────────────

    /// Login attempts, by outcome (success, invalid_credentials, deactivated, rate_limited).
    pub static ref LOGIN_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mordhau_login_attempts_total", "Login attempts by outcome"),
        &["outcome"],
    )
    .unwrap();

    /// Bearer tokens minted and linked to a user.
    pub static ref TOKENS_ISSUED_TOTAL: IntCounter = IntCounter::new(
        "mordhau_tokens_issued_total",
        "Bearer tokens issued",
    )
    .unwrap();

    /// Bearer tokens deleted, either revoked explicitly or replaced after failing verification.
    pub static ref TOKENS_REVOKED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mordhau_tokens_revoked_total", "Bearer tokens deleted"),
        &["reason"],
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mordhau_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "mordhau_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["endpoint"],
    )
    .unwrap();
}

static REGISTER: Once = Once::new();

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(LOGIN_ATTEMPTS_TOTAL.clone()),
            Box::new(TOKENS_ISSUED_TOTAL.clone()),
            Box::new(TOKENS_REVOKED_TOTAL.clone()),
            Box::new(API_REQUESTS_TOTAL.clone()),
            Box::new(API_REQUEST_DURATION_SECONDS.clone()),
        ];

        for c in collectors {
            if let Err(e) = REGISTRY.register(c) {
                tracing::error!("Failed to register metric: {e}");
            }
        }
    });
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Label used for requests that matched no route.
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Metric label for a request: the route template it matched (such as
/// `/blog/posts/{id}`), never the raw path a client sent.
pub fn endpoint_label(req: &Request) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string())
}

/// Middleware recording request count and latency per endpoint.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = endpoint_label(&req);
    let start = Instant::now();

    let response = next.run(req).await;

    API_REQUEST_DURATION_SECONDS
        .with_label_values(&[&endpoint])
        .observe(start.elapsed().as_secs_f64());
    API_REQUESTS_TOTAL
        .with_label_values(&[&method, &endpoint, response.status().as_str()])
        .inc();

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use prometheus::core::Collector;
    use tower::ServiceExt;

    fn request_count(method: &str, endpoint: &str, status: &str) -> u64 {
        API_REQUESTS_TOTAL
            .with_label_values(&[method, endpoint, status])
            .get()
    }

    fn endpoints_seen() -> Vec<String> {
        API_REQUESTS_TOTAL
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .flat_map(|metric| metric.get_label())
            .filter(|label| label.get_name() == "endpoint")
            .map(|label| label.get_value().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_routes_are_labelled_by_template() {
        let app = Router::new()
            .route("/widgets/{id}", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(track_metrics));

        let before = request_count("GET", "/widgets/{id}", "200");
        for uri in ["/widgets/1", "/widgets/abc"] {
            let response = app
                .clone()
                .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(request_count("GET", "/widgets/{id}", "200") - before, 2);
    }

    #[tokio::test]
    async fn test_unknown_paths_share_one_label() {
        let app = Router::new()
            .route("/known", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(track_metrics));

        let before = request_count("GET", UNMATCHED_ENDPOINT, "404");
        for uri in ["/made-up-path-1", "/made-up-path-2/abc123"] {
            let response = app
                .clone()
                .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        assert_eq!(request_count("GET", UNMATCHED_ENDPOINT, "404") - before, 2);
        let seen = endpoints_seen();
        assert!(!seen.iter().any(|e| e.starts_with("/made-up-path")));
    }

    #[test]
    fn test_register_twice_and_gather() {
        register_metrics();
        register_metrics();
        TOKENS_ISSUED_TOTAL.inc();
        let output = gather_metrics();
        assert!(output.contains("mordhau_tokens_issued_total"));
    }

    #[test]
    fn test_metric_increments() {
        LOGIN_ATTEMPTS_TOTAL.with_label_values(&["success"]).inc();
        let before = TOKENS_REVOKED_TOTAL.with_label_values(&["revoked"]).get();
        TOKENS_REVOKED_TOTAL.with_label_values(&["revoked"]).inc();
        assert!(TOKENS_REVOKED_TOTAL.with_label_values(&["revoked"]).get() > before);

        API_REQUEST_DURATION_SECONDS
            .with_label_values(&["/team/all"])
            .observe(0.05);
        API_REQUESTS_TOTAL
            .with_label_values(&["GET", "/team/all", "200"])
            .inc();
    }
}
