use axum::{
    extract::{MatchedPath, Request},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref HTTP_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "http_requests_total",
            "HTTP requests by method, route and status"
        ),
        &["method", "route", "status"],
    )
    .expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency by method and route"
        ),
        &["method", "route"],
    )
    .expect("metric can be created");
    pub static ref USERS_REGISTERED: IntCounter =
        IntCounter::new("users_registered_total", "Accounts created")
            .expect("metric can be created");
    pub static ref ORDERS_PLACED: IntCounter =
        IntCounter::new("orders_placed_total", "Orders placed through checkout")
            .expect("metric can be created");
    pub static ref ORDERS_CANCELLED: IntCounter =
        IntCounter::new("orders_cancelled_total", "Orders cancelled by customers")
            .expect("metric can be created");
    pub static ref ORDERS_DELIVERED: IntCounter =
        IntCounter::new("orders_delivered_total", "Orders marked delivered")
            .expect("metric can be created");
    pub static ref LOW_STOCK_ALERTS: IntCounter = IntCounter::new(
        "low_stock_alerts_total",
        "Products that crossed their low-stock threshold"
    )
    .expect("metric can be created");
}

/// Register every collector with the shared registry. Called once at
/// startup; duplicate registrations are logged and skipped.
pub fn init_metrics() {
    let registrations = [
        REGISTRY.register(Box::new(HTTP_REQUESTS.clone())),
        REGISTRY.register(Box::new(HTTP_REQUEST_DURATION.clone())),
        REGISTRY.register(Box::new(USERS_REGISTERED.clone())),
        REGISTRY.register(Box::new(ORDERS_PLACED.clone())),
        REGISTRY.register(Box::new(ORDERS_CANCELLED.clone())),
        REGISTRY.register(Box::new(ORDERS_DELIVERED.clone())),
        REGISTRY.register(Box::new(LOW_STOCK_ALERTS.clone())),
    ];
    for result in registrations {
        if let Err(e) = result {
            error!("Metric registration failed: {}", e);
        }
    }
}

/// Request-tracking middleware. Labels use the matched route pattern, not
/// the raw path, to keep label cardinality bounded.
pub async fn track_http(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let start = Instant::now();
    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS
        .with_label_values(&[&method, &route, &status])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &route])
        .observe(start.elapsed().as_secs_f64());

    response
}

/// Prometheus text exposition of the shared registry
pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    match String::from_utf8(buffer) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Metrics output was not valid UTF-8: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
