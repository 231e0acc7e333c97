/*!
 * # Health Check Module
 *
 * Endpoints for monitoring the storefront API:
 *
 * - Basic health check (`/health`) - cached up/down status
 * - Liveness check (`/health/live`) - process is alive
 * - Readiness check (`/health/ready`) - dependencies answer before traffic is admitted
 * - Detailed health check (`/health/details`) - per-component breakdown
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Health of a single dependency.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Snapshot served by the health endpoints.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Clone)]
pub struct HealthState {
    db: Arc<DatabaseConnection>,
    cache: Arc<RwLock<HealthReport>>,
    started_at: SystemTime,
}

impl HealthState {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            cache: Arc::new(RwLock::new(HealthReport {
                status: HealthStatus::Up,
                version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp: Utc::now(),
                uptime_seconds: 0,
                components: HashMap::new(),
            })),
            started_at: SystemTime::now(),
        }
    }

    pub fn uptime(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.started_at)
            .unwrap_or(Duration::from_secs(0))
            .as_secs()
    }

    /// Probes dependencies and refreshes the cached report.
    pub async fn refresh(&self) {
        let mut report = self.cache.write().await;
        report.timestamp = Utc::now();
        report.uptime_seconds = self.uptime();

        let database_status = match self.db.ping().await {
            Ok(_) => ComponentHealth {
                status: HealthStatus::Up,
                message: None,
                checked_at: Utc::now(),
            },
            Err(err) => {
                error!("Database health check failed: {}", err);
                ComponentHealth {
                    status: HealthStatus::Down,
                    message: Some(err.to_string()),
                    checked_at: Utc::now(),
                }
            }
        };
        report.components.insert("database".to_string(), database_status);

        let any_down = report
            .components
            .values()
            .any(|component| component.status == HealthStatus::Down);
        report.status = if any_down {
            HealthStatus::Down
        } else {
            HealthStatus::Up
        };
    }
}

fn status_code_for(status: HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Basic health check endpoint, served from the cached report.
pub async fn health_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let report = state.cache.read().await;

    (
        status_code_for(report.status),
        Json(json!({
            "status": report.status,
            "version": report.version,
            "timestamp": report.timestamp,
        })),
    )
}

/// Liveness check endpoint. Answers as long as the process runs.
pub async fn liveness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let report = state.cache.read().await;

    (
        StatusCode::OK,
        Json(json!({
            "alive": true,
            "uptime_seconds": report.uptime_seconds,
            "timestamp": report.timestamp,
        })),
    )
}

/// Readiness check endpoint. Probes dependencies before answering.
pub async fn readiness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    state.refresh().await;
    let report = state.cache.read().await;

    (
        status_code_for(report.status),
        Json(json!({
            "ready": report.status == HealthStatus::Up,
            "timestamp": report.timestamp,
        })),
    )
}

/// Detailed health check endpoint with the per-component breakdown.
pub async fn detailed_health(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    state.refresh().await;
    let report = state.cache.read().await;

    (status_code_for(report.status), Json(report.clone()))
}

/// Returns build and version information.
pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("GIT_HASH").unwrap_or("unknown"),
    }))
}

/// Re-probes dependencies on an interval so the cached report stays fresh.
pub async fn run_health_checker(state: Arc<HealthState>) {
    info!("Starting periodic health checker");

    let mut interval = tokio::time::interval(Duration::from_secs(30));

    loop {
        interval.tick().await;
        state.refresh().await;

        let report = state.cache.read().await;
        if report.status != HealthStatus::Up {
            warn!("System health is degraded: {:?}", report.status);

            for (name, component) in &report.components {
                if component.status != HealthStatus::Up {
                    warn!("Component {name} is not healthy: {:?}", component.status);
                }
            }
        }
    }
}

/// Creates the health router and starts the background checker.
pub fn health_routes(db: Arc<DatabaseConnection>) -> Router {
    let health_state = Arc::new(HealthState::new(db));

    tokio::spawn(run_health_checker(health_state.clone()));

    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness_check))
        .route("/ready", get(readiness_check))
        .route("/details", get(detailed_health))
        .route("/version", get(version_info))
        .with_state(health_state)
}
