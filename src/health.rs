//! Health check and metrics endpoint

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub uptime_seconds: u64,
    pub zulip_connected: bool,
    pub bot_email: Option<String>,
}

/// Metrics data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub messages_received: u64,
    pub messages_sent: u64,
    pub commands_processed: u64,
    pub errors: u64,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<RwLock<Metrics>>,
    pub start_time: SystemTime,
    pub bot_email: Option<String>,
    pub zulip_connected: Arc<RwLock<bool>>,
}

impl AppState {
    pub fn new(bot_email: Option<String>) -> Self {
        Self {
            metrics: Arc::new(RwLock::new(Metrics {
                messages_received: 0,
                messages_sent: 0,
                commands_processed: 0,
                errors: 0,
            })),
            start_time: SystemTime::now(),
            bot_email,
            zulip_connected: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn increment_messages_received(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.messages_received += 1;
    }

    pub async fn increment_messages_sent(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.messages_sent += 1;
    }

    pub async fn increment_commands(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.commands_processed += 1;
    }

    pub async fn increment_errors(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.errors += 1;
    }

    pub async fn set_zulip_connected(&self, connected: bool) {
        *self.zulip_connected.write().await = connected;
    }
}

/// Health check endpoint handler
async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let uptime = state.start_time.elapsed().unwrap_or_default().as_secs();
    let zulip_connected = *state.zulip_connected.read().await;

    let (status, status_code) = if zulip_connected {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        status_code,
        Json(HealthStatus {
            status: status.to_string(),
            uptime_seconds: uptime,
            zulip_connected,
            bot_email: state.bot_email.clone(),
        }),
    )
}

/// Metrics endpoint handler
async fn metrics_handler(State(state): State<AppState>) -> Json<Metrics> {
    let metrics = state.metrics.read().await;
    Json(metrics.clone())
}

/// Create health check router
pub fn create_health_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Start health check server
pub async fn start_health_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_health_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Health check server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_increment() {
        let state = AppState::new(Some("pairing-bot@example.com".to_string()));
        state.increment_messages_received().await;
        state.increment_messages_received().await;
        state.increment_messages_sent().await;
        state.increment_commands().await;
        state.increment_errors().await;

        let metrics = state.metrics.read().await;
        assert_eq!(metrics.messages_received, 2);
        assert_eq!(metrics.messages_sent, 1);
        assert_eq!(metrics.commands_processed, 1);
        assert_eq!(metrics.errors, 1);
    }

    #[tokio::test]
    async fn test_connected_flag_starts_false() {
        let state = AppState::new(None);
        assert!(!*state.zulip_connected.read().await);
        state.set_zulip_connected(true).await;
        assert!(*state.zulip_connected.read().await);
    }
}
