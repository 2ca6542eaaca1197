//! HTTP exposition: `/metrics` for the scraper, `/health` for humans.

use crate::collectors::nvr::Freshness;
use crate::registry::DeviceRegistry;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

pub struct AppState {
    pub registry: Registry,
    pub devices: DeviceRegistry,
}

impl AppState {
    /// Registers the device registry once into a fresh metrics registry.
    pub fn new(devices: DeviceRegistry) -> Self {
        let mut registry = Registry::default();
        registry.register_collector(Box::new(devices.clone()));
        Self { registry, devices }
    }
}

#[derive(Debug, Serialize)]
pub struct DeviceHealth {
    pub host: String,
    pub state: Freshness,
    pub last_success: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct HealthView {
    pub status: &'static str,
    pub devices: Vec<DeviceHealth>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .with_state(state)
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let mut body = String::new();
    match encode(&mut body, &state.registry) {
        Ok(()) => ([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthView> {
    let devices: Vec<DeviceHealth> = state
        .devices
        .devices()
        .iter()
        .map(|d| DeviceHealth {
            host: d.host().to_string(),
            state: d.freshness(),
            last_success: d.last_success(),
        })
        .collect();

    let status = if devices.iter().all(|d| d.state == Freshness::Fresh) {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthView { status, devices })
}

pub async fn serve<F>(addr: SocketAddr, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Serving metrics");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
