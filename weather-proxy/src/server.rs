//! HTTP front end.
//!
//! # Endpoints
//! - `GET /api/weather?city=&country=` or `?latitude=&longitude=`, optional `unit`
//! - `GET /health`

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use weather_proxy_core::{ErrorCategory, ProxyError, WeatherParams, WeatherPayload, WeatherService};

/// Message returned for every server-side failure; the cause is only logged.
const SERVER_ERROR_MESSAGE: &str = "Error fetching weather data";

pub fn router(service: WeatherService) -> Router {
    Router::new()
        .route("/api/weather", get(weather))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

pub async fn serve(listen_addr: &str, service: WeatherService) -> anyhow::Result<()> {
    let addr: SocketAddr = listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn weather(
    State(service): State<WeatherService>,
    Query(params): Query<WeatherParams>,
) -> Result<Json<WeatherPayload>, ApiError> {
    let payload = service.handle(&params).await?;
    Ok(Json(payload))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

struct ApiError(ProxyError);

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0.category() {
            ErrorCategory::BadRequest => (StatusCode::BAD_REQUEST, self.0.to_string()),
            ErrorCategory::ServerError => {
                error!(error = %self.0, "Error fetching weather data");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    SERVER_ERROR_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
