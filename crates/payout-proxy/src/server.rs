//! HTTP server implementation using axum.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{MatchedPath, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{Local, SecondsFormat, Utc};
use payout_core::{extract_commissions, CommissionReport, DateWindow, Token};
use payout_telemetry::Metrics;
use payout_upstream::StatementSource;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use crate::config::ProxyConfig;
use crate::error::{ApiError, ServerError, ServerResult};
use crate::types::{ApiFailure, ApiSuccess, CommissionRequest, HealthResponse};

/// Primary commissions route.
pub const COMMISSIONS_ROUTE: &str = "/api/deriv-commissions";

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct ProxyState {
    source: Arc<dyn StatementSource>,
    config: Arc<ProxyConfig>,
}

impl ProxyState {
    pub fn new(source: Arc<dyn StatementSource>, config: ProxyConfig) -> Self {
        Self {
            source,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Create the axum router.
pub fn create_router(state: ProxyState) -> ServerResult<Router> {
    let cors = cors_layer(&state.config)?;
    let expose = state.config.expose_error_details;

    Ok(Router::new()
        .route("/", get(health))
        .route(COMMISSIONS_ROUTE, post(get_commissions))
        .route("/commissions", post(get_commissions))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
            panic_response(panic, expose)
        }))
        .layer(middleware::from_fn(track_requests))
        .layer(cors))
}

fn cors_layer(config: &ProxyConfig) -> ServerResult<CorsLayer> {
    let origin = config
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|_| ServerError::InvalidOrigin(config.allowed_origin.clone()))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

/// Health check.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "active".to_string(),
        message: "Deriv Broker Commissions API".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Validate, fetch the statement, extract commissions.
async fn get_commissions(
    State(state): State<ProxyState>,
    payload: Result<Json<CommissionRequest>, JsonRejection>,
) -> Result<Json<ApiSuccess<CommissionReport>>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidBody(e.body_text()))?;

    let token = request
        .token
        .as_deref()
        .ok_or(ApiError::MissingToken)
        .and_then(|raw| Token::new(raw).map_err(ApiError::from))?;

    let today = Local::now().date_naive();
    let window = DateWindow::from_wire(request.date_from(), request.date_to(), today)?;

    debug!(%window, "Fetching commissions");
    let started = Instant::now();
    let fetched = state.source.fetch_statement(&token, window).await;
    Metrics::upstream_latency("http", started.elapsed().as_secs_f64() * 1000.0);

    let transactions = fetched.map_err(|e| {
        Metrics::session_outcome(e.kind().as_str());
        ApiError::from(e)
    })?;
    let report = extract_commissions(&transactions, window).map_err(|e| {
        Metrics::session_outcome(e.kind().as_str());
        ApiError::from(e)
    })?;

    Metrics::session_outcome("ok");
    Metrics::commissions_extracted(report.summary.count());
    info!(
        count = report.summary.count(),
        total = %report.summary.total(),
        %window,
        "Commissions served"
    );

    Ok(Json(ApiSuccess::new(report)))
}

/// Prometheus text exposition.
async fn metrics() -> Response {
    match Metrics::render() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => ApiError::Internal(Some(e.to_string())).into_response(),
    }
}

/// Count requests by matched route and final status.
async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let response = next.run(request).await;
    Metrics::proxy_request(&route, response.status().as_u16());
    response
}

fn panic_response(panic: Box<dyn Any + Send + 'static>, expose: bool) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    error!(panic = %message, "Handler panicked");

    let body = ApiFailure::new("Internal server error", expose.then(|| message.into()));
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Serve on an already bound listener until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: ProxyState,
    shutdown: CancellationToken,
) -> ServerResult<()> {
    let app = create_router(state)?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

/// Run the proxy HTTP server on the configured port.
pub async fn run_server(state: ProxyState, shutdown: CancellationToken) -> ServerResult<()> {
    let port = state.config.port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(port, "Proxy server listening");
    info!("POST {COMMISSIONS_ROUTE} {{ token, date_from?, date_to? }}");

    serve(listener, state, shutdown).await?;
    info!("Proxy server stopped");
    Ok(())
}
