//! API server setup and configuration.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, MakeSpan, OnFailure,
    OnRequest, OnResponse, TraceLayer,
};
use tracing::Span;

use crate::api::routes;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::notification::{DeliveryEngine, Notifier};

const USER_AGENT: &str = concat!("terrainsight/", env!("CARGO_PKG_VERSION"));

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub enable_cors: bool,
    /// Request body size limit in bytes
    pub body_limit: usize,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3001,
            enable_cors: true,
            body_limit: 10 * 1024 * 1024, // 10MB of extracted text
        }
    }
}

impl ApiServerConfig {
    /// Load API server config from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `API_BIND_ADDRESS` (e.g. "0.0.0.0")
    /// - `API_PORT` (e.g. "3001")
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(bind_address) = std::env::var("API_BIND_ADDRESS")
            && !bind_address.trim().is_empty()
        {
            config.bind_address = bind_address.trim().to_string();
        }

        if let Ok(port) = std::env::var("API_PORT")
            && let Ok(parsed) = port.trim().parse::<u16>()
        {
            config.port = parsed;
        }

        config
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server start time for uptime calculation
    pub start_time: Instant,
    pub settings: Arc<Settings>,
    pub notifier: Notifier,
    /// Cancelled on shutdown; in-flight deliveries derive child tokens from it.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// State delivering through a shared `reqwest` client.
    pub fn new(settings: Settings) -> Self {
        let engine = DeliveryEngine::with_client(Self::build_http_client(), settings.delivery);
        Self::with_notifier(settings, Notifier::new(engine))
    }

    /// State with a caller-supplied notifier.
    pub fn with_notifier(settings: Settings, notifier: Notifier) -> Self {
        Self {
            start_time: Instant::now(),
            settings: Arc::new(settings),
            notifier,
            shutdown: CancellationToken::new(),
        }
    }

    pub(crate) fn build_http_client() -> reqwest::Client {
        match reqwest::Client::builder().user_agent(USER_AGENT).build() {
            Ok(client) => client,
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "Failed to build HTTP client; falling back to reqwest defaults"
                );
                reqwest::Client::new()
            }
        }
    }
}

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        let cancel_token = state.shutdown.clone();
        Self {
            config,
            state,
            cancel_token,
        }
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Build the router with all middleware and routes.
    pub fn build_router(&self) -> Router {
        let mut router = routes::create_router(self.state.clone())
            .layer(DefaultBodyLimit::max(self.config.body_limit));

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router = router.layer(cors);
        }

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|req: &Request| {
                        if is_health_check(req) {
                            Span::none()
                        } else {
                            DefaultMakeSpan::new()
                                .level(tracing::Level::INFO)
                                .make_span(req)
                        }
                    })
                    .on_request(|req: &Request, span: &Span| {
                        if span.is_disabled() || is_health_check(req) {
                            return;
                        }
                        DefaultOnRequest::new()
                            .level(tracing::Level::INFO)
                            .on_request(req, span);
                    })
                    .on_response(
                        |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                            if span.is_disabled() {
                                return;
                            }
                            DefaultOnResponse::new()
                                .level(tracing::Level::INFO)
                                .on_response(res, latency, span);
                        },
                    )
                    .on_failure(
                        |class: tower_http::classify::ServerErrorsFailureClass,
                         latency: Duration,
                         span: &Span| {
                            if span.is_disabled() {
                                return;
                            }
                            DefaultOnFailure::new()
                                .level(tracing::Level::ERROR)
                                .on_failure(class, latency, span);
                        },
                    ),
            )
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Start the server and serve until the cancel token fires.
    pub async fn run(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| Error::config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("API server listening on http://{}", addr);

        let cancel_token = self.cancel_token.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("API server shutting down...");
            })
            .await?;

        Ok(())
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

fn is_health_check(req: &Request) -> bool {
    req.uri().path().starts_with("/api/health")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ApiServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert!(config.enable_cors);
    }

    #[test]
    fn test_app_state_creation() {
        let state = AppState::new(Settings::default());
        assert!(state.start_time.elapsed().as_secs() < 1);
        assert!(!state.settings.webhooks.production_configured());
    }

    #[test]
    fn test_shutdown_cancels_state_token() {
        let state = AppState::new(Settings::default());
        let server = ApiServer::new(ApiServerConfig::default(), state.clone());

        assert!(!state.shutdown.is_cancelled());
        server.shutdown();
        assert!(state.shutdown.is_cancelled());
        assert!(server.cancel_token().is_cancelled());
    }
}
