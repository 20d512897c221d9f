//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, route metrics)
//! - Forward requests to the configured upstream
//! - Apply hot-reloaded configuration

use axum::{
    body::Body,
    extract::State,
    http::{
        header,
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use arc_swap::ArcSwap;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::middleware::route_metrics_middleware;
use crate::http::request::{MakeRequestUuidV4, RequestIdExt, RouteTemplate, X_REQUEST_ID};
use crate::lifecycle::ShutdownSignal;
use crate::normalizer::PathNormalizer;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live configuration; swapped on reload.
    pub config: Arc<ArcSwap<GatewayConfig>>,
    /// Shared route learner. One per process.
    pub normalizer: Arc<PathNormalizer>,
    pub client: Client<HttpConnector, Body>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: GatewayConfig, normalizer: Arc<PathNormalizer>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            normalizer,
            client,
            started_at: Instant::now(),
        }
    }

    /// Swap in a reloaded configuration.
    ///
    /// Upstream address and admin key take effect immediately. Listener,
    /// timeout, observability and normalizer settings need a restart; the
    /// normalizer is never rebuilt here so learned routes survive.
    pub fn apply_config(&self, new_config: GatewayConfig) {
        let current = self.config.load_full();

        if current.normalizer != new_config.normalizer {
            tracing::warn!(
                current = ?current.normalizer,
                requested = ?new_config.normalizer,
                "Normalizer settings changed; restart to apply (learned routes are kept until then)"
            );
        }
        if current.listener != new_config.listener
            || current.timeouts != new_config.timeouts
            || current.observability != new_config.observability
            || current.admin.enabled != new_config.admin.enabled
            || current.admin.bind_address != new_config.admin.bind_address
        {
            tracing::warn!("Listener, timeout, observability or admin listener changes require a restart");
        }

        tracing::info!(
            upstream = ?new_config.upstream.address,
            "Applied configuration update"
        );
        self.config.store(Arc::new(new_config));
    }
}

/// HTTP server for the instrumented gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server around a shared normalizer.
    pub fn new(config: GatewayConfig, normalizer: Arc<PathNormalizer>) -> Self {
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let state = AppState::new(config, normalizer);
        let router = Self::build_router(state.clone(), request_timeout);
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        let normalizer = state.normalizer.clone();
        Router::new()
            .route("/healthz", get(healthz))
            .route("/", any(forward_handler))
            .route("/{*path}", any(forward_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            // outside the timeout so a 408 is still recorded under its route
            .layer(middleware::from_fn_with_state(normalizer, route_metrics_middleware))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    request_id = %request.request_id(),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
    }

    /// The gateway router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared state (also used by the admin router).
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Serve until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        let state = self.state.clone();
        let mut updates_shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(new_config) => state.apply_config(new_config),
                        None => break,
                    },
                    _ = updates_shutdown.recv() => break,
                }
            }
        });

        let mut server_shutdown = shutdown;
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { server_shutdown.recv().await })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

async fn healthz() -> &'static str {
    "ok"
}

/// Forward the request to the configured upstream unchanged.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request.request_id().to_string();
    let route = request
        .extensions()
        .get::<RouteTemplate>()
        .map(|r| r.as_str().to_string())
        .unwrap_or_default();

    let Some(upstream) = state.config.load().upstream.address.clone() else {
        tracing::warn!(request_id = %request_id, route = %route, "No upstream configured");
        return (StatusCode::BAD_GATEWAY, "No upstream configured").into_response();
    };
    let authority = match Authority::from_str(&upstream) {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(request_id = %request_id, upstream = %upstream, error = %e, "Invalid upstream address");
            return (StatusCode::BAD_GATEWAY, "Invalid upstream address").into_response();
        }
    };

    let (mut parts, body) = request.into_parts();
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(authority);
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream URI");
            return (StatusCode::BAD_GATEWAY, "Invalid upstream URI").into_response();
        }
    };
    // Client sets Host from the upstream authority.
    parts.headers.remove(header::HOST);

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            tracing::debug!(request_id = %request_id, route = %route, status = %response.status(), "Upstream responded");
            response.map(Body::new).into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, route = %route, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
