//! Admin/debug endpoint.
//!
//! Exposes read-only normalizer introspection on a separate listener,
//! behind a bearer token.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;

use self::auth::admin_auth_middleware;
use self::handlers::{get_normalizer, get_shape, get_status};
use crate::http::server::AppState;
use crate::lifecycle::ShutdownSignal;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/normalizer", get(get_normalizer))
        .route("/admin/normalizer/shape", get(get_shape))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}

/// Serve the admin router until shutdown.
pub async fn serve_admin(
    listener: TcpListener,
    state: AppState,
    mut shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin endpoint listening");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move { shutdown.recv().await })
        .await
}
