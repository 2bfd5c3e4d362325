pub mod handlers;

use std::future::Future;
use std::net::SocketAddr;

use anyhow::Context;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use livecast_core::config::HttpConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

pub use handlers::{ApiError, ApiState};

/// Build the full HTTP surface: the viewer socket, the bind endpoint, the
/// inspection API and static files as fallback.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/status", get(handlers::handle_status))
        .route("/sessions/{id}", get(handlers::handle_session_inspect));

    let connect_routes = Router::new()
        .route("/connect", post(handlers::handle_connect))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::limit_connect_attempts,
        ));

    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/ws", get(handlers::handle_ws))
        .merge(connect_routes)
        .nest("/api", api_routes)
        .fallback_service(static_files)
        .layer(cors)
        .with_state(state)
}

pub async fn serve(
    state: ApiState,
    http: &HttpConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", http.bind_addr, http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    serve_on(listener, state, shutdown).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_on(
    listener: tokio::net::TcpListener,
    state: ApiState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, "HTTP listening");
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    tracing::info!("HTTP server stopped");
    Ok(())
}
