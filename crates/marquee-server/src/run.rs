use axum::{extract::DefaultBodyLimit, routing::get, Router};
use futures::FutureExt;
use marquee_app::{
    fault::with_fault_handling,
    rest_api::{health::healthcheck, method_not_allowed, movie, not_found},
    state::{AppConfig, AppState},
};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::Result;

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let app = main_router(state);

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(env = %args.env, "Starting server on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server stopped");
    Ok(())
}

pub fn main_router(state: AppState) -> Router<()> {
    let body_limit = state.config().max_body_bytes;
    let router = Router::new()
        .nest("/v1/movies", movie::router())
        .route("/v1/healthcheck", get(healthcheck))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);
    with_fault_handling(router)
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let pool = marquee_dal::new_pool(&config.db).await?;
    marquee_dal::migrate(&pool).await?;
    info!(dsn = %config.db.database_url, "Database connection pool established");

    let app_config = AppConfig {
        environment: config.env.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        max_body_bytes: config.max_body_bytes,
        query_timeout: config.db.query_timeout,
    };
    Ok(AppState::new(app_config, pool))
}
