use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use exam_gateway::config::Args;
use exam_gateway::load_balancer::health_checker;
use exam_gateway::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    if args.json_logs()? {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = Arc::new(AppState::from_args(&args)?);

    // background health checks, the only task besides the server
    tokio::spawn(health_checker(
        state.pool.clone(),
        state.client.clone(),
        args.health_path.clone(),
        state.health_interval,
    ));

    let app = exam_gateway::router(state.clone());

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        %addr,
        rate_limit = state.default_policy.max_requests(),
        rate_window_ms = state.default_policy.window().as_millis() as u64,
        auth_rate_limit = state.auth_policy.max_requests(),
        auth_prefix = %state.auth_prefix,
        trust_proxy = state.trust_proxy,
        "exam gateway ready",
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("exam gateway shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
