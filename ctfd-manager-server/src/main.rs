use anyhow::Context;
use ctfd_manager_cluster::{AccessTokenStore, KubeCluster};
use ctfd_manager_remote::{CtfdClient, GithubClient};
use ctfd_manager_server::{AppState, ManagerConfig, router};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ManagerConfig::from_env()?;
    info!("Starting CTFd manager {} in namespace {}", config.version, config.namespace);
    if config.github_repo.is_empty() {
        warn!("GITHUB_REPO is not set, challenge files cannot be fetched");
    }

    let cluster = Arc::new(
        KubeCluster::connect()
            .await
            .context("failed to initialize the cluster client")?,
    );

    let ctfd = Arc::new(CtfdClient::new(config.ctfd_config())?);
    match AccessTokenStore::new(cluster.clone(), config.namespace.clone()).load().await {
        Ok(Some(token)) => ctfd.set_access_token(Some(token)).await,
        Ok(None) => warn!("No CTFd access token stored yet, run the setup first"),
        Err(e) => warn!("Failed to load the CTFd access token: {e}"),
    }

    let github = Arc::new(GithubClient::new(config.github_config())?);
    github.check_access().await;

    let listen_addr = config.listen_addr;
    let state = AppState::new(config, cluster, ctfd, github);
    let reconciler = state.reconciler.clone();

    let listener = TcpListener::bind(listen_addr).await?;
    info!("Listening on {listen_addr}");

    tokio::select! {
        served = axum::serve(listener, router(state)).into_future() => served?,
        watched = reconciler.run() => watched.context("config object watch failed")?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}
