use reelpick_api::{
    api::{create_router, AppState},
    config::Config,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reelpick_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    // Refuse to serve until the dataset, model and feature list are all loaded
    let state = AppState::from_config(&config)?;

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
