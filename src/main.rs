use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use brokersim::api;
use brokersim::config::Config;
use brokersim::services::{provider_from_config, BrokerService, Clock, ReplayDataset, SystemClock};
use brokersim::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brokersim=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env());
    info!("Starting broker simulator on {}:{}", config.host, config.port);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Replay dataset: file if configured, otherwise the shipped default
    let dataset = match &config.replay_data_path {
        Some(path) => ReplayDataset::from_file(path)
            .with_context(|| format!("loading replay dataset from {}", path))?,
        None => ReplayDataset::builtin(),
    };

    let market_data = provider_from_config(&config, dataset, clock.clone());
    let broker = Arc::new(BrokerService::new(
        config.broker.clone(),
        market_data.clone(),
        clock,
    ));

    let state = AppState {
        config: config.clone(),
        broker,
        market_data,
    };

    let app = api::router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
