use anyhow::Context;
use dongle_relay::config::{load_config, resolve_config_path};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let path = resolve_config_path();
    let config = load_config(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    info!("configuration file loaded");

    dongle_relay::run(config).await
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
