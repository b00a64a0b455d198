use std::sync::Arc;

use anyhow::Context;
use sat_agentd::{Agent, AgentDeps, CONFIG_ENV, config_path};
use sat_core::ConfigStore;
use sat_observe::{LoggerConfig, logger_init};
use sat_state::FileConfigSource;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Configuration
    let path = config_path(std::env::args().nth(1), std::env::var(CONFIG_ENV).ok());
    let (store, warnings) = ConfigStore::load(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;

    // 2) Logger
    logger_init(&LoggerConfig::from_env(&store.log_level())?)?;
    info!(config = %path.display(), "logger initialized");
    for warning in warnings {
        warn!(%warning, "configuration adjusted");
    }

    // 3) Agent
    let deps = AgentDeps::new(store, Arc::new(FileConfigSource::new(&path)));
    let agent = Agent::start(deps)?;
    info!("press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutting down...");
    agent.shutdown().await;

    Ok(())
}
