use anyhow::Context;
use print_agent::{Agent, Config, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment: .env first so it can feed the config
    dotenv::dotenv().ok();

    // 2. Configuration and logging
    let config = Config::from_env();
    setup_environment(&config);
    tracing::info!("Print agent v{} starting...", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    // 3. Store + background tasks
    let agent = Agent::initialize(config)
        .await
        .context("failed to initialize print agent")?;

    agent.run().await.context("print agent stopped with an error")?;
    Ok(())
}
