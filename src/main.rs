use anyhow::Result;
use tracing_subscriber::EnvFilter;

use gridlock::config::GameConfig;
use gridlock::net::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let server_config = ServerConfig::from_env();
    let game_config = GameConfig::from_env();
    run_server(server_config, game_config, None).await
}
