use tracing_subscriber::EnvFilter;
use typeclaim::prelude::*;

#[tokio::main]
async fn main() -> Result<(), TypeclaimError> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    tracing::info!("typeclaim server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env();
    tracing::info!(
        bind = %config.bind_addr,
        game_secs = config.room.game_duration_secs,
        match_size = config.matchmaking.match_size,
        "configuration loaded"
    );

    let server = TypeclaimServer::builder().config(config).build().await?;
    server.run().await
}
