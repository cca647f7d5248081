use context_relay_bot::{bot::run_relay_bot, RelayConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Context relay bot starting");

    let config = RelayConfig::from_env()?;

    match run_relay_bot(config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("Relay bot failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
