use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use rate_store::{MongoStore, StoreConfig, exchange};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the variables may come from the shell
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = StoreConfig::from_env().context("Failed to load database configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    let mut store = MongoStore::connect(&config)
        .await
        .context("Failed to connect to MongoDB")?;

    let mut stdout = std::io::stdout();
    let summary = exchange::run(&mut store, &config.collection, &mut stdout)
        .await
        .with_context(|| format!("Failed to update collection {}", config.collection))?;

    tracing::info!(
        inserted_id = %summary.inserted_id,
        printed = summary.printed,
        "Done"
    );

    Ok(())
}
