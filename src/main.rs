// main.rs
use poem::listener::TcpListener;
use tracing_subscriber::EnvFilter;

use blog_api::{Config, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let store = Store::connect(&config.database_url).await?;
    store.migrate().await?;
    tracing::info!(addr = %config.bind_addr, "listening");

    poem::Server::new(TcpListener::bind(config.bind_addr))
        .run(blog_api::app(store))
        .await?;
    Ok(())
}
