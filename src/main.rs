//! Serves the item API.

use axum_items::{
    infra::{config, logging},
    server,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    let _guard = logging::init_logging("./logs");
    let config = config::load_config()?;
    let state = server::init_state(&config).await?;

    let listener = TcpListener::bind(format!(
        "{}:{}",
        config.server.http_address, config.server.http_port
    ))
    .await?;
    server::run_app(listener, state).await?;

    Ok(())
}
