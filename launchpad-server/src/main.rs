use launchpad_config::LaunchpadConfig;
use launchpad_server::{App, AppState, server};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    launchpad_log::init(&launchpad_log::LogConfig::from_env())?;

    let config = LaunchpadConfig::load()?;
    let state = AppState::from_config(&config)?;
    let shutdown = state.shutdown.clone();

    info!(
        bind = %config.bind_address,
        transport = state.campaigns.mailer().transport().name(),
        batch_size = config.batch_size,
        send_mode = %config.send_mode,
        "Starting Launchpad"
    );

    let listener = TcpListener::bind(&config.bind_address).await?;
    server::cancel_on_ctrl_c(shutdown.clone());
    server::serve(listener, Arc::new(App::new(state)?), shutdown).await?;

    Ok(())
}
