//! HydraPro - AI chat client with a metered free tier
//!
//! Terminal front end over the session controller.

use std::sync::Arc;

use hydra_app::{console, AppState, Session};
use hydra_core::HydraConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting HydraPro");

    let config = match HydraConfig::load_default() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = match AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = console::run(Session::new(app_state)).await {
        tracing::error!("Terminal session ended with an error: {}", e);
        std::process::exit(1);
    }
}
