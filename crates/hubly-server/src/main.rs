//! Hubly Server Binary
//!
//! Standalone server for the hubly support desk API.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use hubly_core::HelpDesk;
use hubly_server::{config::load_config, serve, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    let addr = config.socket_addr()?;
    let mut desk = HelpDesk::open(&config)?;

    match config.admin.clone() {
        Some(admin) => {
            if let Some(staff) = desk.bootstrap_administrator(admin)? {
                tracing::info!(
                    email = %staff.email,
                    token = %staff.auth_token,
                    "Created administrator"
                );
            }
        }
        None => {
            if desk.administrator().is_err() {
                tracing::warn!("No administrator configured; chats cannot be started until one exists");
            }
        }
    }

    let state = Arc::new(AppState::new(desk).with_cors_origin(config.server.cors_origin.clone()));
    serve(addr, state).await
}
