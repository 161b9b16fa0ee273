//! Teamquiz server binary.
//!
//! Serves the WebSocket gateway and the admin HTTP surface. The chat
//! bridge is not started here: it needs a chat feed, which only an
//! embedding program can supply through
//! [`TeamquizServerBuilder::chat_feed`](teamquiz::TeamquizServerBuilder::chat_feed).
//!
//! Run with:
//! ```not_rust
//! ADMIN_TOKEN=secret cargo run --bin teamquiz-server
//! cargo run --bin teamquiz-server -- --ws-addr 0.0.0.0:4001 --question-seconds 20
//! ```

use std::process::ExitCode;

use teamquiz::logger::setup_logger;
use teamquiz::prelude::*;

#[tokio::main]
async fn main() -> ExitCode {
    let config = ServerConfig::load();
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), TeamquizError> {
    let auth = SharedSecret::new(config.admin_token.clone());
    if !auth.is_configured() {
        tracing::warn!("ADMIN_TOKEN is not set; every admin request will be refused");
    }

    let server = TeamquizServerBuilder::from_config(&config)?
        .build(auth)
        .await?;
    tracing::info!(ws = %server.ws_addr()?, admin = %server.admin_addr()?, "listening");

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
            Ok(())
        }
    }
}
