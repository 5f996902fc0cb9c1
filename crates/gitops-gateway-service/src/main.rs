//! # GitOps Gateway Service
//!
//! Binary entry point for the GitOps webhook gateway.
//!
//! This executable:
//! - Loads configuration from files, the command line and the environment
//! - Initializes logging
//! - Wires the event handlers, schedulers and GitHub client
//! - Starts the HTTP server from gitops-gateway-api
//!
//! Exit codes: `3` for configuration or wiring errors, `1` when the listen
//! address cannot be bound, `2` when the server fails while running.

mod comment_creator;
mod gateway;
mod runners;
mod settings;

use clap::Parser;
use gitops_gateway_api::{start_server, ServiceError};
use prometheus::Registry;
use settings::Args;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let loaded = settings::load(args.config.as_deref());
    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    settings::init_tracing(&logging);

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Service configuration is invalid; aborting");
            std::process::exit(3);
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        endpoint = %config.webhooks.endpoint_path,
        "Starting GitOps gateway"
    );

    let gateway = match gateway::build(config, Registry::new()) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!(error = %e, "Failed to wire the gateway; aborting");
            std::process::exit(3);
        }
    };

    if let Err(e) = start_server(gateway.state, gateway.cron).await {
        error!(error = %e, "Server stopped with an error");

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
        };

        std::process::exit(exit_code);
    }
}
