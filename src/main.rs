//! DB Adapter - connectivity check.
//!
//! Fabricates one named connection from CLI/environment configuration, pings
//! it and closes the registry, reporting every failure on the way.

use clap::Parser;
use db_adapter::config::Config;
use db_adapter::context::Context;
use db_adapter::db::{Db, InstanceRegistry};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!(
        driver = %config.driver,
        instance = %config.instance,
        "Starting DB Adapter connectivity check v{}",
        env!("CARGO_PKG_VERSION")
    );

    let registry =
        InstanceRegistry::for_driver(config.driver).with_close_timeout(config.close_timeout());

    let mut healthy = true;
    match registry
        .fabricate(
            &config.instance,
            &config.connection_config(),
            &config.pool_options(),
        )
        .await
    {
        Ok(db) => {
            let ctx = Context::background().with_timeout(config.ping_timeout());
            match db.ping(&ctx).await {
                Ok(()) => info!(instance = %config.instance, "Ping succeeded"),
                Err(exc) => {
                    error!(instance = %config.instance, error = %exc, kind = %exc.kind(), "Ping failed");
                    healthy = false;
                }
            }
        }
        Err(exc) => {
            error!(title = %exc.title(), detail = %exc.detail(), error = %exc, "Fabrication failed");
            healthy = false;
        }
    }

    for exc in registry.close_all().await {
        error!(title = %exc.title(), detail = %exc.detail(), error = %exc, "Close failed");
        healthy = false;
    }

    if healthy {
        info!("Connectivity check complete");
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
