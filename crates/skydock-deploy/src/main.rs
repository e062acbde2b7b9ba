// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Skydock Deploy - Deployment Orchestration Service
//!
//! A long-running service responsible for:
//! - Turning uploaded projects into container deployments
//! - Region fallback and convergence polling
//! - Status reconciliation against live provider state
//! - Reaping inactive and over-age deployments

use tracing::{info, warn};

use skydock_deploy::config::Config;
use skydock_deploy::runtime::DeployRuntime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skydock_deploy=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    // Load configuration
    let config = Config::from_env()?;

    info!(
        region = %config.region,
        target = %config.deployment_target,
        resource_group = %config.resource_group,
        demo_mode = config.demo_mode(),
        "Starting Skydock Deploy"
    );

    // The standalone binary always runs against the simulated provider; real
    // backends are wired in by embedding applications.
    if !config.demo_mode() {
        warn!(
            "SKYDOCK_SUBSCRIPTION_ID is set but the standalone binary has no real \
             provider wired in; deployments will be simulated"
        );
    }
    let provider = std::sync::Arc::new(skydock_deploy::provider::SimulatedProvider::new());

    let mut config = config;
    config.subscription_id = None;

    // Start the runtime
    let runtime = DeployRuntime::builder()
        .provider(provider)
        .config(config)
        .build()?
        .start()
        .await?;

    info!("Skydock Deploy ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Delete every tracked deployment before exiting
    let stats = runtime.lifecycle().cleanup_all().await;
    info!(
        cleaned = stats.succeeded,
        failed = stats.failed,
        "Deployments cleaned up"
    );

    // Graceful shutdown
    runtime.shutdown().await?;

    info!("Skydock Deploy shut down");
    Ok(())
}
