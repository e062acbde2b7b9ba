// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for skydock-deploy.
//!
//! This module provides [`DeployRuntime`] which allows embedding the
//! deployment orchestrator into an existing tokio application instead of
//! running it as a standalone binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use skydock_deploy::config::Config;
//! use skydock_deploy::runtime::DeployRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = DeployRuntime::builder()
//!         .config(Config::from_env()?)
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     let project = runtime
//!         .orchestrator()
//!         .prepare_project("client-1", &["package.json"], "/tmp/upload".into())
//!         .await?;
//!     let record = runtime.orchestrator().deploy(&project).await?;
//!     println!("deployed at {:?}", record.public_url);
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use skydock_core::{MemoryStore, RecordStore};

use crate::config::Config;
use crate::lifecycle::{LifecycleReaper, ReaperConfig};
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::provider::{CloudProvider, SimulatedProvider};
use crate::status::StatusReconciler;

/// Builder for creating a [`DeployRuntime`].
pub struct DeployRuntimeBuilder {
    provider: Option<Arc<dyn CloudProvider>>,
    store: Option<Arc<dyn RecordStore>>,
    config: Config,
    poll: OrchestratorConfig,
    reaper_config: ReaperConfig,
}

impl Default for DeployRuntimeBuilder {
    fn default() -> Self {
        Self {
            provider: None,
            store: None,
            config: Config::default(),
            poll: OrchestratorConfig::default(),
            reaper_config: ReaperConfig::default(),
        }
    }
}

impl DeployRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cloud provider.
    ///
    /// Required unless the configuration enables demo mode, in which case a
    /// [`SimulatedProvider`] is used.
    pub fn provider(mut self, provider: Arc<dyn CloudProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the record store.
    ///
    /// Default: in-memory store.
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the deployment configuration.
    ///
    /// Default: [`Config::default`] (demo mode).
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the convergence polling configuration.
    ///
    /// Default: 10 second interval, 5 minute window.
    pub fn poll(mut self, poll: OrchestratorConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Set the lifecycle reaper configuration.
    ///
    /// Default: 5 minute sweeps, 2 hour inactivity, 6 hour max age.
    pub fn reaper_config(mut self, config: ReaperConfig) -> Self {
        self.reaper_config = config;
        self
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error when no provider is set and the configuration is not
    /// in demo mode.
    pub fn build(self) -> Result<DeployRuntimeConfig> {
        let provider = match self.provider {
            Some(provider) => provider,
            None if self.config.demo_mode() => {
                Arc::new(SimulatedProvider::new()) as Arc<dyn CloudProvider>
            }
            None => anyhow::bail!("provider is required outside demo mode"),
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn RecordStore>);

        Ok(DeployRuntimeConfig {
            provider,
            store,
            config: self.config,
            poll: self.poll,
            reaper_config: self.reaper_config,
        })
    }
}

/// Configuration for a [`DeployRuntime`].
pub struct DeployRuntimeConfig {
    provider: Arc<dyn CloudProvider>,
    store: Arc<dyn RecordStore>,
    config: Config,
    poll: OrchestratorConfig,
    reaper_config: ReaperConfig,
}

impl DeployRuntimeConfig {
    /// Start the runtime, spawning the lifecycle reaper task.
    pub async fn start(self) -> Result<DeployRuntime> {
        // The reaper inherits the demo flag from the deployment config.
        let mut reaper_config = self.reaper_config;
        reaper_config.demo_mode = self.config.demo_mode();
        let reaper = Arc::new(LifecycleReaper::new(
            self.provider.clone(),
            self.store.clone(),
            reaper_config,
        ));
        let reaper_shutdown = reaper.shutdown_handle();

        let run_reaper = reaper.clone();
        let reaper_handle = tokio::spawn(async move {
            run_reaper.run().await;
        });

        let orchestrator = Arc::new(
            Orchestrator::new(
                self.provider.clone(),
                self.store.clone(),
                self.config.clone(),
                self.poll,
            )
            .with_lifecycle(reaper.clone()),
        );
        let reconciler = Arc::new(StatusReconciler::new(
            self.provider.clone(),
            self.store.clone(),
            self.config.clone(),
        ));

        info!(
            provider = self.provider.provider_kind(),
            demo_mode = self.config.demo_mode(),
            region = %self.config.region,
            target = %self.config.deployment_target,
            "DeployRuntime started"
        );

        Ok(DeployRuntime {
            orchestrator,
            reconciler,
            reaper,
            reaper_handle,
            reaper_shutdown,
        })
    }
}

/// A running skydock-deploy instance that can be embedded in an application.
///
/// The runtime manages:
/// - The deployment orchestrator (intake, fallback, polling)
/// - The status reconciler
/// - The lifecycle reaper background task
///
/// Call [`shutdown`](Self::shutdown) for graceful termination.
pub struct DeployRuntime {
    orchestrator: Arc<Orchestrator>,
    reconciler: Arc<StatusReconciler>,
    reaper: Arc<LifecycleReaper>,
    reaper_handle: JoinHandle<()>,
    reaper_shutdown: Arc<Notify>,
}

impl DeployRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> DeployRuntimeBuilder {
        DeployRuntimeBuilder::new()
    }

    /// The deployment orchestrator.
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// The status reconciler.
    pub fn status(&self) -> &Arc<StatusReconciler> {
        &self.reconciler
    }

    /// The lifecycle reaper.
    pub fn lifecycle(&self) -> &Arc<LifecycleReaper> {
        &self.reaper
    }

    /// Gracefully shut down the runtime.
    ///
    /// Signals the lifecycle reaper to stop and waits for it to complete.
    /// Tracked deployments are left running; call
    /// [`LifecycleReaper::cleanup_all`] first to delete them.
    pub async fn shutdown(self) -> Result<()> {
        info!("DeployRuntime shutting down...");

        self.reaper_shutdown.notify_one();
        if let Err(e) = self.reaper_handle.await {
            error!("Lifecycle reaper task panicked: {}", e);
        }

        info!("DeployRuntime shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_mode_builds_without_provider() {
        let runtime = DeployRuntime::builder().build().unwrap().start().await.unwrap();
        assert_eq!(runtime.lifecycle().stats().await.active, 0);
        runtime.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_live_mode_requires_provider() {
        let config = Config {
            subscription_id: Some("sub-1".to_string()),
            ..Config::default()
        };
        let result = DeployRuntime::builder().config(config).build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_stops_reaper() {
        let runtime = DeployRuntime::builder().build().unwrap().start().await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), runtime.shutdown())
            .await
            .expect("shutdown hung")
            .unwrap();
    }
}
