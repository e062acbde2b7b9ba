// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Status reconciliation.
//!
//! Reads live provider state and normalizes it into a [`StatusSnapshot`].
//! The read path degrades rather than erroring: when the provider is
//! unreachable it falls back to the persisted record, and then to a
//! synthesized in-progress snapshot. Only a deployment missing from BOTH the
//! configured target and its alternate surfaces as not-found.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use skydock_core::{DeploymentStatus, DeploymentTarget, RecordStore, naming};

use crate::config::Config;
use crate::error::{DeployError, Result};
use crate::provider::{CloudProvider, ProviderDeployment, ProviderError, ProvisioningState};

/// Where a snapshot's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    /// Live provider state.
    Provider,
    /// Persisted record (provider unreachable).
    Record,
    /// Synthesized (provider unreachable and no record).
    Synthesized,
}

/// Normalized view of one deployment's current state.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// Derived container name.
    pub container_name: String,
    /// Normalized status.
    pub status: DeploymentStatus,
    /// Public endpoint, when converged and visible.
    pub public_url: Option<String>,
    /// Region, when known.
    pub region: Option<String>,
    /// Target the deployment was found on, when known.
    pub target: Option<DeploymentTarget>,
    /// True for simulated deployments.
    pub demo_mode: bool,
    /// Provenance of this snapshot.
    pub source: SnapshotSource,
    /// When this snapshot was taken.
    pub last_updated: DateTime<Utc>,
}

/// Status reconciler.
pub struct StatusReconciler {
    provider: Arc<dyn CloudProvider>,
    store: Arc<dyn RecordStore>,
    config: Config,
}

impl StatusReconciler {
    /// Create a reconciler.
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        store: Arc<dyn RecordStore>,
        config: Config,
    ) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    /// Current status of a project's deployment.
    ///
    /// Queries the configured target first, then the alternate target once
    /// (the deployment may predate a target reconfiguration). Transport
    /// failures degrade to the persisted record and then to a synthesized
    /// snapshot; [`DeployError::NotFound`] is returned only when both targets
    /// definitively report no deployment.
    pub async fn status(&self, project_id: &str, client_id: &str) -> Result<StatusSnapshot> {
        let container_name = naming::container_name(client_id, project_id)?;
        let primary = self.config.deployment_target;

        match self.lookup(primary, &container_name).await {
            Ok(Some(deployment)) => {
                let snapshot = self.snapshot_of(&container_name, &deployment);
                self.reconcile_record(project_id, &snapshot).await;
                Ok(snapshot)
            }
            Ok(None) => {
                let alternate = primary.alternate();
                debug!(
                    container_name = %container_name,
                    alternate = %alternate,
                    "Not found on configured target, checking alternate"
                );
                match self.lookup(alternate, &container_name).await {
                    Ok(Some(deployment)) => {
                        let snapshot = self.snapshot_of(&container_name, &deployment);
                        self.reconcile_record(project_id, &snapshot).await;
                        Ok(snapshot)
                    }
                    Ok(None) => {
                        if self.config.demo_mode() {
                            return Ok(self.demo_snapshot(&container_name));
                        }
                        Err(DeployError::NotFound(container_name))
                    }
                    Err(e) => self.degrade(project_id, &container_name, e).await,
                }
            }
            Err(e) => self.degrade(project_id, &container_name, e).await,
        }
    }

    async fn lookup(
        &self,
        target: DeploymentTarget,
        name: &str,
    ) -> std::result::Result<Option<ProviderDeployment>, ProviderError> {
        self.provider.get_deployment(target, name).await
    }

    /// Provider unreachable: fall back to the record, then synthesize.
    async fn degrade(
        &self,
        project_id: &str,
        container_name: &str,
        err: ProviderError,
    ) -> Result<StatusSnapshot> {
        warn!(
            container_name = container_name,
            error = %err,
            "Provider status lookup failed, degrading to persisted record"
        );

        match self.store.get(project_id).await {
            Ok(Some(record)) => Ok(StatusSnapshot {
                container_name: container_name.to_string(),
                status: record.status,
                public_url: record.public_url,
                region: Some(record.region),
                target: Some(self.config.deployment_target),
                demo_mode: record.demo_mode,
                source: SnapshotSource::Record,
                last_updated: Utc::now(),
            }),
            Ok(None) => Ok(StatusSnapshot {
                container_name: container_name.to_string(),
                status: DeploymentStatus::InProgress,
                public_url: None,
                region: None,
                target: None,
                demo_mode: self.config.demo_mode(),
                source: SnapshotSource::Synthesized,
                last_updated: Utc::now(),
            }),
            Err(store_err) => {
                warn!(error = %store_err, "Record store read failed during degraded status");
                Ok(StatusSnapshot {
                    container_name: container_name.to_string(),
                    status: DeploymentStatus::InProgress,
                    public_url: None,
                    region: None,
                    target: None,
                    demo_mode: self.config.demo_mode(),
                    source: SnapshotSource::Synthesized,
                    last_updated: Utc::now(),
                })
            }
        }
    }

    fn snapshot_of(&self, container_name: &str, deployment: &ProviderDeployment) -> StatusSnapshot {
        let status = match deployment.state {
            ProvisioningState::Pending => DeploymentStatus::Pending,
            ProvisioningState::Succeeded => DeploymentStatus::Succeeded,
            ProvisioningState::Failed => DeploymentStatus::Failed,
            // Unknown states are in progress until proven otherwise.
            ProvisioningState::InProgress | ProvisioningState::Other(_) => {
                DeploymentStatus::InProgress
            }
        };

        let public_url = if status == DeploymentStatus::Succeeded {
            match deployment.target {
                DeploymentTarget::ContainerApp | DeploymentTarget::WebApp => {
                    deployment.fqdn.as_ref().map(|fqdn| format!("https://{fqdn}"))
                }
                DeploymentTarget::Instances => {
                    deployment.ip_address.as_ref().map(|ip| match deployment.app_port {
                        Some(port) => format!("http://{ip}:{port}"),
                        None => format!("http://{ip}"),
                    })
                }
            }
        } else {
            None
        };

        StatusSnapshot {
            container_name: container_name.to_string(),
            status,
            public_url,
            region: Some(deployment.region.clone()),
            target: Some(deployment.target),
            demo_mode: self.config.demo_mode(),
            source: SnapshotSource::Provider,
            last_updated: Utc::now(),
        }
    }

    /// Demo mode never 404s: synthesize a converged simulated deployment.
    fn demo_snapshot(&self, container_name: &str) -> StatusSnapshot {
        StatusSnapshot {
            container_name: container_name.to_string(),
            status: DeploymentStatus::Succeeded,
            public_url: Some(format!(
                "https://{container_name}.{}.apps.skydock.dev",
                self.config.region
            )),
            region: Some(self.config.region.clone()),
            target: Some(self.config.deployment_target),
            demo_mode: true,
            source: SnapshotSource::Synthesized,
            last_updated: Utc::now(),
        }
    }

    /// Push fresher provider state back into the persisted record.
    ///
    /// Only fills in a URL the record lacks; a URL already persisted by the
    /// deploy path is never replaced with a reconstructed one.
    async fn reconcile_record(&self, project_id: &str, snapshot: &StatusSnapshot) {
        let Ok(Some(mut record)) = self.store.get(project_id).await else {
            return;
        };
        let fresher_url = record.public_url.is_none() && snapshot.public_url.is_some();
        if record.status == snapshot.status && !fresher_url {
            return;
        }
        record.status = snapshot.status;
        if fresher_url {
            record.public_url = snapshot.public_url.clone();
        }
        if let Err(e) = self.store.put(project_id, record).await {
            warn!(project_id = project_id, error = %e, "Failed to reconcile record");
        }
    }
}
