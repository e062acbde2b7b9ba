// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Simulated provider for testing and demo mode.
//!
//! A provider implementation that keeps deployments in memory and converges
//! them after a configurable number of status polls, without touching any
//! cloud API.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use skydock_core::DeploymentTarget;

use super::traits::*;

/// Simulated deployment state.
#[derive(Debug, Clone)]
struct SimDeployment {
    deployment: ProviderDeployment,
    polls: u32,
}

/// Simulated provider for testing and demo mode.
pub struct SimulatedProvider {
    deployments: Arc<Mutex<HashMap<String, SimDeployment>>>,
    /// Regions where create calls are rejected, for fallback testing.
    pub failing_regions: Vec<String>,
    /// If true, deployments stay InProgress forever.
    pub never_converge: bool,
    /// Number of status polls before a deployment converges.
    pub converge_after_polls: u32,
    /// If true, delete calls fail.
    pub fail_deletes: bool,
    /// Every accepted create call, as `(region, name)`.
    pub create_calls: Arc<Mutex<Vec<(String, String)>>>,
    /// Every delete call, by name.
    pub delete_calls: Arc<Mutex<Vec<String>>>,
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedProvider {
    /// Create a provider that converges deployments on the first poll.
    pub fn new() -> Self {
        Self {
            deployments: Arc::new(Mutex::new(HashMap::new())),
            failing_regions: Vec::new(),
            never_converge: false,
            converge_after_polls: 1,
            fail_deletes: false,
            create_calls: Arc::new(Mutex::new(Vec::new())),
            delete_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a provider that rejects creates in the given regions.
    pub fn failing_in(regions: &[&str]) -> Self {
        Self {
            failing_regions: regions.iter().map(|s| s.to_string()).collect(),
            ..Self::new()
        }
    }

    /// Create a provider whose deployments never converge.
    /// This is useful for testing timeout enforcement.
    pub fn never_converging() -> Self {
        Self {
            never_converge: true,
            ..Self::new()
        }
    }

    /// Create a provider that converges after `polls` status checks.
    pub fn converging_after(polls: u32) -> Self {
        Self {
            converge_after_polls: polls,
            ..Self::new()
        }
    }

    /// Create a provider whose delete calls fail.
    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::new()
        }
    }

    /// Seed a deployment directly, bypassing `create_or_update`.
    pub async fn seed(&self, deployment: ProviderDeployment) {
        self.deployments.lock().await.insert(
            deployment.name.clone(),
            SimDeployment {
                deployment,
                polls: 0,
            },
        );
    }

    /// Force an existing deployment into a terminal failure state.
    pub async fn fail_deployment(&self, name: &str) {
        if let Some(sim) = self.deployments.lock().await.get_mut(name) {
            sim.deployment.state = ProvisioningState::Failed;
            sim.deployment.fqdn = None;
        }
    }

    fn fqdn_for(name: &str, region: &str) -> String {
        format!("{name}.{region}.apps.skydock.dev")
    }
}

#[async_trait]
impl CloudProvider for SimulatedProvider {
    fn provider_kind(&self) -> &'static str {
        "simulated"
    }

    async fn authenticate(&self) -> Result<AccessToken> {
        Ok(AccessToken {
            token: "simulated-token".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        })
    }

    async fn ensure_resource_group(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn ensure_environment(&self, _name: &str, _region: &str) -> Result<()> {
        Ok(())
    }

    async fn create_or_update(&self, spec: &DeploymentSpec) -> Result<ProviderDeployment> {
        if self.failing_regions.contains(&spec.region) {
            return Err(ProviderError::CreateFailed {
                region: spec.region.clone(),
                message: "region capacity exhausted".to_string(),
            });
        }

        self.create_calls
            .lock()
            .await
            .push((spec.region.clone(), spec.container_name.clone()));

        let deployment = ProviderDeployment {
            name: spec.container_name.clone(),
            state: ProvisioningState::InProgress,
            fqdn: None,
            ip_address: None,
            app_port: Some(spec.app_port),
            region: spec.region.clone(),
            target: spec.target,
        };

        self.deployments.lock().await.insert(
            spec.container_name.clone(),
            SimDeployment {
                deployment: deployment.clone(),
                polls: 0,
            },
        );

        Ok(deployment)
    }

    async fn get_deployment(
        &self,
        target: DeploymentTarget,
        name: &str,
    ) -> Result<Option<ProviderDeployment>> {
        let mut deployments = self.deployments.lock().await;
        let Some(sim) = deployments.get_mut(name) else {
            return Ok(None);
        };
        if sim.deployment.target != target {
            return Ok(None);
        }

        if sim.deployment.state == ProvisioningState::InProgress && !self.never_converge {
            sim.polls += 1;
            if sim.polls >= self.converge_after_polls {
                let region = sim.deployment.region.clone();
                sim.deployment.state = ProvisioningState::Succeeded;
                sim.deployment.fqdn = Some(Self::fqdn_for(name, &region));
                sim.deployment.ip_address = Some("20.24.10.5".to_string());
            }
        }

        Ok(Some(sim.deployment.clone()))
    }

    async fn delete_deployment(&self, _target: DeploymentTarget, name: &str) -> Result<()> {
        self.delete_calls.lock().await.push(name.to_string());
        if self.fail_deletes {
            return Err(ProviderError::DeleteFailed {
                name: name.to_string(),
                message: "simulated delete failure".to_string(),
            });
        }
        self.deployments.lock().await.remove(name);
        Ok(())
    }

    async fn list_deployments(&self, target: DeploymentTarget) -> Result<Vec<ProviderDeployment>> {
        Ok(self
            .deployments
            .lock()
            .await
            .values()
            .filter(|sim| sim.deployment.target == target)
            .map(|sim| sim.deployment.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, region: &str) -> DeploymentSpec {
        DeploymentSpec {
            container_name: name.to_string(),
            image: "registry.skydock.dev/app-x-y".to_string(),
            image_tag: "latest".to_string(),
            app_port: 3000,
            region: region.to_string(),
            resource_group: "skydock-rg".to_string(),
            environment_name: "skydock-env".to_string(),
            target: DeploymentTarget::ContainerApp,
            context_archive: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_converge_on_poll() {
        let provider = SimulatedProvider::new();
        let created = provider
            .create_or_update(&spec("app-a-b", "southeastasia"))
            .await
            .unwrap();
        assert_eq!(created.state, ProvisioningState::InProgress);

        let polled = provider
            .get_deployment(DeploymentTarget::ContainerApp, "app-a-b")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(polled.state, ProvisioningState::Succeeded);
        assert_eq!(
            polled.fqdn.as_deref(),
            Some("app-a-b.southeastasia.apps.skydock.dev")
        );
    }

    #[tokio::test]
    async fn test_failing_region_rejects_create() {
        let provider = SimulatedProvider::failing_in(&["southeastasia"]);
        let err = provider
            .create_or_update(&spec("app-a-b", "southeastasia"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::CreateFailed { region, .. } if region == "southeastasia"));
        assert!(provider.create_calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_never_converging_stays_in_progress() {
        let provider = SimulatedProvider::never_converging();
        provider
            .create_or_update(&spec("app-a-b", "southeastasia"))
            .await
            .unwrap();

        for _ in 0..5 {
            let polled = provider
                .get_deployment(DeploymentTarget::ContainerApp, "app-a-b")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(polled.state, ProvisioningState::InProgress);
        }
    }

    #[tokio::test]
    async fn test_get_respects_target() {
        let provider = SimulatedProvider::new();
        provider
            .create_or_update(&spec("app-a-b", "southeastasia"))
            .await
            .unwrap();

        let found = provider
            .get_deployment(DeploymentTarget::Instances, "app-a-b")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let provider = SimulatedProvider::new();
        provider
            .delete_deployment(DeploymentTarget::ContainerApp, "nope")
            .await
            .unwrap();
        assert_eq!(provider.delete_calls.lock().await.len(), 1);
    }
}
