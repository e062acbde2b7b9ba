// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deployment orchestration: intake, region fallback, convergence polling.
//!
//! The orchestrator owns the deploy path end to end: it derives the
//! deployment name, prepares the build context, walks the region list until a
//! region accepts the deployment, then polls until the deployment converges
//! or the polling window closes.
//!
//! Idempotency: deploy is keyed by the derived container name, so a repeat
//! deploy of the same project attaches to the existing deployment instead of
//! creating a second one.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use skydock_core::{
    BuildArtifact, BuildInfo, DeploymentRecord, DeploymentStatus, DeploymentTarget,
    ProjectDescriptor, RecordStore, build_context, detect, dockerfile, naming, project,
};

use crate::config::Config;
use crate::error::{DeployError, Result};
use crate::lifecycle::LifecycleReaper;
use crate::provider::{CloudProvider, DeploymentSpec, ProviderDeployment, ProvisioningState};

/// Polling configuration for convergence.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Interval between status polls.
    pub poll_interval: Duration,
    /// Maximum time to wait for convergence before giving up.
    pub max_wait: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(300), // 5 minutes
        }
    }
}

/// Deployment orchestrator.
pub struct Orchestrator {
    provider: Arc<dyn CloudProvider>,
    store: Arc<dyn RecordStore>,
    config: Config,
    poll: OrchestratorConfig,
    lifecycle: Option<Arc<LifecycleReaper>>,
}

impl Orchestrator {
    /// Create an orchestrator.
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        store: Arc<dyn RecordStore>,
        config: Config,
        poll: OrchestratorConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
            poll,
            lifecycle: None,
        }
    }

    /// Attach a lifecycle reaper; successful deployments are registered with
    /// it for inactivity and age reaping.
    pub fn with_lifecycle(mut self, lifecycle: Arc<LifecycleReaper>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Intake: classify an uploaded source tree into a [`ProjectDescriptor`].
    ///
    /// `files` is the relative-path listing of the extracted archive;
    /// `source_path` is where it was extracted. Fails fast on an
    /// unclassifiable project before anything is built or created.
    pub async fn prepare_project<S: AsRef<str>>(
        &self,
        client_id: &str,
        files: &[S],
        source_path: PathBuf,
    ) -> Result<ProjectDescriptor> {
        let runtime = detect::detect_runtime(files)?;
        let app_port = detect::detect_port(runtime, &source_path).await;
        let dockerfile_content = dockerfile::generate(runtime, app_port, &source_path).await;
        let project_id = project::new_project_id();

        info!(
            project_id = %project_id,
            client_id = client_id,
            runtime = %runtime,
            app_port = app_port,
            "Project prepared"
        );

        Ok(ProjectDescriptor {
            project_id,
            client_id: client_id.to_string(),
            runtime,
            app_port,
            source_path,
            dockerfile_content,
        })
    }

    /// Deploy a project, walking the region list until one accepts it.
    ///
    /// The primary region is attempted first. On a retryable provider error
    /// each fallback region is tried in order (skipping the primary if it
    /// reappears in the list). If every region fails, the PRIMARY region's
    /// error is returned; fallback errors are logged but never surfaced.
    pub async fn deploy(&self, project: &ProjectDescriptor) -> Result<DeploymentRecord> {
        // Name derivation fails fast, before any build or provider call.
        let container_name = naming::container_name(&project.client_id, &project.project_id)?;

        let artifact = build_context::build(project, &self.config.resource_group).await?;

        info!(
            project_id = %project.project_id,
            container_name = %container_name,
            region = %self.config.region,
            target = %self.config.deployment_target,
            "Starting deployment"
        );

        let primary = self.config.region.clone();
        let primary_err = match self
            .deploy_to_region(project, &artifact, &container_name, &primary)
            .await
        {
            Ok(record) => return Ok(record),
            Err(e) if e.is_terminal() => return Err(e),
            Err(e) => e,
        };

        warn!(
            region = %primary,
            error = %primary_err,
            "Primary region failed, trying fallbacks"
        );

        for region in &self.config.fallback_regions {
            if *region == primary {
                continue;
            }
            match self
                .deploy_to_region(project, &artifact, &container_name, region)
                .await
            {
                Ok(record) => {
                    info!(region = %region, "Deployment succeeded in fallback region");
                    return Ok(record);
                }
                Err(e) if e.is_terminal() => return Err(e),
                Err(e) => {
                    warn!(region = %region, error = %e, "Fallback region failed");
                }
            }
        }

        Err(primary_err)
    }

    /// Attempt a deployment in one region: verify prerequisites, attach to an
    /// existing deployment if one exists, otherwise create, then poll.
    async fn deploy_to_region(
        &self,
        project: &ProjectDescriptor,
        artifact: &BuildArtifact,
        container_name: &str,
        region: &str,
    ) -> Result<DeploymentRecord> {
        let target = self.config.deployment_target;

        self.provider.authenticate().await?;
        self.provider
            .ensure_resource_group(&self.config.resource_group)
            .await?;
        self.provider
            .ensure_environment(&self.config.environment_name, region)
            .await?;

        // Idempotency check: a deployment with this name may already exist.
        if let Some(existing) = self.provider.get_deployment(target, container_name).await? {
            match existing.state {
                ProvisioningState::Succeeded => {
                    if let Some(url) = self.endpoint_of(&existing, project.app_port) {
                        info!(
                            container_name = container_name,
                            "Deployment already converged, reusing"
                        );
                        return self
                            .finalize(project, artifact, &existing, container_name, url)
                            .await;
                    }
                    // Converged but ingress not visible yet: keep polling.
                    debug!(
                        container_name = container_name,
                        "Existing deployment has no endpoint yet, polling"
                    );
                    return self
                        .poll_until_converged(project, artifact, container_name, region)
                        .await;
                }
                ProvisioningState::Failed => {
                    debug!(
                        container_name = container_name,
                        "Existing deployment failed previously, recreating"
                    );
                }
                // InProgress, Pending, or anything unrecognized: attach and
                // poll rather than issuing a second create.
                _ => {
                    info!(
                        container_name = container_name,
                        state = ?existing.state,
                        "Deployment already in progress, attaching"
                    );
                    return self
                        .poll_until_converged(project, artifact, container_name, region)
                        .await;
                }
            }
        }

        // Record the attempt before the provider call so a crash between the
        // two leaves a traceable InProgress record.
        let record = self.record_for(project, artifact, container_name, region, None);
        self.store.put(&project.project_id, record).await?;

        let spec = DeploymentSpec {
            container_name: container_name.to_string(),
            image: artifact.image.clone(),
            image_tag: artifact.image_tag.clone(),
            app_port: project.app_port,
            region: region.to_string(),
            resource_group: self.config.resource_group.clone(),
            environment_name: self.config.environment_name.clone(),
            target,
            context_archive: artifact.context_archive.clone(),
        };
        self.provider.create_or_update(&spec).await?;

        self.poll_until_converged(project, artifact, container_name, region)
            .await
    }

    /// Poll until the deployment converges, fails, or the window closes.
    async fn poll_until_converged(
        &self,
        project: &ProjectDescriptor,
        artifact: &BuildArtifact,
        container_name: &str,
        region: &str,
    ) -> Result<DeploymentRecord> {
        let target = self.config.deployment_target;
        let started = Instant::now();

        loop {
            match self.provider.get_deployment(target, container_name).await? {
                Some(deployment) => match deployment.state {
                    ProvisioningState::Succeeded => {
                        if let Some(url) = self.endpoint_of(&deployment, project.app_port) {
                            return self
                                .finalize(project, artifact, &deployment, container_name, url)
                                .await;
                        }
                        debug!(
                            container_name = container_name,
                            "Converged without endpoint, waiting for ingress"
                        );
                    }
                    ProvisioningState::Failed => {
                        let record = self.record_for(
                            project,
                            artifact,
                            container_name,
                            region,
                            Some(DeploymentStatus::Failed),
                        );
                        self.store.put(&project.project_id, record).await?;
                        return Err(DeployError::Failed(format!(
                            "provider reported terminal failure for '{container_name}'"
                        )));
                    }
                    ref state => {
                        debug!(
                            container_name = container_name,
                            state = ?state,
                            elapsed_secs = started.elapsed().as_secs(),
                            "Deployment not converged yet"
                        );
                    }
                },
                None => {
                    // Disappeared mid-poll; keep polling until the window
                    // closes, the provider may be eventually consistent.
                    debug!(
                        container_name = container_name,
                        "Deployment not visible yet"
                    );
                }
            }

            if started.elapsed() >= self.poll.max_wait {
                return Err(DeployError::Timeout {
                    container_name: container_name.to_string(),
                    elapsed_secs: started.elapsed().as_secs(),
                });
            }

            tokio::time::sleep(self.poll.poll_interval).await;
        }
    }

    /// Persist the success record and register with the lifecycle reaper.
    async fn finalize(
        &self,
        project: &ProjectDescriptor,
        artifact: &BuildArtifact,
        deployment: &ProviderDeployment,
        container_name: &str,
        public_url: String,
    ) -> Result<DeploymentRecord> {
        let mut record = self.record_for(
            project,
            artifact,
            container_name,
            &deployment.region,
            Some(DeploymentStatus::Succeeded),
        );
        record.public_url = Some(public_url.clone());
        record.deployed_at = Some(Utc::now());
        self.store.put(&project.project_id, record.clone()).await?;

        if let Some(lifecycle) = &self.lifecycle {
            lifecycle
                .register(
                    &project.project_id,
                    container_name,
                    self.config.deployment_target,
                )
                .await;
        }

        info!(
            container_name = container_name,
            public_url = %public_url,
            region = %deployment.region,
            "Deployment converged"
        );
        Ok(record)
    }

    /// Public endpoint for a converged deployment, if ingress is visible.
    ///
    /// Container apps and web apps expose an HTTPS hostname; raw instances
    /// expose a bare IP on the application port.
    fn endpoint_of(&self, deployment: &ProviderDeployment, app_port: u16) -> Option<String> {
        match self.config.deployment_target {
            DeploymentTarget::ContainerApp | DeploymentTarget::WebApp => {
                deployment.fqdn.as_ref().map(|fqdn| format!("https://{fqdn}"))
            }
            DeploymentTarget::Instances => deployment
                .ip_address
                .as_ref()
                .map(|ip| format!("http://{ip}:{app_port}")),
        }
    }

    fn record_for(
        &self,
        project: &ProjectDescriptor,
        artifact: &BuildArtifact,
        container_name: &str,
        region: &str,
        status: Option<DeploymentStatus>,
    ) -> DeploymentRecord {
        DeploymentRecord {
            container_name: container_name.to_string(),
            public_url: None,
            status: status.unwrap_or(DeploymentStatus::InProgress),
            region: region.to_string(),
            resource_group: self.config.resource_group.clone(),
            created_at: Utc::now(),
            deployed_at: None,
            runtime: project.runtime,
            demo_mode: self.config.demo_mode(),
            build_info: BuildInfo {
                image_tag: artifact.image_tag.clone(),
                build_id: (!artifact.static_shortcut)
                    .then(|| format!("build-{}", &project.project_id)),
                image: artifact.image.clone(),
            },
        }
    }

    /// List all deployments visible under the configured target.
    pub async fn list_deployments(&self) -> Result<Vec<ProviderDeployment>> {
        Ok(self
            .provider
            .list_deployments(self.config.deployment_target)
            .await?)
    }
}
