// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Provider trait definitions.
//!
//! Defines the abstract interface for cloud deployment providers.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use skydock_core::DeploymentTarget;

/// Errors from provider operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// Authentication against the provider failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The configured resource group does not exist.
    #[error("Resource group not found: {0}")]
    ResourceGroupNotFound(String),

    /// The managed environment could not be verified or created.
    #[error("Environment error: {0}")]
    Environment(String),

    /// The provider rejected the create/update call.
    #[error("Create failed in {region}: {message}")]
    CreateFailed {
        /// Region the create was attempted in.
        region: String,
        /// Provider error message.
        message: String,
    },

    /// The provider rejected the delete call.
    #[error("Delete failed for {name}: {message}")]
    DeleteFailed {
        /// Deployment name.
        name: String,
        /// Provider error message.
        message: String,
    },

    /// The provider API was unreachable.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Short-lived credential returned by [`CloudProvider::authenticate`].
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Opaque bearer token.
    pub token: String,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

/// Provisioning state reported by the provider for one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisioningState {
    /// Accepted but not started.
    Pending,
    /// Provisioning in progress.
    InProgress,
    /// Converged.
    Succeeded,
    /// Terminal failure.
    Failed,
    /// Any state this client does not recognize. Treated as still in
    /// progress: unknown states are polled, never recreated.
    Other(String),
}

impl ProvisioningState {
    /// Parse a provider state string, case-insensitively.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "pending" => ProvisioningState::Pending,
            "inprogress" | "in_progress" | "provisioning" => ProvisioningState::InProgress,
            "succeeded" => ProvisioningState::Succeeded,
            "failed" | "canceled" => ProvisioningState::Failed,
            _ => ProvisioningState::Other(raw.to_string()),
        }
    }
}

/// Everything a provider needs to create or update one deployment.
#[derive(Debug, Clone)]
pub struct DeploymentSpec {
    /// Deployment name, pre-validated.
    pub container_name: String,
    /// Fully qualified image reference.
    pub image: String,
    /// Image tag.
    pub image_tag: String,
    /// Application port to expose.
    pub app_port: u16,
    /// Region to create in.
    pub region: String,
    /// Resource group to create under.
    pub resource_group: String,
    /// Managed environment name (container apps only).
    pub environment_name: String,
    /// Compute product to create on.
    pub target: DeploymentTarget,
    /// Build-context archive to upload, when a build is required.
    pub context_archive: Option<PathBuf>,
}

/// One deployment as seen by the provider.
#[derive(Debug, Clone)]
pub struct ProviderDeployment {
    /// Deployment name.
    pub name: String,
    /// Current provisioning state.
    pub state: ProvisioningState,
    /// Public hostname, present once ingress is provisioned.
    pub fqdn: Option<String>,
    /// Public IP address (container instances only).
    pub ip_address: Option<String>,
    /// Exposed application port, when the provider reports one.
    pub app_port: Option<u16>,
    /// Region the deployment lives in.
    pub region: String,
    /// Compute product it was found on.
    pub target: DeploymentTarget,
}

/// Trait for cloud deployment providers.
///
/// Providers are PURE API clients - they do NOT persist records or track
/// lifecycle. Idempotency, polling, and fallback are handled by the caller.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Provider type identifier (e.g., "azure", "simulated").
    fn provider_kind(&self) -> &'static str;

    /// Acquire a management-plane credential.
    async fn authenticate(&self) -> Result<AccessToken>;

    /// Verify the resource group exists. Never creates it.
    async fn ensure_resource_group(&self, name: &str) -> Result<()>;

    /// Verify or create the managed environment in a region.
    async fn ensure_environment(&self, name: &str, region: &str) -> Result<()>;

    /// Create or update a deployment. Returns the accepted deployment in its
    /// initial provisioning state; convergence is observed via
    /// [`get_deployment`](Self::get_deployment).
    async fn create_or_update(&self, spec: &DeploymentSpec) -> Result<ProviderDeployment>;

    /// Fetch one deployment by name under a target. `Ok(None)` means the
    /// deployment does not exist there.
    async fn get_deployment(
        &self,
        target: DeploymentTarget,
        name: &str,
    ) -> Result<Option<ProviderDeployment>>;

    /// Delete a deployment. Deleting a missing deployment is not an error.
    async fn delete_deployment(&self, target: DeploymentTarget, name: &str) -> Result<()>;

    /// List all deployments under a target.
    async fn list_deployments(&self, target: DeploymentTarget) -> Result<Vec<ProviderDeployment>>;
}
