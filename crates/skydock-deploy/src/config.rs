// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use skydock_core::DeploymentTarget;

/// Fallback regions tried, in order, when the primary region rejects a
/// deployment.
pub const DEFAULT_FALLBACK_REGIONS: [&str; 5] = [
    "southeastasia",
    "centralindia",
    "koreacentral",
    "malaysiawest",
    "uaenorth",
];

/// Skydock deployment configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Cloud subscription identifier. `None` switches the orchestrator into
    /// demo mode: no provider calls, simulated endpoints.
    pub subscription_id: Option<String>,
    /// Primary region deployments are attempted in first.
    pub region: String,
    /// Regions tried after the primary, in order.
    pub fallback_regions: Vec<String>,
    /// Compute product deployments are created on.
    pub deployment_target: DeploymentTarget,
    /// Resource group all deployments live in.
    pub resource_group: String,
    /// Managed environment name for container apps.
    pub environment_name: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `SKYDOCK_SUBSCRIPTION_ID`: cloud subscription (unset enables demo mode)
    /// - `SKYDOCK_REGION`: primary region (default: southeastasia)
    /// - `SKYDOCK_FALLBACK_REGIONS`: comma-separated fallback list
    /// - `SKYDOCK_DEPLOYMENT_TARGET`: containerapp | webapp | instances
    /// - `SKYDOCK_RESOURCE_GROUP`: resource group (default: skydock-rg)
    /// - `SKYDOCK_ENVIRONMENT`: managed environment name (default: skydock-env)
    pub fn from_env() -> Result<Self, ConfigError> {
        let subscription_id = std::env::var("SKYDOCK_SUBSCRIPTION_ID")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let region =
            std::env::var("SKYDOCK_REGION").unwrap_or_else(|_| "southeastasia".to_string());

        let fallback_regions = match std::env::var("SKYDOCK_FALLBACK_REGIONS") {
            Ok(raw) => {
                let regions: Vec<String> = raw
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if regions.is_empty() {
                    return Err(ConfigError::Invalid(
                        "SKYDOCK_FALLBACK_REGIONS",
                        "must be a non-empty comma-separated region list",
                    ));
                }
                regions
            }
            Err(_) => DEFAULT_FALLBACK_REGIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let deployment_target = std::env::var("SKYDOCK_DEPLOYMENT_TARGET")
            .unwrap_or_else(|_| "containerapp".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid(
                    "SKYDOCK_DEPLOYMENT_TARGET",
                    "must be containerapp, webapp, or instances",
                )
            })?;

        let resource_group =
            std::env::var("SKYDOCK_RESOURCE_GROUP").unwrap_or_else(|_| "skydock-rg".to_string());

        let environment_name =
            std::env::var("SKYDOCK_ENVIRONMENT").unwrap_or_else(|_| "skydock-env".to_string());

        Ok(Self {
            subscription_id,
            region,
            fallback_regions,
            deployment_target,
            resource_group,
            environment_name,
        })
    }

    /// True when no subscription is configured and deployments are simulated.
    pub fn demo_mode(&self) -> bool {
        self.subscription_id.is_none()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subscription_id: None,
            region: "southeastasia".to_string(),
            fallback_regions: DEFAULT_FALLBACK_REGIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            deployment_target: DeploymentTarget::ContainerApp,
            resource_group: "skydock-rg".to_string(),
            environment_name: "skydock-env".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
