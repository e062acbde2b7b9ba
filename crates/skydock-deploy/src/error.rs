// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for deployment orchestration.

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors surfaced by the deployment orchestrator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeployError {
    /// Configuration was invalid or incomplete.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Core pipeline failure (detection, naming, build context).
    #[error(transparent)]
    Core(#[from] skydock_core::CoreError),

    /// Provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The deployment did not converge within the polling window.
    #[error("Deployment '{container_name}' did not converge within {elapsed_secs}s")]
    Timeout {
        /// Name of the deployment that timed out.
        container_name: String,
        /// Seconds spent polling before giving up.
        elapsed_secs: u64,
    },

    /// The provider reported a terminal failure state for the deployment.
    #[error("Deployment failed: {0}")]
    Failed(String),

    /// No deployment exists for the project on any target.
    #[error("Deployment '{0}' not found")]
    NotFound(String),
}

impl DeployError {
    /// True for errors that no region fallback can fix.
    ///
    /// Provider errors are retryable in another region; everything else
    /// (bad input, timeout in a region that accepted the deployment,
    /// terminal provider state) is not.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeployError::Provider(_))
    }
}

/// Result type using DeployError.
pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_errors_are_retryable() {
        let err = DeployError::Provider(ProviderError::CreateFailed {
            region: "southeastasia".to_string(),
            message: "quota exceeded".to_string(),
        });
        assert!(!err.is_terminal());
    }

    #[test]
    fn test_timeout_and_core_are_terminal() {
        assert!(
            DeployError::Timeout {
                container_name: "app-a-b".to_string(),
                elapsed_secs: 300,
            }
            .is_terminal()
        );
        assert!(DeployError::Core(skydock_core::CoreError::UnsupportedRuntime).is_terminal());
        assert!(DeployError::Config("bad".to_string()).is_terminal());
        assert!(DeployError::Failed("provisioning failed".to_string()).is_terminal());
    }
}
