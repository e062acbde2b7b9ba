// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Persisted deployment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::project::Runtime;

/// Coarse lifecycle state of a deployment, as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    /// Record created, provider not yet called.
    Pending,
    /// Provider accepted the deployment; convergence not yet observed.
    InProgress,
    /// Deployment converged and has a public endpoint.
    Succeeded,
    /// Provider reported a terminal failure.
    Failed,
}

impl DeploymentStatus {
    /// True for states that will never change without a new deploy.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStatus::Succeeded | DeploymentStatus::Failed)
    }
}

/// Build metadata carried on a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Image tag that was deployed.
    pub image_tag: String,
    /// Opaque build identifier, when a build ran.
    pub build_id: Option<String>,
    /// Fully qualified image reference.
    pub image: String,
}

/// One deployment, as written to the record store.
///
/// The record is the durable source of truth when the provider is
/// unreachable: status reads degrade to it before synthesizing a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Derived container name, stable per `(client_id, project_id)`.
    pub container_name: String,
    /// Public HTTPS/HTTP endpoint once converged.
    pub public_url: Option<String>,
    /// Current persisted status.
    pub status: DeploymentStatus,
    /// Region the deployment landed in (may differ from the configured
    /// primary after fallback).
    pub region: String,
    /// Resource group the deployment belongs to.
    pub resource_group: String,
    /// Record creation time.
    pub created_at: DateTime<Utc>,
    /// Time convergence was observed, if it was.
    pub deployed_at: Option<DateTime<Utc>>,
    /// Detected runtime.
    pub runtime: Runtime,
    /// True when the deployment was simulated rather than created on a
    /// real provider.
    pub demo_mode: bool,
    /// Build metadata.
    pub build_info: BuildInfo,
}
