// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deployment record persistence.
//!
//! The [`RecordStore`] trait abstracts where records live; the in-memory
//! store backs tests and demo mode, the JSON file store survives restarts.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::record::DeploymentRecord;

/// Keyed storage for [`DeploymentRecord`]s, keyed by project id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or replace the record for a project.
    async fn put(&self, project_id: &str, record: DeploymentRecord) -> Result<()>;

    /// Fetch the record for a project, if one exists.
    async fn get(&self, project_id: &str) -> Result<Option<DeploymentRecord>>;

    /// Remove the record for a project. Removing a missing record is not an
    /// error.
    async fn remove(&self, project_id: &str) -> Result<()>;
}
