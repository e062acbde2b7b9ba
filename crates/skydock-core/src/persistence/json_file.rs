// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::record::DeploymentRecord;

use super::RecordStore;

/// File-backed record store: one `{project_id}.json` per record under a
/// base directory. Survives restarts; the read path tolerates a missing
/// directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, project_id: &str) -> Result<PathBuf> {
        // Keys become file names; reject anything that could escape the dir.
        let safe = !project_id.is_empty()
            && project_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(CoreError::InvalidRecordKey(project_id.to_string()));
        }
        Ok(self.dir.join(format!("{project_id}.json")))
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn put(&self, project_id: &str, record: DeploymentRecord) -> Result<()> {
        let path = self.path_for(project_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(&record)?;
        tokio::fs::write(&path, json).await?;
        debug!(project_id = project_id, path = %path.display(), "Record persisted");
        Ok(())
    }

    async fn get(&self, project_id: &str) -> Result<Option<DeploymentRecord>> {
        let path = self.path_for(project_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, project_id: &str) -> Result<()> {
        let path = self.path_for(project_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
