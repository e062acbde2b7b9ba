// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::record::DeploymentRecord;

use super::RecordStore;

/// In-memory record store for tests and demo mode.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, DeploymentRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// True when no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn put(&self, project_id: &str, record: DeploymentRecord) -> Result<()> {
        self.records
            .lock()
            .await
            .insert(project_id.to_string(), record);
        Ok(())
    }

    async fn get(&self, project_id: &str) -> Result<Option<DeploymentRecord>> {
        Ok(self.records.lock().await.get(project_id).cloned())
    }

    async fn remove(&self, project_id: &str) -> Result<()> {
        self.records.lock().await.remove(project_id);
        Ok(())
    }
}
