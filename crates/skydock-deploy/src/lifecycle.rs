// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background reaper for deployment lifecycle limits.
//!
//! Every successful deployment is registered here. The reaper periodically
//! sweeps the registry and deletes deployments that exceeded their maximum
//! age or sat inactive too long. Entries are removed from the registry BEFORE
//! the provider delete is issued, so a deployment is deleted at most once
//! even if a sweep races a manual stop; a failed provider delete is logged
//! and the entry stays removed.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use skydock_core::{DeploymentTarget, RecordStore};

use crate::provider::CloudProvider;

/// Configuration for the lifecycle reaper.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// How often to sweep the registry.
    pub poll_interval: Duration,
    /// Time without activity before a deployment is reaped.
    pub inactivity_timeout: Duration,
    /// Absolute lifetime cap, regardless of activity.
    pub max_age: Duration,
    /// Grace period between a manual stop and the actual cleanup.
    pub stop_grace: Duration,
    /// True when deployments are simulated. Stopped demo deployments are
    /// deleted after the grace period; stopped real deployments stay until
    /// inactivity or max-age reaps them.
    pub demo_mode: bool,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),           // 5 minutes
            inactivity_timeout: Duration::from_secs(2 * 3600), // 2 hours
            max_age: Duration::from_secs(6 * 3600),            // 6 hours
            stop_grace: Duration::from_secs(30),
            demo_mode: true,
        }
    }
}

/// Why a deployment was cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupReason {
    /// Exceeded the absolute lifetime cap.
    MaxAge,
    /// No activity within the inactivity window.
    Inactive,
    /// Explicitly stopped.
    Stopped,
    /// Swept during full shutdown.
    Shutdown,
}

impl fmt::Display for CleanupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CleanupReason::MaxAge => "max-age",
            CleanupReason::Inactive => "inactive",
            CleanupReason::Stopped => "stopped",
            CleanupReason::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// One tracked deployment.
#[derive(Debug, Clone)]
pub struct LifecycleEntry {
    /// Project the deployment belongs to.
    pub project_id: String,
    /// Deployment name at the provider.
    pub container_name: String,
    /// Target the deployment was created on.
    pub target: DeploymentTarget,
    /// When the deployment converged.
    pub deployed_at: DateTime<Utc>,
    /// Last observed activity (deploy, status read, touch).
    pub last_activity: DateTime<Utc>,
    /// False once stopped; activity reactivates the entry.
    pub is_active: bool,
}

impl LifecycleEntry {
    /// Time since the deployment converged.
    pub fn uptime(&self, now: DateTime<Utc>) -> Duration {
        (now - self.deployed_at).to_std().unwrap_or_default()
    }
}

/// Aggregate result of a bulk cleanup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    /// Deployments whose provider delete succeeded.
    pub succeeded: usize,
    /// Deployments whose provider delete failed (entries removed anyway).
    pub failed: usize,
}

/// Registry counts and policy reported by [`LifecycleReaper::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaperStats {
    /// Deployments tracked and not stopped.
    pub active: usize,
    /// All tracked deployments, stopped ones included.
    pub tracked: usize,
    /// True when deployments are simulated.
    pub demo_mode: bool,
    /// Sweep cadence.
    pub poll_interval: Duration,
    /// Inactivity window before a reap.
    pub inactivity_timeout: Duration,
    /// Absolute lifetime cap.
    pub max_age: Duration,
}

type Entries = Arc<Mutex<HashMap<String, LifecycleEntry>>>;

/// Background reaper enforcing inactivity and max-age limits.
pub struct LifecycleReaper {
    provider: Arc<dyn CloudProvider>,
    store: Arc<dyn RecordStore>,
    config: ReaperConfig,
    entries: Entries,
    shutdown: Arc<Notify>,
}

impl LifecycleReaper {
    /// Create a reaper.
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        store: Arc<dyn RecordStore>,
        config: ReaperConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Track a deployment. Re-registering refreshes its clock.
    pub async fn register(
        &self,
        project_id: &str,
        container_name: &str,
        target: DeploymentTarget,
    ) {
        let now = Utc::now();
        let entry = LifecycleEntry {
            project_id: project_id.to_string(),
            container_name: container_name.to_string(),
            target,
            deployed_at: now,
            last_activity: now,
            is_active: true,
        };
        self.entries
            .lock()
            .await
            .insert(project_id.to_string(), entry);
        debug!(
            project_id = project_id,
            container_name = container_name,
            "Deployment registered for lifecycle tracking"
        );
    }

    /// Record activity on a deployment, pushing back its inactivity clock.
    /// A stopped entry becomes active again. Unknown projects are ignored.
    pub async fn touch(&self, project_id: &str) {
        if let Some(entry) = self.entries.lock().await.get_mut(project_id) {
            entry.last_activity = Utc::now();
            entry.is_active = true;
        }
    }

    /// Stop a deployment. In demo mode cleanup is scheduled after the
    /// configured grace period so in-flight status reads can complete; real
    /// deployments stay tracked as stopped until the inactivity or max-age
    /// sweep reaps them (or activity reactivates them). Returns false when
    /// the project is not tracked.
    pub async fn stop(&self, project_id: &str) -> bool {
        {
            let mut entries = self.entries.lock().await;
            let Some(entry) = entries.get_mut(project_id) else {
                return false;
            };
            entry.is_active = false;
        }

        if !self.config.demo_mode {
            info!(
                project_id = project_id,
                "Stop requested, deployment will be reaped by lifecycle limits"
            );
            return true;
        }

        info!(
            project_id = project_id,
            grace_secs = self.config.stop_grace.as_secs(),
            "Stop requested, cleanup scheduled"
        );

        let entries = self.entries.clone();
        let provider = self.provider.clone();
        let store = self.store.clone();
        let grace = self.config.stop_grace;
        let project_id = project_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            Self::cleanup_inner(&entries, &provider, &store, &project_id, CleanupReason::Stopped)
                .await;
        });
        true
    }

    /// Delete one deployment and forget it. Returns true when the provider
    /// delete succeeded (or the entry was already gone).
    pub async fn cleanup(&self, project_id: &str, reason: CleanupReason) -> bool {
        Self::cleanup_inner(&self.entries, &self.provider, &self.store, project_id, reason).await
    }

    /// Shared cleanup: the entry is removed first so concurrent sweeps and
    /// stops cannot issue a second delete for the same deployment.
    async fn cleanup_inner(
        entries: &Entries,
        provider: &Arc<dyn CloudProvider>,
        store: &Arc<dyn RecordStore>,
        project_id: &str,
        reason: CleanupReason,
    ) -> bool {
        let Some(entry) = entries.lock().await.remove(project_id) else {
            debug!(project_id = project_id, "Cleanup skipped, entry already gone");
            return true;
        };

        info!(
            project_id = project_id,
            container_name = %entry.container_name,
            reason = %reason,
            "Cleaning up deployment"
        );

        let deleted = match provider
            .delete_deployment(entry.target, &entry.container_name)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                // Entry stays removed: the deployment will not be retried,
                // provider-side garbage collection handles the leftovers.
                error!(
                    container_name = %entry.container_name,
                    error = %e,
                    "Provider delete failed"
                );
                false
            }
        };

        if let Err(e) = store.remove(project_id).await {
            warn!(project_id = project_id, error = %e, "Failed to remove record");
        }

        deleted
    }

    /// Why an entry is due for cleanup, if it is. Max-age wins over
    /// everything else; stopped entries are reaped eagerly only in demo mode.
    fn due_reason(&self, entry: &LifecycleEntry, now: DateTime<Utc>) -> Option<CleanupReason> {
        let age = (now - entry.deployed_at).to_std().unwrap_or_default();
        if age >= self.config.max_age {
            return Some(CleanupReason::MaxAge);
        }
        if self.config.demo_mode && !entry.is_active {
            return Some(CleanupReason::Stopped);
        }
        let idle = (now - entry.last_activity).to_std().unwrap_or_default();
        if idle >= self.config.inactivity_timeout {
            return Some(CleanupReason::Inactive);
        }
        None
    }

    /// Sweep the registry once, cleaning up every due entry.
    pub async fn sweep(&self) -> CleanupStats {
        let now = Utc::now();
        let due: Vec<(String, CleanupReason)> = {
            let entries = self.entries.lock().await;
            entries
                .values()
                .filter_map(|e| {
                    self.due_reason(e, now)
                        .map(|reason| (e.project_id.clone(), reason))
                })
                .collect()
        };

        let mut stats = CleanupStats::default();
        for (project_id, reason) in due {
            if self.cleanup(&project_id, reason).await {
                stats.succeeded += 1;
            } else {
                stats.failed += 1;
            }
        }

        if stats.succeeded > 0 || stats.failed > 0 {
            info!(
                cleaned = stats.succeeded,
                failed = stats.failed,
                "Lifecycle sweep complete"
            );
        }
        stats
    }

    /// Delete every tracked deployment concurrently, aggregating counts.
    pub async fn cleanup_all(&self) -> CleanupStats {
        let project_ids: Vec<String> = self.entries.lock().await.keys().cloned().collect();
        if project_ids.is_empty() {
            return CleanupStats::default();
        }

        info!(count = project_ids.len(), "Cleaning up all deployments");

        let mut set = JoinSet::new();
        for project_id in project_ids {
            let entries = self.entries.clone();
            let provider = self.provider.clone();
            let store = self.store.clone();
            set.spawn(async move {
                Self::cleanup_inner(
                    &entries,
                    &provider,
                    &store,
                    &project_id,
                    CleanupReason::Shutdown,
                )
                .await
            });
        }

        let mut stats = CleanupStats::default();
        while let Some(result) = set.join_next().await {
            match result {
                Ok(true) => stats.succeeded += 1,
                Ok(false) => stats.failed += 1,
                Err(e) => {
                    error!(error = %e, "Cleanup task panicked");
                    stats.failed += 1;
                }
            }
        }
        stats
    }

    /// Registry counts and active policy.
    pub async fn stats(&self) -> ReaperStats {
        let entries = self.entries.lock().await;
        ReaperStats {
            active: entries.values().filter(|e| e.is_active).count(),
            tracked: entries.len(),
            demo_mode: self.config.demo_mode,
            poll_interval: self.config.poll_interval,
            inactivity_timeout: self.config.inactivity_timeout,
            max_age: self.config.max_age,
        }
    }

    /// Snapshot of all tracked deployments.
    pub async fn active_deployments(&self) -> Vec<LifecycleEntry> {
        self.entries.lock().await.values().cloned().collect()
    }

    /// Run the reaper loop.
    ///
    /// Sweeps on every poll interval; exits when the shutdown signal is
    /// received.
    pub async fn run(&self) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            inactivity_timeout_secs = self.config.inactivity_timeout.as_secs(),
            max_age_secs = self.config.max_age.as_secs(),
            "Lifecycle reaper started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Lifecycle reaper received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {
                    self.sweep().await;
                }
            }
        }

        info!("Lifecycle reaper stopped");
    }

    /// Backdate an entry's clocks, for expiry tests.
    #[cfg(test)]
    pub async fn backdate(
        &self,
        project_id: &str,
        deployed_at: DateTime<Utc>,
        last_activity: DateTime<Utc>,
    ) {
        if let Some(entry) = self.entries.lock().await.get_mut(project_id) {
            entry.deployed_at = deployed_at;
            entry.last_activity = last_activity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use skydock_core::MemoryStore;

    use crate::provider::{DeploymentSpec, SimulatedProvider};

    fn fast_config() -> ReaperConfig {
        ReaperConfig {
            poll_interval: Duration::from_millis(10),
            inactivity_timeout: Duration::from_secs(2 * 3600),
            max_age: Duration::from_secs(6 * 3600),
            stop_grace: Duration::from_millis(10),
            demo_mode: true,
        }
    }

    fn live_config() -> ReaperConfig {
        ReaperConfig {
            demo_mode: false,
            ..fast_config()
        }
    }

    async fn deployed_provider(name: &str) -> Arc<SimulatedProvider> {
        let provider = Arc::new(SimulatedProvider::new());
        provider
            .create_or_update(&DeploymentSpec {
                container_name: name.to_string(),
                image: "img".to_string(),
                image_tag: "latest".to_string(),
                app_port: 3000,
                region: "southeastasia".to_string(),
                resource_group: "skydock-rg".to_string(),
                environment_name: "skydock-env".to_string(),
                target: DeploymentTarget::ContainerApp,
                context_archive: None,
            })
            .await
            .unwrap();
        provider
    }

    #[tokio::test]
    async fn test_register_touch_and_stats() {
        let provider = Arc::new(SimulatedProvider::new());
        let store = Arc::new(MemoryStore::new());
        let reaper = LifecycleReaper::new(provider, store, fast_config());

        reaper
            .register("p1", "app-a-b", DeploymentTarget::ContainerApp)
            .await;
        let stats = reaper.stats().await;
        assert_eq!(stats.active, 1);
        assert_eq!(stats.tracked, 1);
        assert!(stats.demo_mode);

        reaper.touch("p1").await;
        reaper.touch("unknown").await; // ignored

        let active = reaper.active_deployments().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].container_name, "app-a-b");
        assert!(active[0].is_active);
    }

    #[tokio::test]
    async fn test_sweep_ignores_fresh_entries() {
        let provider = Arc::new(SimulatedProvider::new());
        let store = Arc::new(MemoryStore::new());
        let reaper = LifecycleReaper::new(provider, store, fast_config());

        reaper
            .register("p1", "app-a-b", DeploymentTarget::ContainerApp)
            .await;
        let stats = reaper.sweep().await;
        assert_eq!(stats, CleanupStats::default());
        assert_eq!(reaper.stats().await.active, 1);
    }

    #[tokio::test]
    async fn test_sweep_reaps_inactive_entry() {
        let provider = deployed_provider("app-a-b").await;
        let store = Arc::new(MemoryStore::new());
        let reaper = LifecycleReaper::new(provider.clone(), store, fast_config());

        reaper
            .register("p1", "app-a-b", DeploymentTarget::ContainerApp)
            .await;
        let now = Utc::now();
        reaper
            .backdate("p1", now - ChronoDuration::hours(3), now - ChronoDuration::hours(3))
            .await;

        let stats = reaper.sweep().await;
        assert_eq!(stats.succeeded, 1);
        assert_eq!(reaper.stats().await.active, 0);
        assert_eq!(provider.delete_calls.lock().await.as_slice(), ["app-a-b"]);
    }

    #[tokio::test]
    async fn test_max_age_wins_over_inactivity() {
        let provider = deployed_provider("app-a-b").await;
        let store = Arc::new(MemoryStore::new());
        let reaper = LifecycleReaper::new(provider, store, fast_config());

        reaper
            .register("p1", "app-a-b", DeploymentTarget::ContainerApp)
            .await;
        let now = Utc::now();
        // Both limits exceeded; max-age takes precedence.
        reaper
            .backdate("p1", now - ChronoDuration::hours(7), now - ChronoDuration::hours(3))
            .await;

        let entry = reaper.active_deployments().await.remove(0);
        assert_eq!(reaper.due_reason(&entry, now), Some(CleanupReason::MaxAge));
    }

    #[tokio::test]
    async fn test_recent_activity_defers_inactivity_reap() {
        let provider = Arc::new(SimulatedProvider::new());
        let store = Arc::new(MemoryStore::new());
        let reaper = LifecycleReaper::new(provider, store, fast_config());

        reaper
            .register("p1", "app-a-b", DeploymentTarget::ContainerApp)
            .await;
        let now = Utc::now();
        // Old deployment, but touched recently and under max age.
        reaper
            .backdate("p1", now - ChronoDuration::hours(5), now - ChronoDuration::minutes(5))
            .await;

        let entry = reaper.active_deployments().await.remove(0);
        assert_eq!(reaper.due_reason(&entry, now), None);
    }

    #[tokio::test]
    async fn test_stop_cleans_up_after_grace() {
        let provider = deployed_provider("app-a-b").await;
        let store = Arc::new(MemoryStore::new());
        let reaper = LifecycleReaper::new(provider.clone(), store, fast_config());

        reaper
            .register("p1", "app-a-b", DeploymentTarget::ContainerApp)
            .await;
        assert!(reaper.stop("p1").await);
        // Still tracked (as stopped) during the grace window.
        assert_eq!(reaper.stats().await.tracked, 1);
        assert_eq!(reaper.stats().await.active, 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(reaper.stats().await.tracked, 0);
        assert_eq!(provider.delete_calls.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_stop_outside_demo_keeps_deployment() {
        let provider = deployed_provider("app-a-b").await;
        let store = Arc::new(MemoryStore::new());
        let reaper = LifecycleReaper::new(provider.clone(), store, live_config());

        reaper
            .register("p1", "app-a-b", DeploymentTarget::ContainerApp)
            .await;
        assert!(reaper.stop("p1").await);

        // No grace-delay delete outside demo mode; the entry stays tracked.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let stats = reaper.stats().await;
        assert_eq!(stats.tracked, 1);
        assert_eq!(stats.active, 0);
        assert!(provider.delete_calls.lock().await.is_empty());

        // A fresh stopped entry is not due; activity reactivates it.
        assert_eq!(reaper.sweep().await, CleanupStats::default());
        reaper.touch("p1").await;
        assert_eq!(reaper.stats().await.active, 1);

        // Inactivity still reaps it eventually.
        let now = Utc::now();
        reaper
            .backdate("p1", now - ChronoDuration::hours(3), now - ChronoDuration::hours(3))
            .await;
        let stats = reaper.sweep().await;
        assert_eq!(stats.succeeded, 1);
        assert_eq!(provider.delete_calls.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_demo_stopped_entry_is_due_for_sweep() {
        let provider = Arc::new(SimulatedProvider::new());
        let store = Arc::new(MemoryStore::new());
        // Long grace so the scheduled cleanup cannot fire during the test.
        let config = ReaperConfig {
            stop_grace: Duration::from_secs(3600),
            ..fast_config()
        };
        let reaper = LifecycleReaper::new(provider, store, config);

        reaper
            .register("p1", "app-a-b", DeploymentTarget::ContainerApp)
            .await;
        assert!(reaper.stop("p1").await);

        let entry = reaper.active_deployments().await.remove(0);
        assert_eq!(
            reaper.due_reason(&entry, Utc::now()),
            Some(CleanupReason::Stopped)
        );
    }

    #[tokio::test]
    async fn test_stop_unknown_project_is_false() {
        let provider = Arc::new(SimulatedProvider::new());
        let store = Arc::new(MemoryStore::new());
        let reaper = LifecycleReaper::new(provider, store, fast_config());
        assert!(!reaper.stop("nope").await);
    }

    #[tokio::test]
    async fn test_delete_failure_still_removes_entry() {
        let provider = Arc::new(SimulatedProvider::failing_deletes());
        let store = Arc::new(MemoryStore::new());
        let reaper = LifecycleReaper::new(provider.clone(), store, fast_config());

        reaper
            .register("p1", "app-a-b", DeploymentTarget::ContainerApp)
            .await;
        let deleted = reaper.cleanup("p1", CleanupReason::Inactive).await;
        assert!(!deleted);
        assert_eq!(reaper.stats().await.active, 0);
    }

    #[tokio::test]
    async fn test_cleanup_all_aggregates_counts() {
        let provider = Arc::new(SimulatedProvider::new());
        let store = Arc::new(MemoryStore::new());
        let reaper = LifecycleReaper::new(provider.clone(), store, fast_config());

        for i in 0..3 {
            let name = format!("app-a-{i}");
            provider
                .seed(crate::provider::ProviderDeployment {
                    name: name.clone(),
                    state: crate::provider::ProvisioningState::Succeeded,
                    fqdn: None,
                    ip_address: None,
                    app_port: None,
                    region: "southeastasia".to_string(),
                    target: DeploymentTarget::ContainerApp,
                })
                .await;
            reaper
                .register(&format!("p{i}"), &name, DeploymentTarget::ContainerApp)
                .await;
        }

        let stats = reaper.cleanup_all().await;
        assert_eq!(stats.succeeded, 3);
        assert_eq!(stats.failed, 0);
        assert_eq!(reaper.stats().await.active, 0);
    }

    #[tokio::test]
    async fn test_double_cleanup_deletes_once() {
        let provider = deployed_provider("app-a-b").await;
        let store = Arc::new(MemoryStore::new());
        let reaper = LifecycleReaper::new(provider.clone(), store, fast_config());

        reaper
            .register("p1", "app-a-b", DeploymentTarget::ContainerApp)
            .await;
        assert!(reaper.cleanup("p1", CleanupReason::Stopped).await);
        assert!(reaper.cleanup("p1", CleanupReason::Stopped).await);
        assert_eq!(provider.delete_calls.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_run_loop_shuts_down() {
        let provider = Arc::new(SimulatedProvider::new());
        let store = Arc::new(MemoryStore::new());
        let reaper = Arc::new(LifecycleReaper::new(provider, store, fast_config()));

        let shutdown = reaper.shutdown_handle();
        let run_reaper = reaper.clone();
        let handle = tokio::spawn(async move { run_reaper.run().await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reaper did not shut down")
            .unwrap();
    }
}
