// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Skydock Deploy - Deployment Orchestration
//!
//! This crate takes the build artifacts produced by `skydock-core` and turns
//! them into running cloud deployments. It handles provider calls, region
//! fallback, convergence polling, status reconciliation, and lifecycle
//! reaping.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Application                           │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 skydock-deploy (This Crate)                  │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────┐   │
//! │  │ Orchestrator │  │    Status    │  │     Lifecycle     │   │
//! │  │ (deploy path)│  │  Reconciler  │  │      Reaper       │   │
//! │  └──────────────┘  └──────────────┘  └───────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//!          │                  │                    │
//!          ▼                  ▼                    ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │              CloudProvider (trait)                           │
//! │         simulated (demo/tests) | real backends               │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Deploy flow
//!
//! 1. Intake: classify the upload ([`orchestrator::Orchestrator::prepare_project`])
//! 2. Name derivation and build-context preparation (skydock-core)
//! 3. Region walk: primary region, then fallbacks in order
//! 4. Convergence polling with a fixed window
//! 5. Record persistence and lifecycle registration
//!
//! # Modules
//!
//! - [`config`]: environment-driven configuration
//! - [`provider`]: the [`provider::CloudProvider`] trait and simulated backend
//! - [`orchestrator`]: the deploy path
//! - [`status`]: status reconciliation with degraded reads
//! - [`lifecycle`]: inactivity/max-age reaping
//! - [`runtime`]: embeddable runtime wiring it all together

#![deny(missing_docs)]

/// Deployment configuration loaded from environment variables.
pub mod config;

/// Error types for deployment orchestration.
pub mod error;

/// Background reaper for deployment lifecycle limits.
pub mod lifecycle;

/// Deployment orchestration: intake, region fallback, convergence polling.
pub mod orchestrator;

/// Cloud deployment backends.
pub mod provider;

/// Embeddable runtime for skydock-deploy.
pub mod runtime;

/// Status reconciliation.
pub mod status;

pub use config::Config;
pub use error::DeployError;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use runtime::DeployRuntime;
