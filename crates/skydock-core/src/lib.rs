// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Skydock Core - Code-to-Container Pipeline
//!
//! This crate turns an uploaded source tree into everything a cloud provider
//! needs to run it: a detected runtime, an application port, a generated
//! Dockerfile, a gzipped build-context archive, and a deterministic container
//! name. It also defines the persisted deployment record and its stores.
//!
//! # Pipeline
//!
//! ```text
//! file list ──► detect::detect_runtime ──► Runtime
//!                                            │
//! source dir ─► detect::detect_port ────► app_port
//!                                            │
//!                     dockerfile::generate ──┤
//!                                            ▼
//!                              ProjectDescriptor
//!                                            │
//!                        build_context::build│
//!                                            ▼
//!                                  BuildArtifact ──► provider deploy
//! ```
//!
//! Deployment orchestration itself (provider calls, region fallback,
//! convergence polling, lifecycle reaping) lives in `skydock-deploy`; this
//! crate is provider-agnostic.
//!
//! # Modules
//!
//! - [`project`]: [`project::Runtime`], [`project::DeploymentTarget`] and the
//!   immutable [`project::ProjectDescriptor`]
//! - [`detect`]: marker-based runtime classification and port sniffing
//! - [`naming`]: deterministic container-name derivation
//! - [`dockerfile`]: per-runtime Dockerfile templates
//! - [`build_context`]: build-context archive preparation
//! - [`record`]: the persisted [`record::DeploymentRecord`]
//! - [`persistence`]: [`persistence::RecordStore`] and its implementations

#![deny(missing_docs)]

/// Build-context archive preparation.
pub mod build_context;

/// Runtime detection and port sniffing heuristics.
pub mod detect;

/// Per-runtime Dockerfile templates.
pub mod dockerfile;

/// Error types for core pipeline operations.
pub mod error;

/// Deterministic container-name derivation and validation.
pub mod naming;

/// Deployment record persistence.
pub mod persistence;

/// Project descriptors and the supported runtime set.
pub mod project;

/// Persisted deployment records.
pub mod record;

pub use build_context::BuildArtifact;
pub use error::CoreError;
pub use persistence::{JsonFileStore, MemoryStore, RecordStore};
pub use project::{DeploymentTarget, ProjectDescriptor, Runtime};
pub use record::{BuildInfo, DeploymentRecord, DeploymentStatus};
