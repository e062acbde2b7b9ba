// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for skydock-core.

use thiserror::Error;

/// Core pipeline errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// No known runtime marker matched the project file list.
    ///
    /// Terminal and non-retryable: no build or deploy is attempted.
    #[error(
        "Unsupported runtime: no project markers found (supported: Node.js, Python, .NET, Java, static HTML)"
    )]
    UnsupportedRuntime,

    /// The derived container name violates platform naming constraints.
    #[error("Invalid container name '{0}': must match ^[a-z0-9][a-z0-9-]*$ with no trailing hyphen")]
    InvalidContainerName(String),

    /// The uploaded archive could not be read.
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    /// A persistence key contains characters unsafe for storage.
    #[error("Invalid record key '{0}'")]
    InvalidRecordKey(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
