// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Project descriptors and the closed set of supported runtimes.
//!
//! A [`Runtime`] is a tagged variant, not a string key: every dispatch over
//! runtimes is an exhaustive match, so an unsupported value cannot slip
//! through configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application runtime detected from project files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    /// Static HTML/CSS/JS website served by nginx.
    Static,
    /// Node.js application.
    Node,
    /// Python application.
    Python,
    /// .NET application.
    DotNet,
    /// Java application.
    Java,
}

impl Runtime {
    /// Detection priority: framework markers before the generic HTML marker.
    ///
    /// A project containing both `package.json` and `index.html` is Node, not
    /// Static, because framework marker files are the more specific signal.
    pub const DETECTION_ORDER: [Runtime; 5] = [
        Runtime::Node,
        Runtime::Python,
        Runtime::DotNet,
        Runtime::Java,
        Runtime::Static,
    ];

    /// Marker file names (or extensions, when starting with `.`) that
    /// identify this runtime.
    pub fn marker_files(&self) -> &'static [&'static str] {
        match self {
            Runtime::Static => &["index.html", ".html", ".htm"],
            Runtime::Node => &["package.json", "app.js", "index.js", "server.js"],
            Runtime::Python => &["requirements.txt", "app.py", "main.py", "run.py", "manage.py"],
            Runtime::DotNet => &[".csproj", ".sln", "Program.cs"],
            Runtime::Java => &["pom.xml", "build.gradle", ".java"],
        }
    }

    /// Default application port when no explicit port is found in the source.
    pub fn default_port(&self) -> u16 {
        match self {
            Runtime::Static => 80,
            Runtime::Node => 3000,
            Runtime::Python => 5000,
            Runtime::DotNet => 80,
            Runtime::Java => 8080,
        }
    }

    /// Base container image used when no custom image is built.
    pub fn base_image(&self) -> &'static str {
        match self {
            Runtime::Static => "nginx:alpine",
            Runtime::Node => "node:18-alpine",
            Runtime::Python => "python:3.11-slim",
            Runtime::DotNet => "mcr.microsoft.com/dotnet/aspnet:6.0",
            Runtime::Java => "openjdk:11-jre-slim",
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Runtime::Static => "Static HTML/CSS/JS Website",
            Runtime::Node => "Node.js Application",
            Runtime::Python => "Python Application",
            Runtime::DotNet => ".NET Application",
            Runtime::Java => "Java Application",
        }
    }

    /// Short identifier used in records and image tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Runtime::Static => "static",
            Runtime::Node => "node",
            Runtime::Python => "python",
            Runtime::DotNet => "dotnet",
            Runtime::Java => "java",
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which cloud compute product deployments are created on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentTarget {
    /// Managed serverless containers.
    ContainerApp,
    /// PaaS web app for containers.
    WebApp,
    /// Raw container instances.
    Instances,
}

impl DeploymentTarget {
    /// Identifier used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentTarget::ContainerApp => "containerapp",
            DeploymentTarget::WebApp => "webapp",
            DeploymentTarget::Instances => "instances",
        }
    }

    /// The one other target checked when a deployment is not found under the
    /// configured target (it may have been created under a previous
    /// configuration).
    pub fn alternate(&self) -> DeploymentTarget {
        match self {
            DeploymentTarget::ContainerApp => DeploymentTarget::Instances,
            DeploymentTarget::WebApp => DeploymentTarget::ContainerApp,
            DeploymentTarget::Instances => DeploymentTarget::ContainerApp,
        }
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "containerapp" => Ok(DeploymentTarget::ContainerApp),
            "webapp" => Ok(DeploymentTarget::WebApp),
            "instances" => Ok(DeploymentTarget::Instances),
            other => Err(format!(
                "unknown deployment target '{}' (expected containerapp, webapp, or instances)",
                other
            )),
        }
    }
}

/// Descriptor for one uploaded project, created at intake and immutable for
/// the lifetime of a deployment attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    /// Opaque project identifier generated at intake.
    pub project_id: String,
    /// Identifier of the uploading client.
    pub client_id: String,
    /// Detected runtime.
    pub runtime: Runtime,
    /// Application port (detected or runtime default).
    pub app_port: u16,
    /// Extracted source directory.
    pub source_path: PathBuf,
    /// Generated Dockerfile content.
    pub dockerfile_content: String,
}

/// Generate a fresh opaque project identifier.
pub fn new_project_id() -> String {
    Uuid::new_v4().to_string()
}
