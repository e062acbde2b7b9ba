// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Build-context preparation.
//!
//! Writes the generated Dockerfile and `.dockerignore` into the extracted
//! source tree, then packs the tree into a gzipped tar archive suitable for a
//! remote image build. Static sites skip the archive entirely and deploy the
//! nginx base image directly.

use std::path::PathBuf;

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{debug, info};

use crate::dockerfile::DOCKERIGNORE;
use crate::error::Result;
use crate::project::{ProjectDescriptor, Runtime};

/// Result of build-context preparation for one project.
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    /// Gzipped tar archive of the source tree. `None` for static sites,
    /// which deploy a base image with no build step.
    pub context_archive: Option<PathBuf>,
    /// Fully qualified image reference to deploy.
    pub image: String,
    /// Tag recorded alongside the image.
    pub image_tag: String,
    /// True when the build step was skipped entirely.
    pub static_shortcut: bool,
}

/// Prepare the build context for a project.
///
/// Idempotent: rerunning overwrites the Dockerfile and `.dockerignore`
/// in place and recreates the archive rather than appending to it.
pub async fn build(project: &ProjectDescriptor, resource_group: &str) -> Result<BuildArtifact> {
    if project.runtime == Runtime::Static {
        info!(
            project_id = %project.project_id,
            "Static site: deploying base image without a build"
        );
        return Ok(BuildArtifact {
            context_archive: None,
            image: Runtime::Static.base_image().to_string(),
            image_tag: "nginx-alpine".to_string(),
            static_shortcut: true,
        });
    }

    tokio::fs::write(
        project.source_path.join("Dockerfile"),
        &project.dockerfile_content,
    )
    .await?;
    tokio::fs::write(project.source_path.join(".dockerignore"), DOCKERIGNORE).await?;

    let archive_path = archive_path_for(project);
    let source = project.source_path.clone();
    let dest = archive_path.clone();
    tokio::task::spawn_blocking(move || pack_archive(&source, &dest))
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))??;

    let image = image_reference(resource_group, &project.client_id, &project.project_id);
    debug!(
        project_id = %project.project_id,
        archive = %archive_path.display(),
        image = %image,
        "Build context packed"
    );

    Ok(BuildArtifact {
        context_archive: Some(archive_path),
        image,
        image_tag: "latest".to_string(),
        static_shortcut: false,
    })
}

/// Archive lands next to the source directory, never inside it, so repacking
/// does not tar the previous archive into itself.
fn archive_path_for(project: &ProjectDescriptor) -> PathBuf {
    let file_name = format!("{}-context.tar.gz", project.project_id);
    match project.source_path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

fn pack_archive(source: &std::path::Path, dest: &std::path::Path) -> std::io::Result<()> {
    let file = std::fs::File::create(dest)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", source)?;
    builder.into_inner()?.finish()?;
    Ok(())
}

/// Derive the image reference from the resource group registry and the short
/// client/project prefixes, matching container-name derivation.
fn image_reference(resource_group: &str, client_id: &str, project_id: &str) -> String {
    let registry: String = resource_group
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    let client_short: String = client_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(6)
        .collect::<String>()
        .to_lowercase();
    let project_short: String = project_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_lowercase();
    format!("{registry}registry.skydock.dev/app-{client_short}-{project_short}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use tempfile::TempDir;

    fn descriptor(runtime: Runtime, source: PathBuf) -> ProjectDescriptor {
        ProjectDescriptor {
            project_id: "11112222-3333-4444".to_string(),
            client_id: "client99".to_string(),
            runtime,
            app_port: runtime.default_port(),
            source_path: source,
            dockerfile_content: "FROM scratch\n".to_string(),
        }
    }

    #[tokio::test]
    async fn test_static_shortcut() {
        let dir = TempDir::new().unwrap();
        let project = descriptor(Runtime::Static, dir.path().to_path_buf());

        let artifact = build(&project, "skydock-rg").await.unwrap();
        assert!(artifact.static_shortcut);
        assert!(artifact.context_archive.is_none());
        assert_eq!(artifact.image, "nginx:alpine");
        assert_eq!(artifact.image_tag, "nginx-alpine");
        // The shortcut must not touch the source tree.
        assert!(!dir.path().join("Dockerfile").exists());
    }

    #[tokio::test]
    async fn test_packs_archive_with_dockerfile() {
        let root = TempDir::new().unwrap();
        let source = root.path().join("src");
        tokio::fs::create_dir(&source).await.unwrap();
        tokio::fs::write(source.join("app.js"), "console.log('hi')")
            .await
            .unwrap();

        let project = descriptor(Runtime::Node, source.clone());
        let artifact = build(&project, "skydock-rg").await.unwrap();

        assert!(!artifact.static_shortcut);
        assert_eq!(artifact.image_tag, "latest");
        assert_eq!(
            artifact.image,
            "skydockrgregistry.skydock.dev/app-client-11112222"
        );

        // Dockerfile and .dockerignore were written into the tree.
        let written = tokio::fs::read_to_string(source.join("Dockerfile"))
            .await
            .unwrap();
        assert_eq!(written, "FROM scratch\n");
        assert!(source.join(".dockerignore").exists());

        // Archive lives next to the source dir and contains both files.
        let archive = artifact.context_archive.unwrap();
        assert_eq!(archive.parent().unwrap(), root.path());
        let file = std::fs::File::open(&archive).unwrap();
        let mut tar = tar::Archive::new(GzDecoder::new(file));
        let names: Vec<String> = tar
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect();
        assert!(names.iter().any(|n| n.ends_with("app.js")));
        assert!(names.iter().any(|n| n.ends_with("Dockerfile")));
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let root = TempDir::new().unwrap();
        let source = root.path().join("src");
        tokio::fs::create_dir(&source).await.unwrap();
        tokio::fs::write(source.join("app.js"), "x").await.unwrap();

        let project = descriptor(Runtime::Node, source.clone());
        let first = build(&project, "rg").await.unwrap();
        let second = build(&project, "rg").await.unwrap();

        assert_eq!(first.context_archive, second.context_archive);
        // Second archive must not contain the first one nested inside.
        let file = std::fs::File::open(second.context_archive.unwrap()).unwrap();
        let mut tar = tar::Archive::new(GzDecoder::new(file));
        for entry in tar.entries().unwrap() {
            let entry = entry.unwrap();
            let path = entry.path().unwrap().display().to_string();
            assert!(!path.ends_with(".tar.gz"), "archive nested in itself: {path}");
        }
    }
}
