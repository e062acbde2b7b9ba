// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Dockerfile generation per runtime.
//!
//! Templates are synthesized from the detected runtime plus a light inspection
//! of the project directory (entry file, lockfile, engine hints). Generation
//! never fails: if inspection errors, the template falls back to safe
//! defaults.

use std::path::Path;

use tracing::debug;

use crate::project::Runtime;

/// `.dockerignore` content written next to every generated Dockerfile.
pub const DOCKERIGNORE: &str = "node_modules\n.git\n.env\n*.log\n__pycache__\n";

/// Generate Dockerfile content for a project.
pub async fn generate(runtime: Runtime, app_port: u16, project_dir: &Path) -> String {
    let content = match runtime {
        Runtime::Node => node_dockerfile(app_port, project_dir).await,
        Runtime::Python => python_dockerfile(app_port, project_dir).await,
        Runtime::DotNet => dotnet_dockerfile(app_port),
        Runtime::Java => java_dockerfile(app_port),
        Runtime::Static => static_dockerfile(),
    };
    debug!(runtime = %runtime, port = app_port, "Generated Dockerfile");
    content
}

async fn node_dockerfile(app_port: u16, project_dir: &Path) -> String {
    let pkg = read_package_json(project_dir).await;

    let node_version = pkg
        .as_ref()
        .and_then(|p| p["engines"]["node"].as_str())
        .and_then(major_version)
        .unwrap_or(18);

    let has_start_script = pkg
        .as_ref()
        .is_some_and(|p| p["scripts"]["start"].as_str().is_some());
    let main = pkg
        .as_ref()
        .and_then(|p| p["main"].as_str().map(str::to_owned))
        .unwrap_or_else(|| "index.js".to_string());
    let start_cmd = if has_start_script {
        r#"CMD ["npm", "start"]"#.to_string()
    } else {
        format!(r#"CMD ["node", "{main}"]"#)
    };

    format!(
        r#"FROM node:{node_version}-alpine AS deps
WORKDIR /app
COPY package*.json ./
RUN npm ci --omit=dev 2>/dev/null || npm install --omit=dev

FROM node:{node_version}-alpine
WORKDIR /app
ENV NODE_ENV=production
ENV PORT={app_port}
COPY --from=deps /app/node_modules ./node_modules
COPY . .
RUN addgroup -S app && adduser -S app -G app && chown -R app:app /app
USER app
EXPOSE {app_port}
{start_cmd}
"#
    )
}

async fn python_dockerfile(app_port: u16, project_dir: &Path) -> String {
    let entry = python_entry(project_dir).await;

    format!(
        r#"FROM python:3.11-slim AS deps
WORKDIR /app
COPY requirements.txt ./
RUN pip install --no-cache-dir --prefix=/install -r requirements.txt 2>/dev/null || true

FROM python:3.11-slim
WORKDIR /app
ENV PYTHONUNBUFFERED=1
ENV PORT={app_port}
COPY --from=deps /install /usr/local
COPY . .
RUN useradd --create-home app && chown -R app:app /app
USER app
EXPOSE {app_port}
CMD ["python", "{entry}"]
"#
    )
}

fn dotnet_dockerfile(app_port: u16) -> String {
    format!(
        r#"FROM mcr.microsoft.com/dotnet/sdk:6.0 AS build
WORKDIR /src
COPY . .
RUN dotnet publish -c Release -o /app/publish

FROM mcr.microsoft.com/dotnet/aspnet:6.0
WORKDIR /app
ENV ASPNETCORE_URLS=http://+:{app_port}
COPY --from=build /app/publish .
EXPOSE {app_port}
ENTRYPOINT ["dotnet", "app.dll"]
"#
    )
}

fn java_dockerfile(app_port: u16) -> String {
    format!(
        r#"FROM maven:3.8-openjdk-11 AS build
WORKDIR /src
COPY . .
RUN mvn package -DskipTests -q

FROM openjdk:11-jre-slim
WORKDIR /app
ENV SERVER_PORT={app_port}
COPY --from=build /src/target/*.jar app.jar
EXPOSE {app_port}
ENTRYPOINT ["java", "-jar", "app.jar"]
"#
    )
}

fn static_dockerfile() -> String {
    r#"FROM nginx:alpine
COPY . /usr/share/nginx/html
RUN printf 'server {\n  listen 80;\n  root /usr/share/nginx/html;\n  index index.html;\n  location / {\n    try_files $uri $uri/ /index.html;\n  }\n}\n' > /etc/nginx/conf.d/default.conf
EXPOSE 80
CMD ["nginx", "-g", "daemon off;"]
"#
    .to_string()
}

async fn read_package_json(project_dir: &Path) -> Option<serde_json::Value> {
    let raw = tokio::fs::read_to_string(project_dir.join("package.json"))
        .await
        .ok()?;
    serde_json::from_str(&raw).ok()
}

/// Parse the major version out of an engines constraint like `>=20.0.0`.
fn major_version(constraint: &str) -> Option<u32> {
    let digits: String = constraint
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Pick the Python entry file: conventional names first, then any `.py` in
/// the project root, then `app.py` as a last resort.
async fn python_entry(project_dir: &Path) -> String {
    for candidate in ["app.py", "main.py", "run.py"] {
        if tokio::fs::try_exists(project_dir.join(candidate))
            .await
            .unwrap_or(false)
        {
            return candidate.to_string();
        }
    }

    if let Ok(mut entries) = tokio::fs::read_dir(project_dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            if let Some(name) = name.to_str()
                && name.ends_with(".py")
            {
                return name.to_string();
            }
        }
    }
    "app.py".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_node_uses_npm_start_when_script_present() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(
            dir.path().join("package.json"),
            r#"{"scripts": {"start": "node server.js"}}"#,
        )
        .await
        .unwrap();

        let dockerfile = generate(Runtime::Node, 3000, dir.path()).await;
        assert!(dockerfile.contains(r#"CMD ["npm", "start"]"#));
        assert!(dockerfile.contains("FROM node:18-alpine"));
        assert!(dockerfile.contains("EXPOSE 3000"));
        assert!(dockerfile.contains("USER app"));
    }

    #[tokio::test]
    async fn test_node_falls_back_to_main_entry() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("package.json"), r#"{"main": "server.js"}"#)
            .await
            .unwrap();

        let dockerfile = generate(Runtime::Node, 3000, dir.path()).await;
        assert!(dockerfile.contains(r#"CMD ["node", "server.js"]"#));
    }

    #[tokio::test]
    async fn test_node_honors_engine_version() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(
            dir.path().join("package.json"),
            r#"{"engines": {"node": ">=20.0.0"}}"#,
        )
        .await
        .unwrap();

        let dockerfile = generate(Runtime::Node, 3000, dir.path()).await;
        assert!(dockerfile.contains("FROM node:20-alpine"));
    }

    #[tokio::test]
    async fn test_node_without_package_json_still_generates() {
        let dir = TempDir::new().unwrap();
        let dockerfile = generate(Runtime::Node, 3000, dir.path()).await;
        assert!(dockerfile.contains("FROM node:18-alpine"));
        assert!(dockerfile.contains(r#"CMD ["node", "index.js"]"#));
    }

    #[tokio::test]
    async fn test_python_picks_conventional_entry() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("main.py"), "print('hi')")
            .await
            .unwrap();

        let dockerfile = generate(Runtime::Python, 5000, dir.path()).await;
        assert!(dockerfile.contains(r#"CMD ["python", "main.py"]"#));
        assert!(dockerfile.contains("EXPOSE 5000"));
    }

    #[tokio::test]
    async fn test_python_falls_back_to_any_py_file() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("serve.py"), "print('hi')")
            .await
            .unwrap();

        let dockerfile = generate(Runtime::Python, 5000, dir.path()).await;
        assert!(dockerfile.contains(r#"CMD ["python", "serve.py"]"#));
    }

    #[tokio::test]
    async fn test_static_serves_spa_fallback() {
        let dir = TempDir::new().unwrap();
        let dockerfile = generate(Runtime::Static, 80, dir.path()).await;
        assert!(dockerfile.contains("FROM nginx:alpine"));
        assert!(dockerfile.contains("try_files $uri $uri/ /index.html"));
    }

    #[tokio::test]
    async fn test_dotnet_and_java_are_multi_stage() {
        let dir = TempDir::new().unwrap();
        let dotnet = generate(Runtime::DotNet, 80, dir.path()).await;
        assert!(dotnet.contains("AS build"));
        assert!(dotnet.contains("dotnet publish"));

        let java = generate(Runtime::Java, 8080, dir.path()).await;
        assert!(java.contains("AS build"));
        assert!(java.contains("mvn package"));
    }
}
