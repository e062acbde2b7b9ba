// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runtime detection and best-effort port sniffing.
//!
//! Detection is pure classification over a relative-path file list. Port
//! sniffing inspects well-known entry files with regular expressions; it is a
//! heuristic, never an error — any failure falls back to the runtime default.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::project::Runtime;

/// Classify a project file list into a [`Runtime`].
///
/// Runtimes are tried in [`Runtime::DETECTION_ORDER`]; the first runtime with
/// a matching marker wins. Markers starting with `.` match file extensions,
/// anything else matches the file name exactly.
///
/// Fails with [`CoreError::UnsupportedRuntime`] when nothing matches. This is
/// terminal: no build or deploy is attempted for an unclassifiable project.
pub fn detect_runtime<S: AsRef<str>>(files: &[S]) -> Result<Runtime> {
    for runtime in Runtime::DETECTION_ORDER {
        for marker in runtime.marker_files() {
            if files.iter().any(|f| matches_marker(f.as_ref(), marker)) {
                debug!(runtime = %runtime, marker = marker, "Runtime detected");
                return Ok(runtime);
            }
        }
    }
    Err(CoreError::UnsupportedRuntime)
}

fn matches_marker(path: &str, marker: &str) -> bool {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    if let Some(ext_marker) = marker.strip_prefix('.') {
        // Extension marker: ".csproj" matches "MyApp.csproj" but not ".csproj" alone.
        file_name
            .rsplit_once('.')
            .is_some_and(|(stem, ext)| !stem.is_empty() && ext == ext_marker)
    } else {
        file_name == marker
    }
}

/// Detect the application port for a runtime, falling back to its default.
///
/// Only Node and Python projects are scanned; all other runtimes use the
/// default directly. Any read or parse failure silently yields the default.
pub async fn detect_port(runtime: Runtime, project_dir: &Path) -> u16 {
    let detected = match runtime {
        Runtime::Node => detect_node_port(project_dir).await,
        Runtime::Python => detect_python_port(project_dir).await,
        _ => None,
    };
    match detected {
        Some(port) => {
            debug!(runtime = %runtime, port = port, "Detected application port");
            port
        }
        None => runtime.default_port(),
    }
}

fn script_port_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)PORT[=\s]+(\d+)").unwrap())
}

fn listen_port_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:listen|port)\D{0,24}?(\d{4,5})").unwrap())
}

fn python_port_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)port\s*=\s*(\d{4,5})").unwrap())
}

async fn detect_node_port(project_dir: &Path) -> Option<u16> {
    // package.json start/dev scripts first: an explicit PORT wins.
    if let Ok(raw) = tokio::fs::read_to_string(project_dir.join("package.json")).await
        && let Ok(pkg) = serde_json::from_str::<serde_json::Value>(&raw)
    {
        let scripts = &pkg["scripts"];
        for key in ["start", "dev"] {
            if let Some(script) = scripts[key].as_str()
                && let Some(port) = first_capture(script_port_re(), script)
            {
                return Some(port);
            }
        }
    }

    // Then known entry files for a listen()/port token.
    for entry in ["app.js", "index.js", "server.js"] {
        if let Ok(content) = tokio::fs::read_to_string(project_dir.join(entry)).await
            && let Some(port) = first_capture(listen_port_re(), &content)
        {
            return Some(port);
        }
    }
    None
}

async fn detect_python_port(project_dir: &Path) -> Option<u16> {
    for entry in ["app.py", "main.py", "run.py"] {
        if let Ok(content) = tokio::fs::read_to_string(project_dir.join(entry)).await
            && let Some(port) = first_capture(python_port_re(), &content)
        {
            return Some(port);
        }
    }
    None
}

fn first_capture(re: &Regex, haystack: &str) -> Option<u16> {
    re.captures(haystack)?.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_node_beats_static() {
        let files = ["index.html", "package.json", "styles.css"];
        assert_eq!(detect_runtime(&files).unwrap(), Runtime::Node);
    }

    #[test]
    fn test_python_beats_static() {
        let files = ["requirements.txt", "index.html"];
        assert_eq!(detect_runtime(&files).unwrap(), Runtime::Python);
    }

    #[test]
    fn test_static_only() {
        let files = ["index.html", "styles.css", "script.js"];
        // script.js is not a Node marker; index.html wins as Static.
        assert_eq!(detect_runtime(&files).unwrap(), Runtime::Static);
    }

    #[test]
    fn test_extension_markers() {
        assert_eq!(detect_runtime(&["MyApp.csproj"]).unwrap(), Runtime::DotNet);
        assert_eq!(detect_runtime(&["src/Main.java"]).unwrap(), Runtime::Java);
        assert_eq!(detect_runtime(&["docs/page.htm"]).unwrap(), Runtime::Static);
    }

    #[test]
    fn test_nested_paths() {
        let files = ["src/server.js", "README.md"];
        assert_eq!(detect_runtime(&files).unwrap(), Runtime::Node);
    }

    #[test]
    fn test_unsupported() {
        let files = ["README.md", "photo.png"];
        assert!(matches!(
            detect_runtime(&files),
            Err(CoreError::UnsupportedRuntime)
        ));
    }

    #[test]
    fn test_empty_file_list() {
        let files: [&str; 0] = [];
        assert!(matches!(
            detect_runtime(&files),
            Err(CoreError::UnsupportedRuntime)
        ));
    }

    #[tokio::test]
    async fn test_node_port_from_start_script() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(
            dir.path().join("package.json"),
            r#"{"scripts": {"start": "PORT=4100 node server.js"}}"#,
        )
        .await
        .unwrap();

        assert_eq!(detect_port(Runtime::Node, dir.path()).await, 4100);
    }

    #[tokio::test]
    async fn test_node_port_from_entry_file() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(
            dir.path().join("app.js"),
            "const app = express();\napp.listen(8080);\n",
        )
        .await
        .unwrap();

        assert_eq!(detect_port(Runtime::Node, dir.path()).await, 8080);
    }

    #[tokio::test]
    async fn test_node_port_default() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("package.json"), "{}")
            .await
            .unwrap();

        assert_eq!(detect_port(Runtime::Node, dir.path()).await, 3000);
    }

    #[tokio::test]
    async fn test_node_port_malformed_package_json_falls_back() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("package.json"), "{not json")
            .await
            .unwrap();

        assert_eq!(detect_port(Runtime::Node, dir.path()).await, 3000);
    }

    #[tokio::test]
    async fn test_python_port_from_app_py() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(
            dir.path().join("app.py"),
            "app.run(host='0.0.0.0', port=5050)\n",
        )
        .await
        .unwrap();

        assert_eq!(detect_port(Runtime::Python, dir.path()).await, 5050);
    }

    #[tokio::test]
    async fn test_python_port_default() {
        let dir = TempDir::new().unwrap();
        assert_eq!(detect_port(Runtime::Python, dir.path()).await, 5000);
    }

    #[tokio::test]
    async fn test_static_port_never_scanned() {
        let dir = TempDir::new().unwrap();
        assert_eq!(detect_port(Runtime::Static, dir.path()).await, 80);
    }
}
