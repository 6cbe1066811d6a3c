//! Fixture builders shared by the integration tests

#![allow(dead_code)]

use argus::analysis::{Analysis, Facet};
use argus::detectors::{DetectContext, Detector, DetectorError, DetectorId, DetectorRegistry};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Writes `files` under `root`, creating parent directories
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
}

pub fn repo_with(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_files(dir.path(), files);
    dir
}

/// `go.mod` plus a single `main.go`
pub fn minimal_go_project() -> TempDir {
    repo_with(&[
        ("go.mod", "module test\n\ngo 1.21"),
        ("main.go", "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"hi\")\n}\n"),
    ])
}

/// React app with one runtime and one dev dependency
pub fn react_project() -> TempDir {
    repo_with(&[
        (
            "package.json",
            r#"{
  "name": "web",
  "version": "1.0.0",
  "scripts": {
    "build": "vite build",
    "test": "jest"
  },
  "dependencies": {
    "react": "^18.2.0"
  },
  "devDependencies": {
    "jest": "^29.7.0"
  }
}
"#,
        ),
        (
            "src/App.jsx",
            "import React from 'react';\n\nexport default function App() {\n  return <div>Hello</div>;\n}\n",
        ),
    ])
}

/// Express service with a handful of routes
pub fn express_service() -> TempDir {
    repo_with(&[
        (
            "package.json",
            r#"{"name": "api", "dependencies": {"express": "^4.18.2"}}"#,
        ),
        (
            "src/server.js",
            "const express = require('express');\nconst app = express();\n\napp.get('/health', (req, res) => res.send('ok'));\napp.post('/orders', createOrder);\napp.delete('/orders/:id', deleteOrder);\n\napp.listen(3000);\n",
        ),
        ("README.md", "# api\n\nOrder service.\n\n## Setup\n\n```bash\nnpm install\n```\n"),
    ])
}

/// npm workspaces monorepo with two apps and two packages
pub fn workspace_monorepo() -> TempDir {
    repo_with(&[
        (
            "package.json",
            r#"{"name": "root", "private": true, "workspaces": ["packages/*", "apps/*"]}"#,
        ),
        ("packages/a/package.json", r#"{"name": "@acme/a"}"#),
        ("packages/a/index.js", "module.exports = 1;\n"),
        ("packages/b/package.json", r#"{"name": "@acme/b"}"#),
        ("packages/b/index.js", "module.exports = 2;\n"),
        ("apps/web/package.json", r#"{"name": "web", "dependencies": {"react": "^18.2.0"}}"#),
        ("apps/web/src/main.jsx", "export const x = 1;\n"),
        ("apps/api/package.json", r#"{"name": "api", "dependencies": {"express": "^4.18.2"}}"#),
        ("apps/api/server.js", "const app = require('express')();\napp.get('/ping', h);\n"),
        ("apps/README", "apps live here\n"),
    ])
}

/// Path to the compiled `argus` binary
pub fn argus_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_argus"))
}

/// Git detector stand-in that parks its worker until the run is cancelled
///
/// It finishes successfully once cancellation is observed, so only the
/// scheduler can turn the run into a cancellation.
#[derive(Default)]
pub struct ParksUntilCancelled {
    started: AtomicBool,
}

impl ParksUntilCancelled {
    pub fn registry(self: &Arc<Self>) -> DetectorRegistry {
        DetectorRegistry::with_defaults().with_override(Arc::clone(self) as Arc<dyn Detector>)
    }

    /// Waits until some run has reached the parked detector
    pub async fn wait_started(&self) {
        for _ in 0..1000 {
            if self.started.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("parked detector never started");
    }
}

impl Detector for ParksUntilCancelled {
    fn id(&self) -> DetectorId {
        DetectorId::Git
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        self.started.store(true, Ordering::SeqCst);
        while !ctx.cancel.is_cancelled() {
            thread::sleep(Duration::from_millis(5));
        }
        Ok(Facet::empty(DetectorId::Git))
    }
}
