#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a temporary Python project directory
pub struct TempProject {
    root: TempDir,
    path: PathBuf,
}

impl TempProject {
    /// Create a new temporary project named `demo-app`
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp directory");
        let path = root.path().join("demo-app");
        fs::create_dir(&path).expect("Failed to create project directory");
        Self { root, path }
    }

    /// Get the path to the project directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a file in the project with the given content
    pub fn create_file(&self, relative_path: &str, content: &str) {
        let file_path = self.path.join(relative_path);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        fs::write(&file_path, content).expect("Failed to write file");
    }

    /// Get the absolute path to a file in the project
    pub fn file_path(&self, relative_path: &str) -> PathBuf {
        self.path.join(relative_path)
    }

    /// Read a file from the project
    pub fn read_file(&self, relative_path: &str) -> String {
        fs::read_to_string(self.file_path(relative_path)).expect("Failed to read file")
    }
}

impl Default for TempProject {
    fn default() -> Self {
        Self::new()
    }
}

/// A requirements.txt exercising every source kind
pub fn sample_requirements_txt() -> &'static str {
    r#"# Production dependencies
--index-url https://pypi.org/simple
requests>=2.28.0,<3.0.0
flask^2.0.0
celery[redis]>=5.0 ; python_version >= "3.8"
numpy==1.24.0 \
    --hash=sha256:abc123
git+https://github.com/user/mylib.git@v1.2.0#egg=mylib
https://example.com/packages/archive-1.0.0.tar.gz
-e ./libs/local-pkg
"#
}

/// A requirements-dev.txt including the main file
pub fn sample_requirements_dev_txt() -> &'static str {
    r#"-r requirements.txt
pytest>=7.0.0
black==23.7.0
"#
}

/// An existing manifest with fields the merge must keep
pub fn sample_existing_pyproject() -> &'static str {
    r#"# Project manifest
[project]
name = "existing-name"
version = "2.0.0"
description = "Kept as is"
dependencies = [
    "requests>=2.31",
]

[tool.black]
line-length = 100
"#
}
