use indexmap::IndexMap;
use regex::Regex;
use requirements_to_uv_core::{Author, MAIN_GROUP, Metadata};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use tracing::debug;

/// Version used when nothing else is found
pub const DEFAULT_VERSION: &str = "0.1.0";

/// Python constraint used when nothing else is found
pub const DEFAULT_REQUIRES_PYTHON: &str = ">=3.8";

/// Requirements files keyed by dependency group
pub type RequirementsFiles = IndexMap<String, PathBuf>;

/// Candidate file names per group, first existing file wins
const REQUIREMENTS_PATTERNS: [(&str, &[&str]); 5] = [
    (MAIN_GROUP, &["requirements.txt", "requirements.in"]),
    (
        "dev",
        &["requirements-dev.txt", "dev-requirements.txt", "requirements_dev.txt"],
    ),
    (
        "test",
        &["requirements-test.txt", "test-requirements.txt", "requirements_test.txt"],
    ),
    (
        "docs",
        &["requirements-docs.txt", "docs-requirements.txt", "requirements_docs.txt"],
    ),
    (
        "lint",
        &["requirements-lint.txt", "lint-requirements.txt", "requirements_lint.txt"],
    ),
];

const README_FILES: [&str; 4] = ["README.md", "README.rst", "README.txt", "README"];
const LICENSE_FILES: [&str; 4] = ["LICENSE", "LICENSE.txt", "LICENSE.md", "COPYING"];

/// Directories never searched for `__init__.py`
const SKIPPED_DIRS: [&str; 7] = [
    "venv",
    "env",
    "node_modules",
    "__pycache__",
    "site-packages",
    "build",
    "dist",
];

static INIT_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"__version__\s*=\s*["']([^"']+)["']"#).expect("Invalid regex")
});
static SETUP_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"version\s*=\s*["']([^"']+)["']"#).expect("Invalid regex"));
static PYTHON_VERSION_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\.\d+)").expect("Invalid regex"));
static PYTHON_CLASSIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Programming Language :: Python :: (\d+)\.(\d+)").expect("Invalid regex")
});
static NAME_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\s]+").expect("Invalid regex"));
static NAME_INVALID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\-.]").expect("Invalid regex"));

/// License identifiers and the text patterns that identify them
static LICENSE_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("MIT", r"MIT License|Permission is hereby granted, free of charge"),
        (
            "Apache-2.0",
            r"Apache License.*Version 2\.0|Licensed under the Apache License",
        ),
        (
            "GPL-3.0",
            r"GNU GENERAL PUBLIC LICENSE.*Version 3|This program is free software: you can redistribute it",
        ),
        (
            "BSD-3-Clause",
            r"BSD 3-Clause|Redistribution and use in source and binary forms",
        ),
        ("ISC", r"ISC License|Permission to use, copy, modify"),
    ]
    .into_iter()
    .map(|(id, pattern)| (id, Regex::new(&format!("(?i){pattern}")).expect("Invalid regex")))
    .collect()
});

/// Find requirements files in `directory`, one per known group
pub fn find_requirements_files(directory: &Path) -> RequirementsFiles {
    let mut files = RequirementsFiles::new();

    for (group, candidates) in REQUIREMENTS_PATTERNS {
        if let Some(path) = candidates
            .iter()
            .map(|name| directory.join(name))
            .find(|path| path.is_file())
        {
            debug!("Found {group} requirements: {}", path.display());
            files.insert(group.to_string(), path);
        }
    }

    files
}

/// Turn a directory name into a valid distribution name
pub fn normalize_project_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let hyphenated = NAME_SEPARATORS.replace_all(&lowered, "-");
    let name = NAME_INVALID.replace_all(&hyphenated, "");

    match name.chars().next() {
        None => "my-project".to_string(),
        Some(first) if first == '-' || first.is_ascii_digit() => format!("project-{name}"),
        Some(_) => name.into_owned(),
    }
}

/// Detects project metadata from the filesystem and git
pub struct MetadataDetector {
    project_dir: PathBuf,
}

impl MetadataDetector {
    pub fn new(project_dir: PathBuf) -> Self {
        Self { project_dir }
    }

    /// Detect everything at once
    pub fn detect(&self) -> Metadata {
        Metadata {
            name: self.detect_project_name(),
            version: self.detect_version(),
            description: self.detect_description(),
            readme: self
                .find_readme()
                .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned())),
            requires_python: Some(self.detect_python_version()),
            license: self.detect_license(),
            authors: self.detect_authors(),
            repository_url: self.git_remote_url(),
            is_git_repo: self.is_git_repo(),
        }
    }

    /// Project name from the directory name
    pub fn detect_project_name(&self) -> String {
        let dir = fs::canonicalize(&self.project_dir).unwrap_or_else(|_| self.project_dir.clone());
        let raw = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        normalize_project_name(&raw)
    }

    /// `__version__` in a package, then setup.py, then the latest git tag
    pub fn detect_version(&self) -> String {
        self.version_from_packages()
            .or_else(|| self.version_from_setup_py())
            .or_else(|| self.version_from_git_tag())
            .unwrap_or_else(|| DEFAULT_VERSION.to_string())
    }

    fn version_from_packages(&self) -> Option<String> {
        let root = glob::Pattern::escape(&self.project_dir.to_string_lossy());
        let pattern = format!("{root}/**/__init__.py");
        let paths = glob::glob(&pattern).ok()?;

        paths
            .flatten()
            .filter(|path| !self.in_skipped_dir(path))
            .find_map(|path| {
                let content = fs::read_to_string(&path).ok()?;
                let version = INIT_VERSION.captures(&content)?[1].to_string();
                debug!("Version {version} from {}", path.display());
                Some(version)
            })
    }

    fn version_from_setup_py(&self) -> Option<String> {
        let content = fs::read_to_string(self.project_dir.join("setup.py")).ok()?;
        Some(SETUP_VERSION.captures(&content)?[1].to_string())
    }

    fn version_from_git_tag(&self) -> Option<String> {
        let tag = self.git(&["describe", "--tags", "--abbrev=0"])?;
        Some(tag.strip_prefix('v').unwrap_or(&tag).to_string())
    }

    /// Hidden directories, virtualenvs and build output
    fn in_skipped_dir(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.project_dir).unwrap_or(path);
        let Some(parent) = relative.parent() else {
            return false;
        };
        parent.components().any(|component| match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                name.starts_with('.')
                    || name.ends_with(".egg-info")
                    || SKIPPED_DIRS.contains(&&*name)
            }
            _ => false,
        })
    }

    /// `.python-version`, then the lowest Python classifier in setup.py
    pub fn detect_python_version(&self) -> String {
        self.python_from_version_file()
            .or_else(|| self.python_from_classifiers())
            .unwrap_or_else(|| DEFAULT_REQUIRES_PYTHON.to_string())
    }

    fn python_from_version_file(&self) -> Option<String> {
        let content = fs::read_to_string(self.project_dir.join(".python-version")).ok()?;
        let caps = PYTHON_VERSION_FILE.captures(content.trim())?;
        Some(format!(">={}", &caps[1]))
    }

    fn python_from_classifiers(&self) -> Option<String> {
        let content = fs::read_to_string(self.project_dir.join("setup.py")).ok()?;
        let (major, minor) = PYTHON_CLASSIFIER
            .captures_iter(&content)
            .filter_map(|caps| Some((caps[1].parse::<u32>().ok()?, caps[2].parse::<u32>().ok()?)))
            .min()?;
        Some(format!(">={major}.{minor}"))
    }

    pub fn find_readme(&self) -> Option<PathBuf> {
        README_FILES
            .iter()
            .map(|name| self.project_dir.join(name))
            .find(|path| path.is_file())
    }

    /// First README line that is not a heading or a badge
    pub fn detect_description(&self) -> Option<String> {
        let content = fs::read_to_string(self.find_readme()?).ok()?;

        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| !line.starts_with(['#', '=', '-']))
            .find(|line| line.chars().count() > 10 && !line.starts_with('!'))
            .map(|line| line.chars().take(200).collect())
    }

    /// SPDX-ish identifier, `UNKNOWN` for an unrecognised license file
    pub fn detect_license(&self) -> Option<String> {
        for name in LICENSE_FILES {
            let Ok(content) = fs::read_to_string(self.project_dir.join(name)) else {
                continue;
            };
            let license = LICENSE_PATTERNS
                .iter()
                .find(|(_, pattern)| pattern.is_match(&content))
                .map_or("UNKNOWN", |(id, _)| id);
            return Some(license.to_string());
        }
        None
    }

    /// Author from the git user configuration
    pub fn detect_authors(&self) -> Vec<Author> {
        let author = Author {
            name: self.git(&["config", "user.name"]),
            email: self.git(&["config", "user.email"]),
        };
        if author.is_empty() {
            Vec::new()
        } else {
            vec![author]
        }
    }

    pub fn is_git_repo(&self) -> bool {
        self.project_dir.join(".git").exists()
    }

    /// `origin` remote, SSH remotes shown as HTTPS
    pub fn git_remote_url(&self) -> Option<String> {
        let url = self.git(&["config", "--get", "remote.origin.url"])?;
        Some(display_remote_url(&url))
    }

    /// Trimmed stdout of a successful git command
    fn git(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.project_dir)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!stdout.is_empty()).then_some(stdout)
    }
}

/// `git@github.com:user/repo.git` -> `https://github.com/user/repo`
fn display_remote_url(url: &str) -> String {
    match url.strip_prefix("git@") {
        Some(rest) => {
            let rest = rest.replacen(':', "/", 1);
            let rest = rest.strip_suffix(".git").unwrap_or(&rest);
            format!("https://{rest}")
        }
        None => url.to_string(),
    }
}
