use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};
use toml::Value;
use tracing::debug;

/// How long `uv lock --dry-run` may run
const UV_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

static PACKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9]([a-z0-9\-._]*[a-z0-9])?$").expect("Invalid regex")
});

/// Findings from validating a written pyproject.toml
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks a pyproject.toml for structure, then optionally with uv
pub struct PyProjectValidator {
    uv_timeout: Duration,
}

impl PyProjectValidator {
    pub fn new() -> Self {
        Self {
            uv_timeout: UV_LOCK_TIMEOUT,
        }
    }

    pub fn validate(&self, path: &Path, skip_uv: bool) -> ValidationReport {
        let mut report = ValidationReport::default();

        if !path.is_file() {
            report
                .errors
                .push(format!("File does not exist: {}", path.display()));
            return report;
        }

        match fs::read_to_string(path) {
            Ok(content) => check_structure(&content, &mut report),
            Err(e) => {
                report
                    .errors
                    .push(format!("Could not read {}: {e}", path.display()));
            }
        }

        if report.is_valid() && !skip_uv {
            let project_dir = path.parent().unwrap_or_else(|| Path::new("."));
            self.check_with_uv(project_dir, &mut report);
        }

        report
    }

    /// `uv lock --dry-run` in the project directory; every failure is a warning
    fn check_with_uv(&self, project_dir: &Path, report: &mut ValidationReport) {
        let installed = Command::new("uv")
            .arg("--version")
            .output()
            .is_ok_and(|output| output.status.success());
        if !installed {
            report
                .warnings
                .push("uv not installed, skipping uv validation".to_string());
            return;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Validating with uv lock --dry-run...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let outcome = self.run_uv_lock(project_dir);
        spinner.finish_and_clear();

        match outcome {
            UvOutcome::Passed => debug!("uv lock --dry-run succeeded"),
            UvOutcome::Failed(stderr) => report
                .warnings
                .push(format!("uv lock validation failed:\n{}", stderr.trim_end())),
            UvOutcome::TimedOut => report
                .warnings
                .push("uv lock validation timed out".to_string()),
            UvOutcome::Error(e) => report
                .warnings
                .push(format!("Could not run uv lock: {e}")),
        }
    }

    fn run_uv_lock(&self, project_dir: &Path) -> UvOutcome {
        let child = Command::new("uv")
            .args(["lock", "--dry-run"])
            .current_dir(project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(e) => return UvOutcome::Error(e.to_string()),
        };

        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if started.elapsed() >= self.uv_timeout => {
                    // Best effort; the process may have exited in between
                    let _ = child.kill();
                    let _ = child.wait();
                    return UvOutcome::TimedOut;
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return UvOutcome::Error(e.to_string()),
            }
        }

        match child.wait_with_output() {
            Ok(output) if output.status.success() => UvOutcome::Passed,
            Ok(output) => UvOutcome::Failed(String::from_utf8_lossy(&output.stderr).into_owned()),
            Err(e) => UvOutcome::Error(e.to_string()),
        }
    }
}

impl Default for PyProjectValidator {
    fn default() -> Self {
        Self::new()
    }
}

enum UvOutcome {
    Passed,
    Failed(String),
    TimedOut,
    Error(String),
}

/// Syntax and shape checks on the document
pub fn check_structure(content: &str, report: &mut ValidationReport) {
    let parsed: Value = match toml::from_str(content) {
        Ok(parsed) => parsed,
        Err(e) => {
            report.errors.push(format!("Invalid TOML syntax: {e}"));
            return;
        }
    };

    let Some(project) = parsed.get("project").and_then(Value::as_table) else {
        report.errors.push("Missing [project] section".to_string());
        return;
    };

    for field in ["name", "version"] {
        if !project.contains_key(field) {
            report
                .errors
                .push(format!("Missing required field: project.{field}"));
        }
    }

    match project.get("name") {
        Some(Value::String(name)) if !name.is_empty() => {
            if !PACKAGE_NAME.is_match(name) {
                report.warnings.push(format!(
                    "Package name '{name}' may not be valid (use letters, digits, '-', '_' and '.')"
                ));
            }
        }
        Some(_) => report
            .errors
            .push("project.name must be a non-empty string".to_string()),
        None => {}
    }

    if let Some(dependencies) = project.get("dependencies") {
        match dependencies.as_array() {
            Some(items) => {
                for item in items.iter().filter(|item| !item.is_str()) {
                    report
                        .errors
                        .push(format!("Invalid dependency (must be string): {item}"));
                }
            }
            None => report
                .errors
                .push("project.dependencies must be a list".to_string()),
        }
    }

    if let Some(groups) = parsed.get("dependency-groups") {
        check_dependency_groups(groups, report);
    }

    if let Some(sources) = parsed
        .get("tool")
        .and_then(|tool| tool.get("uv"))
        .and_then(|uv| uv.get("sources"))
    {
        match sources.as_table() {
            Some(sources) => {
                for (package, source) in sources {
                    if !source.is_table() {
                        report
                            .errors
                            .push(format!("Source for '{package}' must be a table"));
                    }
                }
            }
            None => report
                .errors
                .push("tool.uv.sources must be a table".to_string()),
        }
    }
}

fn check_dependency_groups(groups: &Value, report: &mut ValidationReport) {
    let Some(groups) = groups.as_table() else {
        report
            .errors
            .push("dependency-groups must be a table".to_string());
        return;
    };

    for (group, entries) in groups {
        let Some(entries) = entries.as_array() else {
            report
                .errors
                .push(format!("dependency-groups.{group} must be a list"));
            continue;
        };
        // `{ include-group = "..." }` tables are allowed alongside strings
        for entry in entries.iter().filter(|e| !e.is_str() && !e.is_table()) {
            report
                .errors
                .push(format!("Invalid dependency in {group}: {entry}"));
        }
    }
}
