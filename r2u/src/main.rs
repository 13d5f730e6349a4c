use anyhow::Result;
use clap::Parser;
use requirements_to_uv_core::manifest::with_header_comments;
use requirements_to_uv_core::{
    ConvertError, MAIN_GROUP, Metadata, PyProjectConverter, PyProjectMerger, RequirementGroups,
    RequirementsParser,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use r2u::cli::Args;
use r2u::detector::{self, MetadataDetector, RequirementsFiles};
use r2u::output;
use r2u::validator::PyProjectValidator;

const PYPROJECT: &str = "pyproject.toml";
const BACKUP: &str = "pyproject.toml.backup";

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level());

    let project_path = args.project_path();
    if !project_path.is_dir() {
        anyhow::bail!("Project directory does not exist: {}", project_path.display());
    }

    let metadata = detect_metadata(&args, &project_path);
    output::print_info(&format!(
        "Converting {} {}",
        metadata.name, metadata.version
    ));

    let files = requirements_files(&args, &project_path)?;

    // Parse every group
    let parser = RequirementsParser::new();
    let mut groups = RequirementGroups::new();
    let mut warnings = Vec::new();
    for (group, path) in &files {
        output::print_info(&format!("Reading {group} requirements from {}", path.display()));
        let parsed = parser.parse_file(path)?;
        debug!("{}: {} records", path.display(), parsed.requirements.len());
        warnings.extend(parsed.warnings);
        groups.insert(group.clone(), parsed.requirements);
    }

    let conversion = PyProjectConverter::new().convert(&metadata, &groups);
    warnings.extend(conversion.warnings);

    let pyproject = project_path.join(PYPROJECT);
    let mut backup = None;
    let content = if pyproject.exists() && !args.overwrite {
        output::print_info("Merging with existing pyproject.toml");
        let outcome = PyProjectMerger::new().merge_file(&pyproject, &conversion.manifest);
        warnings.extend(outcome.warnings);

        // The generated manifest replaces a file the merger could not use
        if outcome.replaced_existing && !args.dry_run {
            backup = Some(back_up(&pyproject, &project_path)?);
        }

        let merged = outcome.document.to_string();
        let comments: Vec<String> = conversion
            .comments
            .into_iter()
            .filter(|comment| !merged.contains(comment.as_str()))
            .collect();
        with_header_comments(&merged, &comments)
    } else {
        if pyproject.exists() && !args.dry_run {
            backup = Some(back_up(&pyproject, &project_path)?);
        }
        conversion.manifest.render(&conversion.comments)
    };

    let warnings = output::dedup_warnings(warnings);

    if args.dry_run {
        output::print_preview(&content);
        output::print_warnings(&warnings);
        return Ok(());
    }

    fs::write(&pyproject, &content).map_err(|source| ConvertError::Write {
        path: pyproject.clone(),
        source,
    })?;
    output::print_warnings(&warnings);

    if !args.no_validate {
        let report = PyProjectValidator::new().validate(&pyproject, false);
        for warning in &report.warnings {
            output::print_warning(warning);
        }
        if !report.is_valid() {
            for error in &report.errors {
                output::print_error(error);
            }
            anyhow::bail!("{} failed validation", pyproject.display());
        }
    }

    output::print_success(&pyproject, backup.as_deref());
    output::print_next_steps(warnings.len());

    Ok(())
}

/// Quiet by default; `-v`/`-vv` or RUST_LOG for more
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Copy the existing manifest to `pyproject.toml.backup`
fn back_up(pyproject: &Path, project_path: &Path) -> Result<PathBuf> {
    let backup_path = project_path.join(BACKUP);
    fs::copy(pyproject, &backup_path).map_err(|source| ConvertError::Write {
        path: backup_path.clone(),
        source,
    })?;
    info!("Backed up existing manifest to {}", backup_path.display());
    Ok(backup_path)
}

/// Detected metadata with command-line overrides applied
fn detect_metadata(args: &Args, project_path: &Path) -> Metadata {
    let mut metadata = MetadataDetector::new(project_path.to_path_buf()).detect();

    if let Some(name) = &args.name {
        metadata.name.clone_from(name);
    }
    if let Some(version) = &args.project_version {
        metadata.version.clone_from(version);
    }
    if let Some(python) = &args.python {
        metadata.requires_python = Some(python.clone());
    }
    metadata
}

/// Explicit files where given, auto-detection otherwise
fn requirements_files(args: &Args, project_path: &Path) -> Result<RequirementsFiles> {
    let mut files = match &args.requirements {
        Some(path) => RequirementsFiles::from([(MAIN_GROUP.to_string(), path.clone())]),
        None => detector::find_requirements_files(project_path),
    };

    let explicit: [(&str, &Option<PathBuf>); 2] = [("dev", &args.dev), ("test", &args.test)];
    for (group, path) in explicit {
        if let Some(path) = path {
            files.insert(group.to_string(), path.clone());
        }
    }

    if files.is_empty() {
        return Err(ConvertError::NoRequirementsFiles(project_path.to_path_buf()).into());
    }

    for path in files.values() {
        if !path.is_file() {
            anyhow::bail!("Requirements file does not exist: {}", path.display());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_files_override_detection() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("requirements.txt"), "flask\n").unwrap();
        fs::write(dir.path().join("requirements-dev.txt"), "pytest\n").unwrap();
        fs::write(dir.path().join("my-dev.txt"), "black\n").unwrap();

        let dev = dir.path().join("my-dev.txt");
        let args = Args::parse_from(["r2u", "--dev", dev.to_str().unwrap()]);
        let files = requirements_files(&args, dir.path()).unwrap();

        assert_eq!(files[MAIN_GROUP], dir.path().join("requirements.txt"));
        assert_eq!(files["dev"], dev);
    }

    #[test]
    fn test_nothing_to_convert() {
        let dir = TempDir::new().unwrap();
        let args = Args::parse_from(["r2u"]);
        let err = requirements_files(&args, dir.path()).unwrap_err();
        assert!(err.to_string().contains("No requirements files found"));
    }

    #[test]
    fn test_back_up_copies_manifest() {
        let dir = TempDir::new().unwrap();
        let pyproject = dir.path().join(PYPROJECT);
        fs::write(&pyproject, "[project\nname = ").unwrap();

        let backup = back_up(&pyproject, dir.path()).unwrap();

        assert_eq!(backup, dir.path().join(BACKUP));
        assert_eq!(fs::read_to_string(backup).unwrap(), "[project\nname = ");
    }

    #[test]
    fn test_metadata_overrides() {
        let dir = TempDir::new().unwrap();
        let args = Args::parse_from([
            "r2u",
            "--name",
            "renamed",
            "--project-version",
            "3.0.0",
            "--python",
            ">=3.12",
        ]);
        let metadata = detect_metadata(&args, dir.path());

        assert_eq!(metadata.name, "renamed");
        assert_eq!(metadata.version, "3.0.0");
        assert_eq!(metadata.requires_python.as_deref(), Some(">=3.12"));
    }
}
