//! requirements.txt parsing: line normalization, classification and
//! per-kind extraction, with `-r` includes followed recursively.

pub mod classify;
pub mod extract;
pub mod normalize;

use crate::error::ConvertError;
use crate::types::ParsedRequirement;
use extract::LineOrigin;
use normalize::Statement;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Everything read from one requirements file and its includes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFile {
    /// Records in source order, includes spliced in where they appear
    pub requirements: Vec<ParsedRequirement>,
    /// File-level problems: unreadable includes, cycles, unparseable lines
    pub warnings: Vec<String>,
}

/// Parser for requirements.txt files
#[derive(Debug)]
pub struct RequirementsParser;

impl RequirementsParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a requirements file. Only a failure to read `path` itself is
    /// an error; everything below it degrades to warnings.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedFile, ConvertError> {
        let mut parsed = ParsedFile::default();
        let mut chain = HashSet::new();
        chain.insert(file_identity(path));

        let content = read_requirements(path, &mut parsed)?;
        debug!("Parsing {}", path.display());
        self.parse_into(&content, base_dir(path), &mut chain, &mut parsed);

        Ok(parsed)
    }

    /// Parse in-memory content; includes resolve against `base_dir`
    pub fn parse_str(&self, content: &str, base_dir: &Path) -> ParsedFile {
        let mut parsed = ParsedFile::default();
        let mut chain = HashSet::new();
        self.parse_into(content, base_dir, &mut chain, &mut parsed);
        parsed
    }

    fn parse_into(
        &self,
        content: &str,
        base_dir: &Path,
        chain: &mut HashSet<PathBuf>,
        parsed: &mut ParsedFile,
    ) {
        for line in normalize::join_continuations(content) {
            let Some(statement) = normalize::normalize(&line.text) else {
                continue;
            };
            let origin = LineOrigin {
                number: line.number,
                text: line.text.trim(),
            };

            match statement {
                Statement::Include(target) => {
                    self.include(&base_dir.join(target), chain, parsed);
                }
                Statement::Constraint(target) => {
                    parsed.warnings.push(format!(
                        "Constraint files are not supported in pyproject.toml, ignoring -c {target}; \
                         use uv's constraint-dependencies setting instead"
                    ));
                }
                Statement::Option(option) => {
                    parsed
                        .requirements
                        .push(extract::directive(&option, origin));
                }
                Statement::Requirement { text, warnings } => {
                    if let Some(requirement) =
                        classify::classify(&text, origin, warnings, &mut parsed.warnings)
                    {
                        parsed.requirements.push(requirement);
                    }
                }
            }
        }
    }

    /// Follow `-r path`. `chain` holds the files currently being read, so
    /// only a file including one of its own ancestors is a cycle.
    fn include(&self, path: &Path, chain: &mut HashSet<PathBuf>, parsed: &mut ParsedFile) {
        let identity = file_identity(path);
        if !chain.insert(identity.clone()) {
            warn!("Circular include of {}", path.display());
            parsed.warnings.push(format!(
                "Circular reference detected: {} is already being read, skipping",
                path.display()
            ));
            return;
        }

        debug!("Following include {}", path.display());
        match read_requirements(path, parsed) {
            Ok(content) => self.parse_into(&content, base_dir(path), chain, parsed),
            Err(err) => {
                warn!("{err}");
                parsed.warnings.push(format!(
                    "Could not read included file {}, skipping",
                    path.display()
                ));
            }
        }
        chain.remove(&identity);
    }
}

impl Default for RequirementsParser {
    fn default() -> Self {
        Self::new()
    }
}

fn read_requirements(path: &Path, parsed: &mut ParsedFile) -> Result<String, ConvertError> {
    let bytes = fs::read(path).map_err(|source| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let (content, latin1) = normalize::decode(bytes);
    if latin1 {
        parsed.warnings.push(format!(
            "{} is not valid UTF-8, read it as Latin-1",
            path.display()
        ));
    }
    Ok(content)
}

fn base_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

/// Canonical path when it resolves, the path as given otherwise
fn file_identity(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
