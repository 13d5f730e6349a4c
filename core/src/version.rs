use regex::{Captures, Regex};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version string: {0}")]
    InvalidVersion(String),
    #[error("Version component out of range: {0}")]
    Overflow(String),
}

/// A release version as written after a caret (`^1.2.3`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Original string representation
    pub original: String,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            original: format!("{major}.{minor}.{patch}"),
        }
    }

    /// First version of the next major series (`1.2.3` -> `2.0.0`)
    pub fn next_major(&self) -> Result<Version, VersionError> {
        let major = self
            .major
            .checked_add(1)
            .ok_or_else(|| VersionError::Overflow(self.original.clone()))?;
        Ok(Version::new(major, 0, 0))
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parts: Vec<&str> = s.split('.').collect();

        if parts.is_empty() || parts.len() > 3 {
            return Err(VersionError::InvalidVersion(s.to_string()));
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| VersionError::InvalidVersion(s.to_string()))?;
        }

        Ok(Version {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            original: s.to_string(),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

static CARET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^\s*(\d+(?:\.\d+){0,2})").expect("Invalid regex"));

/// Convert a caret constraint into an explicit PEP 440 range.
///
/// `^X.Y.Z` becomes `>=X.Y.Z,<(X+1).0.0`: only the major component is
/// pinned, so `^0.2.1` yields `>=0.2.1,<1.0.0`.
pub fn caret_to_range(version: &str) -> Result<String, VersionError> {
    let lower = Version::from_str(version)?;
    let upper = lower.next_major()?;
    Ok(format!(">={lower},<{upper}"))
}

/// Rewrite every caret constraint in the requirement part of `line` (markers
/// after `;` are left alone). Returns the rewritten line and one message per
/// rewrite, or per caret that could not be understood.
pub fn rewrite_caret_constraints(line: &str) -> (String, Vec<String>) {
    let (head, tail) = match line.find(';') {
        Some(idx) => line.split_at(idx),
        None => (line, ""),
    };

    if !head.contains('^') {
        return (line.to_string(), Vec::new());
    }

    let mut messages = Vec::new();
    let rewritten = CARET.replace_all(head, |caps: &Captures<'_>| {
        let version = &caps[1];
        match caret_to_range(version) {
            Ok(range) => {
                messages.push(format!(
                    "Converted Poetry-style constraint ^{version} to {range}; caret ranges are not part of PEP 440"
                ));
                range
            }
            Err(err) => {
                messages.push(format!("Could not convert caret constraint ^{version}: {err}"));
                caps[0].to_string()
            }
        }
    });

    if messages.is_empty() {
        messages.push(format!(
            "Found a caret (^) constraint in '{}' but could not parse its version",
            head.trim()
        ));
    }

    (format!("{rewritten}{tail}"), messages)
}
