//! One extractor per source kind. Each turns a classified line into a
//! [`ParsedRequirement`]; lines that cannot produce one report why on the
//! warning channel instead.

use crate::parser::normalize;
use crate::types::{GitSource, ParsedRequirement, Source};
use crate::version::rewrite_caret_constraints;
use pep508_rs::{Requirement, VersionOrUrl};
use std::str::FromStr;
use tracing::{debug, warn};
use url::Url;

/// Ref used when a git URL has no `@ref`
pub const DEFAULT_GIT_REF: &str = "main";

/// Hosts whose SSH remotes are rewritten to HTTPS
const KNOWN_FORGES: [&str; 3] = ["github.com", "gitlab.com", "bitbucket.org"];

/// Provenance of the logical line being extracted
#[derive(Debug, Clone, Copy)]
pub struct LineOrigin<'a> {
    pub number: usize,
    pub text: &'a str,
}

/// Pieces of a `git+<transport>://...` line
#[derive(Debug, Clone, Copy)]
pub struct GitMatch<'a> {
    pub editable: bool,
    pub transport: &'a str,
    pub location: &'a str,
    pub reference: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

/// `egg=` and `subdirectory=` keys of a URL fragment
#[derive(Debug, Default, PartialEq, Eq)]
struct Fragment {
    egg: Option<String>,
    subdirectory: Option<String>,
}

impl Fragment {
    fn parse(fragment: Option<&str>) -> Self {
        let mut parsed = Self::default();
        for part in fragment.unwrap_or_default().split('&') {
            if let Some(egg) = part.strip_prefix("egg=") {
                parsed.egg = Some(egg.to_string());
            } else if let Some(subdirectory) = part.strip_prefix("subdirectory=") {
                parsed.subdirectory = Some(subdirectory.to_string());
            }
        }
        parsed
    }
}

/// Split `name[extra1,extra2]` as written in an `egg=` fragment
fn split_egg(egg: &str) -> (String, Vec<String>) {
    match egg.split_once('[') {
        Some((name, rest)) => {
            let extras = rest
                .trim_end_matches(']')
                .split(',')
                .map(str::trim)
                .filter(|extra| !extra.is_empty())
                .map(str::to_string)
                .collect();
            (name.trim().to_string(), extras)
        }
        None => (egg.trim().to_string(), Vec::new()),
    }
}

pub fn git(found: GitMatch<'_>, origin: LineOrigin<'_>, mut warnings: Vec<String>) -> ParsedRequirement {
    let fragment = Fragment::parse(found.fragment);
    let (package, extras) = match &fragment.egg {
        Some(egg) => split_egg(egg),
        None => (repository_name(found.location), Vec::new()),
    };

    let url = match found.transport {
        "ssh" => match ssh_to_https(found.location) {
            Some(https) => {
                warnings.push(format!("Converted SSH URL to HTTPS for {package}"));
                https
            }
            None => {
                warnings.push(format!(
                    "SSH URLs may not be supported by uv. Consider using HTTPS for {package}"
                ));
                format!("ssh://{}", found.location)
            }
        },
        transport => format!("{transport}://{}", found.location),
    };

    let reference = found.reference.unwrap_or(DEFAULT_GIT_REF).to_string();
    debug!("Git requirement {package} -> {url}@{reference}");

    ParsedRequirement::new(
        package,
        Source::Git(GitSource {
            url,
            reference,
            subdirectory: fragment.subdirectory,
        }),
    )
    .with_extras(extras)
    .with_editable(found.editable)
    .with_origin(origin.number, origin.text)
    .with_warnings(warnings)
}

/// Last path segment of a repository location with `.git` removed
fn repository_name(location: &str) -> String {
    let last = location
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(location);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// `git@github.com:user/repo.git` -> `https://github.com/user/repo.git`,
/// only for well-known forges.
fn ssh_to_https(location: &str) -> Option<String> {
    let without_user = match location.split_once('@') {
        Some((user, rest)) if !user.contains('/') => rest,
        _ => location,
    };
    let (host, path) = without_user.split_once([':', '/'])?;
    KNOWN_FORGES
        .contains(&host)
        .then(|| format!("https://{host}/{}", path.trim_start_matches('/')))
}

pub fn url(
    url: &str,
    fragment: Option<&str>,
    origin: LineOrigin<'_>,
    warnings: Vec<String>,
) -> ParsedRequirement {
    let fragment = Fragment::parse(fragment);
    let (package, extras) = match &fragment.egg {
        Some(egg) => split_egg(egg),
        None => (archive_package_name(url), Vec::new()),
    };

    ParsedRequirement::new(package, Source::Url { url: url.to_string() })
        .with_extras(extras)
        .with_origin(origin.number, origin.text)
        .with_warnings(warnings)
}

const ARCHIVE_EXTENSIONS: [&str; 5] = [".whl", ".tar.gz", ".tar.bz2", ".tgz", ".zip"];

/// Package name from an archive file name: everything before the first
/// hyphen followed by a digit (`requests-2.31.0-py3-none-any.whl` -> `requests`).
fn archive_package_name(url: &str) -> String {
    let file_name = Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .unwrap_or_else(|| url.rsplit('/').next().unwrap_or(url).to_string());

    let version_start = file_name
        .char_indices()
        .find(|&(idx, c)| {
            c == '-'
                && file_name[idx + 1..]
                    .chars()
                    .next()
                    .is_some_and(|next| next.is_ascii_digit())
        })
        .map(|(idx, _)| idx);

    match version_start {
        Some(idx) => file_name[..idx].to_string(),
        None => ARCHIVE_EXTENSIONS
            .iter()
            .find_map(|ext| file_name.strip_suffix(ext))
            .unwrap_or(&file_name)
            .to_string(),
    }
}

/// Local path requirement. Returns `None` (with a warning) when no package
/// name can be derived, including `-e .` for the project itself.
pub fn path(
    path: &str,
    editable: bool,
    origin: LineOrigin<'_>,
    warnings: Vec<String>,
    diagnostics: &mut Vec<String>,
) -> Option<ParsedRequirement> {
    let trimmed = path.trim_end_matches(['/', '\\']);
    let name = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);

    if trimmed == "." {
        diagnostics.push(format!(
            "Line {}: '{}' installs the project itself; uv installs the project automatically, skipping",
            origin.number,
            origin.text.trim()
        ));
        return None;
    }
    if name.is_empty() || name == ".." || name.ends_with(':') {
        diagnostics.push(format!(
            "Line {}: could not derive a package name from path '{path}', skipping",
            origin.number
        ));
        return None;
    }

    Some(
        ParsedRequirement::new(
            name,
            Source::Path {
                path: path.to_string(),
            },
        )
        .with_editable(editable)
        .with_origin(origin.number, origin.text)
        .with_warnings(warnings),
    )
}

/// Global option line, kept verbatim so it can be surfaced as a comment
pub fn directive(option: &str, origin: LineOrigin<'_>) -> ParsedRequirement {
    ParsedRequirement::new(
        "",
        Source::Directive {
            raw_option: option.to_string(),
        },
    )
    .with_origin(origin.number, origin.text)
    .with_warnings(vec![normalize::option_warning(option)])
}

/// PEP 508 requirement, after rewriting caret constraints. Grammar errors
/// are reported with the line number and the line is dropped.
pub fn standard(
    line: &str,
    origin: LineOrigin<'_>,
    mut warnings: Vec<String>,
    diagnostics: &mut Vec<String>,
) -> Option<ParsedRequirement> {
    let (line, rewrites) = rewrite_caret_constraints(line);
    warnings.extend(rewrites);

    let requirement: Requirement = match Requirement::from_str(&line) {
        Ok(requirement) => requirement,
        Err(err) => {
            let reason = err.to_string();
            let reason = reason.lines().next().unwrap_or_default();
            warn!("Line {}: failed to parse {line:?}: {reason}", origin.number);
            diagnostics.push(format!(
                "Error parsing line {}: {line}\n  Reason: {reason}",
                origin.number
            ));
            return None;
        }
    };

    let package = requirement.name.to_string();
    let extras: Vec<String> = requirement.extras.iter().map(ToString::to_string).collect();
    let markers = requirement.marker.as_ref().map(ToString::to_string);

    let parsed = match requirement.version_or_url {
        None => ParsedRequirement::pypi(package, ""),
        Some(VersionOrUrl::VersionSpecifier(specifiers)) => {
            // Comma without padding, as written in requirements files
            let spec: Vec<String> = specifiers.iter().map(ToString::to_string).collect();
            ParsedRequirement::pypi(package, spec.join(","))
        }
        Some(VersionOrUrl::Url(url)) => direct_reference(package, &url.to_string()),
    };

    let parsed = parsed
        .with_extras(extras)
        .with_origin(origin.number, origin.text)
        .with_warnings(warnings);

    Some(match markers {
        Some(markers) => parsed.with_markers(markers),
        None => parsed,
    })
}

/// `name @ <url>`: the name comes from the requirement, the location from the URL
fn direct_reference(package: String, url: &str) -> ParsedRequirement {
    if let Some(found) = super::classify::match_git(url) {
        let mut parsed = git(found, LineOrigin { number: 0, text: url }, Vec::new());
        parsed.package = package;
        parsed.editable = false;
        return parsed;
    }

    match url.strip_prefix("file://") {
        Some(path) => ParsedRequirement::new(
            package,
            Source::Path {
                path: path.to_string(),
            },
        ),
        None => ParsedRequirement::new(package, Source::Url { url: url.to_string() }),
    }
}
