//! Decides which kind of requirement a normalized line is. Matchers run in
//! a fixed priority order and the first match wins.

use crate::parser::extract::{self, GitMatch, LineOrigin};
use crate::types::ParsedRequirement;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{trace, warn};

static GIT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<editable>-e\s+)?git\+(?P<transport>https?|ssh|git|file)://(?P<location>(?:[\w.\-~%:]+@)?[^@#\s]+)(?:@(?P<ref>[^#\s]+))?(?:#(?P<fragment>\S+))?$",
    )
    .expect("Invalid regex")
});

static OTHER_VCS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:-e\s+)?(?P<vcs>hg|svn|bzr)\+").expect("Invalid regex"));

static ARCHIVE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<url>https?://[^\s#]+\.(?:whl|tar\.gz|tar\.bz2|tgz|zip))(?:#(?P<fragment>\S+))?$",
    )
    .expect("Invalid regex")
});

static LOCAL_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<editable>-e\s+)?(?P<path>\.{1,2}(?:[/\\]\S*)?|/\S+|[a-zA-Z]:[/\\]\S*)$")
        .expect("Invalid regex")
});

/// Match a `git+<transport>://` line
pub fn match_git(line: &str) -> Option<GitMatch<'_>> {
    let caps = GIT_URL.captures(line)?;
    Some(GitMatch {
        editable: caps.name("editable").is_some(),
        transport: caps.name("transport")?.as_str(),
        location: caps.name("location")?.as_str(),
        reference: caps.name("ref").map(|m| m.as_str()),
        fragment: caps.name("fragment").map(|m| m.as_str()),
    })
}

/// Classify a normalized requirement line and run the matching extractor.
///
/// `warnings` are the line-level messages gathered so far and end up on the
/// record. Problems that leave no record are pushed onto `diagnostics`.
pub fn classify(
    line: &str,
    origin: LineOrigin<'_>,
    warnings: Vec<String>,
    diagnostics: &mut Vec<String>,
) -> Option<ParsedRequirement> {
    if let Some(found) = match_git(line) {
        trace!("Line {}: git requirement", origin.number);
        return Some(extract::git(found, origin, warnings));
    }

    if let Some(caps) = OTHER_VCS.captures(line) {
        let message = format!(
            "VCS type '{}' is not supported by uv, only git is (line {})",
            &caps["vcs"], origin.number
        );
        warn!("{message}");
        diagnostics.push(message);
        return None;
    }

    if let Some(caps) = ARCHIVE_URL.captures(line) {
        trace!("Line {}: archive URL requirement", origin.number);
        let fragment = caps.name("fragment").map(|m| m.as_str());
        return Some(extract::url(&caps["url"], fragment, origin, warnings));
    }

    if let Some(caps) = LOCAL_PATH.captures(line) {
        trace!("Line {}: local path requirement", origin.number);
        let editable = caps.name("editable").is_some();
        return extract::path(&caps["path"], editable, origin, warnings, diagnostics);
    }

    extract::standard(line, origin, warnings, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Source, SourceKind};

    fn run(line: &str) -> (Option<ParsedRequirement>, Vec<String>) {
        let mut diagnostics = Vec::new();
        let origin = LineOrigin {
            number: 1,
            text: line,
        };
        let parsed = classify(line, origin, Vec::new(), &mut diagnostics);
        (parsed, diagnostics)
    }

    #[test]
    fn test_git_with_egg_and_ref() {
        let (parsed, _) = run("git+https://github.com/user/repo.git@main#egg=mypackage");
        let req = parsed.unwrap();

        assert_eq!(req.package, "mypackage");
        let Source::Git(source) = &req.source else {
            panic!("expected git source, got {:?}", req.source);
        };
        assert_eq!(source.url, "https://github.com/user/repo.git");
        assert_eq!(source.reference, "main");
    }

    #[test]
    fn test_editable_git() {
        let (parsed, _) = run("-e git+https://github.com/user/tool.git@v1.4.0");
        let req = parsed.unwrap();
        assert!(req.editable);
        assert_eq!(req.package, "tool");
    }

    #[test]
    fn test_match_git_ssh_userinfo() {
        let found = match_git("git+ssh://git@github.com:user/repo.git@v1.0").unwrap();
        assert_eq!(found.transport, "ssh");
        assert_eq!(found.location, "git@github.com:user/repo.git");
        assert_eq!(found.reference, Some("v1.0"));
    }

    #[test]
    fn test_other_vcs_is_rejected() {
        let (parsed, diagnostics) = run("hg+https://hg.example.com/repo#egg=legacy");
        assert!(parsed.is_none());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("'hg'"));
    }

    #[test]
    fn test_archive_url() {
        let (parsed, _) = run("https://example.com/dist/pkg-1.0.0.tar.gz#sha256=abc");
        let req = parsed.unwrap();
        assert_eq!(req.kind(), SourceKind::Url);
        assert_eq!(req.package, "pkg");
        assert_eq!(
            req.source,
            Source::Url {
                url: "https://example.com/dist/pkg-1.0.0.tar.gz".to_string()
            }
        );
    }

    #[test]
    fn test_local_paths() {
        let (parsed, _) = run("-e ./local/package");
        let req = parsed.unwrap();
        assert_eq!(req.kind(), SourceKind::Path);
        assert_eq!(req.package, "package");
        assert!(req.editable);

        let (parsed, _) = run("/opt/wheels/internal");
        assert_eq!(parsed.unwrap().package, "internal");
    }

    #[test]
    fn test_editable_self_is_skipped() {
        let (parsed, diagnostics) = run("-e .");
        assert!(parsed.is_none());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_standard_fallthrough() {
        let (parsed, diagnostics) = run("requests>=2.28.0; python_version >= \"3.8\"");
        let req = parsed.unwrap();
        assert_eq!(req.package, "requests");
        assert_eq!(req.version_spec, ">=2.28.0");
        assert!(req.markers.unwrap().contains("python_version"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_first_match_wins() {
        // A git URL that also ends like an archive stays a git requirement
        let (parsed, _) = run("git+https://example.com/repo.zip");
        assert_eq!(parsed.unwrap().kind(), SourceKind::Git);
    }
}
