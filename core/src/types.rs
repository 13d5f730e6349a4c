use std::fmt;

/// A requirement as parsed from one logical line of a requirements file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequirement {
    /// Distribution name (empty for directives)
    pub package: String,
    /// PEP 440 version constraint, empty when unconstrained or not a registry source
    pub version_spec: String,
    /// Optional feature groups, in source order
    pub extras: Vec<String>,
    /// Environment marker expression
    pub markers: Option<String>,
    /// Where the package is installed from
    pub source: Source,
    /// Editable install (`-e`), only meaningful for path and git sources
    pub editable: bool,
    /// Line number in the source file (1-indexed)
    pub line_number: usize,
    /// Original line text
    pub original_line: String,
    /// Advisory messages attached while extracting this requirement
    pub warnings: Vec<String>,
}

impl ParsedRequirement {
    /// A registry requirement with no extras or markers
    pub fn pypi(package: impl Into<String>, version_spec: impl Into<String>) -> Self {
        Self::new(package, Source::Pypi).with_version_spec(version_spec)
    }

    pub fn new(package: impl Into<String>, source: Source) -> Self {
        Self {
            package: package.into(),
            version_spec: String::new(),
            extras: Vec::new(),
            markers: None,
            source,
            editable: false,
            line_number: 0,
            original_line: String::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_version_spec(mut self, version_spec: impl Into<String>) -> Self {
        self.version_spec = version_spec.into();
        self
    }

    pub fn with_extras<I, S>(mut self, extras: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extras = extras.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_markers(mut self, markers: impl Into<String>) -> Self {
        self.markers = Some(markers.into());
        self
    }

    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn with_origin(mut self, line_number: usize, original_line: impl Into<String>) -> Self {
        self.line_number = line_number;
        self.original_line = original_line.into();
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// `name[extra1,extra2]`, with the bracket suffix only when extras exist
    pub fn name_with_extras(&self) -> String {
        if self.extras.is_empty() {
            self.package.clone()
        } else {
            format!("{}[{}]", self.package, self.extras.join(","))
        }
    }
}

/// Install origin of a requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Default package registry
    Pypi,
    /// Git repository
    Git(GitSource),
    /// Direct archive URL
    Url { url: String },
    /// Local filesystem path
    Path { path: String },
    /// Global option line, kept verbatim so it can be surfaced as a comment
    Directive { raw_option: String },
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Pypi => SourceKind::Pypi,
            Source::Git(_) => SourceKind::Git,
            Source::Url { .. } => SourceKind::Url,
            Source::Path { .. } => SourceKind::Path,
            Source::Directive { .. } => SourceKind::Directive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Pypi,
    Git,
    Url,
    Path,
    Directive,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Pypi => write!(f, "pypi"),
            SourceKind::Git => write!(f, "git"),
            SourceKind::Url => write!(f, "url"),
            SourceKind::Path => write!(f, "path"),
            SourceKind::Directive => write!(f, "directive"),
        }
    }
}

/// A git checkout location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSource {
    /// Repository URL including transport, without the `git+` prefix
    pub url: String,
    /// Ref after `@`, `main` when absent
    pub reference: String,
    /// `subdirectory=` fragment value
    pub subdirectory: Option<String>,
}

/// How a git ref is written into `tool.uv.sources`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitReference {
    Tag(String),
    Branch(String),
    Rev(String),
}

impl GitReference {
    const BRANCHES: [&'static str; 3] = ["main", "master", "develop"];

    /// Heuristic: `v` followed by a digit somewhere is a tag, well-known
    /// default branch names are branches, anything else is a revision.
    pub fn classify(reference: &str) -> Self {
        if reference.starts_with('v') && reference.chars().any(|c| c.is_ascii_digit()) {
            GitReference::Tag(reference.to_string())
        } else if Self::BRANCHES.contains(&reference) {
            GitReference::Branch(reference.to_string())
        } else {
            GitReference::Rev(reference.to_string())
        }
    }

    /// Key used in the source table (`tag`, `branch` or `rev`)
    pub fn key(&self) -> &'static str {
        match self {
            GitReference::Tag(_) => "tag",
            GitReference::Branch(_) => "branch",
            GitReference::Rev(_) => "rev",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            GitReference::Tag(v) | GitReference::Branch(v) | GitReference::Rev(v) => v,
        }
    }
}

/// Project metadata supplied by the detector (or the user)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub readme: Option<String>,
    pub requires_python: Option<String>,
    pub license: Option<String>,
    pub authors: Vec<Author>,
    pub repository_url: Option<String>,
    pub is_git_repo: bool,
}

impl Metadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Author {
    /// True when neither name nor email is known
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.email) {
            (Some(name), Some(email)) => write!(f, "{name} <{email}>"),
            (Some(name), None) => write!(f, "{name}"),
            (None, Some(email)) => write!(f, "<{email}>"),
            (None, None) => Ok(()),
        }
    }
}
