//! Turns raw requirements file content into logical lines and recognises
//! line-level directives (`-r`, `-c`, global options, `--hash` pins).

use regex::Regex;
use std::sync::LazyLock;

pub(crate) const HASH_WARNING: &str = "Package hashes are not supported in pyproject.toml; \
     uv.lock records hashes for reproducible installs";

static HASH_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*--hash(?:=|\s+)\S+").expect("Invalid regex"));

const VCS_SCHEMES: [&str; 4] = ["git+", "hg+", "svn+", "bzr+"];

/// One fully joined requirement expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// Physical line number (1-indexed) where the logical line starts
    pub number: usize,
    pub text: String,
}

/// What a logical line turned out to be after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `-r` / `--requirement`
    Include(String),
    /// `-c` / `--constraint`
    Constraint(String),
    /// Any other option line, kept verbatim
    Option(String),
    /// A candidate requirement, with hashes already stripped
    Requirement { text: String, warnings: Vec<String> },
}

/// Decode file content as UTF-8, falling back to Latin-1.
///
/// Returns the text and whether the fallback was needed.
pub fn decode(bytes: Vec<u8>) -> (String, bool) {
    match String::from_utf8(bytes) {
        Ok(text) => {
            let text = match text.strip_prefix('\u{feff}') {
                Some(stripped) => stripped.to_string(),
                None => text,
            };
            (text, false)
        }
        Err(err) => {
            let text = err.as_bytes().iter().copied().map(char::from).collect();
            (text, true)
        }
    }
}

/// Join backslash-continued physical lines into logical lines.
///
/// Blank results are dropped. A trailing continuation with nothing after it
/// is still emitted once.
pub fn join_continuations(content: &str) -> Vec<LogicalLine> {
    let mut logical = Vec::new();
    let mut current = String::new();
    let mut start: Option<usize> = None;

    for (idx, raw) in content.lines().enumerate() {
        let stripped = raw.trim_end();

        // A comment never continues onto the next line
        if start.is_none() && stripped.trim_start().starts_with('#') {
            continue;
        }

        let number = *start.get_or_insert(idx + 1);

        if let Some(body) = stripped.strip_suffix('\\') {
            current.push_str(body);
            current.push(' ');
            continue;
        }

        current.push_str(stripped);
        if !current.trim().is_empty() {
            logical.push(LogicalLine {
                number,
                text: std::mem::take(&mut current),
            });
        }
        current.clear();
        start = None;
    }

    if let Some(number) = start {
        if !current.trim().is_empty() {
            logical.push(LogicalLine {
                number,
                text: current,
            });
        }
    }

    logical
}

/// Classify one logical line. `None` means there is nothing to do (blank or
/// comment).
pub fn normalize(line: &str) -> Option<Statement> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let line = strip_inline_comment(line);
    if line.is_empty() {
        return None;
    }

    if let Some(target) = option_value(line, "-r", "--requirement") {
        return Some(Statement::Include(target.to_string()));
    }
    if let Some(target) = option_value(line, "-c", "--constraint") {
        return Some(Statement::Constraint(target.to_string()));
    }

    // `--editable x` is spelled `-e x` from here on
    let line = match option_value(line, "-e", "--editable") {
        Some(target) => format!("-e {target}"),
        None if line.starts_with('-') => return Some(Statement::Option(line.to_string())),
        None => line.to_string(),
    };

    let mut warnings = Vec::new();
    let text = if HASH_OPTION.is_match(&line) {
        warnings.push(HASH_WARNING.to_string());
        HASH_OPTION.replace_all(&line, "").trim().to_string()
    } else {
        line
    };

    Some(Statement::Requirement { text, warnings })
}

/// Remove a trailing `# comment`.
///
/// When a URL or VCS scheme appears before the first `#`, that `#` starts a
/// URL fragment; only a `#` preceded by whitespace counts as a comment then.
pub fn strip_inline_comment(line: &str) -> &str {
    let Some(hash) = line.find('#') else {
        return line;
    };

    if has_url_scheme(&line[..hash]) {
        let comment = line
            .char_indices()
            .find(|&(idx, c)| c == '#' && line[..idx].ends_with(char::is_whitespace))
            .map(|(idx, _)| idx);
        match comment {
            Some(idx) => line[..idx].trim_end(),
            None => line,
        }
    } else {
        line[..hash].trim_end()
    }
}

fn has_url_scheme(text: &str) -> bool {
    text.contains("://") || VCS_SCHEMES.iter().any(|scheme| text.contains(scheme))
}

/// Value of a short/long option pair, e.g. `-r x`, `-rx`, `--requirement x`
/// or `--requirement=x`.
fn option_value<'a>(line: &'a str, short: &str, long: &str) -> Option<&'a str> {
    let value = if let Some(rest) = line.strip_prefix(long) {
        rest.strip_prefix('=')
            .or_else(|| rest.starts_with(char::is_whitespace).then_some(rest))?
    } else if !line.starts_with("--") {
        line.strip_prefix(short)?
    } else {
        return None;
    };

    let value = value.trim_start_matches('=').trim();
    (!value.is_empty()).then_some(value)
}

/// Advisory message for a global option line
pub fn option_warning(line: &str) -> String {
    let name = line
        .split(|c: char| c.is_whitespace() || c == '=')
        .next()
        .unwrap_or(line);
    let value = line[name.len()..].trim_start_matches('=').trim();

    match name {
        "--index-url" | "-i" | "--extra-index-url" => format!(
            "Index URLs are not supported in pyproject.toml dependencies; \
             configure {value} as a [[tool.uv.index]] entry or pass --index-url to uv"
        ),
        "--find-links" | "-f" => {
            "--find-links is not supported in pyproject.toml; use uv's find-links setting"
                .to_string()
        }
        "--trusted-host" => "--trusted-host is a CLI-only option".to_string(),
        other => format!("Unsupported option: {other}"),
    }
}
