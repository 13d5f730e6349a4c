//! Merges a generated manifest into an existing `pyproject.toml`, editing
//! the parsed document in place so the user's comments and layout survive.

use crate::manifest::{
    Manifest, Project, author_table, dependency_array, is_multiline, license_table,
};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use toml_edit::{Array, DocumentMut, Item, Table, TableLike, Value, value};
use tracing::{debug, warn};

/// Merged document plus the conflicts found on the way
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub document: DocumentMut,
    pub warnings: Vec<String>,
    /// The existing file could not be used and `document` is the generated one
    pub replaced_existing: bool,
}

/// Merges generated manifests into existing ones
pub struct PyProjectMerger;

impl PyProjectMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge into the manifest at `path`. A file that cannot be read is
    /// treated like one that cannot be parsed.
    pub fn merge_file(&self, path: &Path, new: &Manifest) -> MergeOutcome {
        match fs::read_to_string(path) {
            Ok(existing) => self.merge(&existing, new),
            Err(err) => {
                warn!("Failed to read {}: {err}", path.display());
                MergeOutcome {
                    document: new.to_document(),
                    warnings: vec![format!(
                        "Error reading existing {}: {err}. Using the generated manifest as-is",
                        path.display()
                    )],
                    replaced_existing: true,
                }
            }
        }
    }

    /// Merge `new` into the `existing` manifest text.
    ///
    /// Existing scalar fields and dependency declarations win; source
    /// overrides are the one place where new data replaces old.
    pub fn merge(&self, existing: &str, new: &Manifest) -> MergeOutcome {
        let mut warnings = Vec::new();

        let mut document: DocumentMut = match existing.parse() {
            Ok(document) => document,
            Err(err) => {
                warn!("Existing manifest is not valid TOML: {err}");
                warnings.push(format!(
                    "Error reading existing pyproject.toml: {}. Using the generated manifest as-is",
                    first_line(&err.to_string())
                ));
                return MergeOutcome {
                    document: new.to_document(),
                    warnings,
                    replaced_existing: true,
                };
            }
        };

        let root = document.as_table_mut();

        match child_table(root, "project") {
            Some(project) => merge_project(project, &new.project, &mut warnings),
            None => warnings.push("Existing 'project' is not a table, left unchanged".to_string()),
        }

        if !new.dependency_groups.is_empty() {
            match child_table(root, "dependency-groups") {
                Some(groups) => {
                    for (group, dependencies) in &new.dependency_groups {
                        let label = format!("dependency group '{group}'");
                        merge_dependency_array(groups, group, dependencies, &label, &mut warnings);
                    }
                }
                None => warnings.push(
                    "Existing 'dependency-groups' is not a table, left unchanged".to_string(),
                ),
            }
        }

        if !new.sources.is_empty() {
            let sources = child_table(root, "tool")
                .and_then(|tool| child_table(tool, "uv"))
                .and_then(|uv| child_table(uv, "sources"));
            match sources {
                Some(sources) => merge_sources(sources, new, &mut warnings),
                None => warnings
                    .push("Existing 'tool.uv.sources' is not a table, left unchanged".to_string()),
            }
        }

        MergeOutcome {
            document,
            warnings,
            replaced_existing: false,
        }
    }
}

impl Default for PyProjectMerger {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_project(project: &mut dyn TableLike, new: &Project, warnings: &mut Vec<String>) {
    let scalars = [
        ("name", Some(&new.name)),
        ("version", Some(&new.version)),
        ("description", new.description.as_ref()),
        ("readme", new.readme.as_ref()),
        ("requires-python", new.requires_python.as_ref()),
    ];
    for (key, field) in scalars {
        let Some(field) = field.filter(|f| !f.is_empty()) else {
            continue;
        };
        if is_populated(project.get(key)) {
            debug!("Keeping existing project.{key}");
            continue;
        }
        project.insert(key, value(field.as_str()));
    }

    merge_dependency_array(
        project,
        "dependencies",
        &new.dependencies,
        "project dependencies",
        warnings,
    );
    merge_authors(project, new, warnings);

    if !project.contains_key("license")
        && let Some(license) = new.license.as_deref().filter(|l| !l.is_empty())
    {
        project.insert("license", value(license_table(license)));
    }
}

fn merge_authors(project: &mut dyn TableLike, new: &Project, warnings: &mut Vec<String>) {
    let authors: Vec<_> = new
        .authors
        .iter()
        .filter(|author| !author.is_empty())
        .map(author_table)
        .collect();
    if authors.is_empty() {
        return;
    }

    let has_authors = project.contains_key("authors");
    match project.get_mut("authors").and_then(Item::as_array_mut) {
        Some(existing) => {
            for author in authors {
                let pairs = table_pairs(&author);
                let present = existing.iter().any(|entry| {
                    entry
                        .as_inline_table()
                        .is_some_and(|table| table_pairs(table) == pairs)
                });
                if !present {
                    existing.push(author);
                }
            }
        }
        None if has_authors => {
            warnings.push("Existing project.authors is not an array, left unchanged".to_string());
        }
        None => {
            project.insert("authors", value(authors.into_iter().collect::<Array>()));
        }
    }
}

/// Union `new` into the array at `parent[key]`, keyed by package name
fn merge_dependency_array(
    parent: &mut dyn TableLike,
    key: &str,
    new: &[String],
    label: &str,
    warnings: &mut Vec<String>,
) {
    let present = parent.contains_key(key);
    match parent.get_mut(key).and_then(Item::as_array_mut) {
        Some(existing) => merge_dependency_lists(existing, new, label, warnings),
        None if present => {
            warnings.push(format!("Existing {label} is not an array, left unchanged"));
        }
        None => {
            parent.insert(key, value(dependency_array(new)));
        }
    }
}

/// Append entries whose package is not already declared. Non-string
/// entries (e.g. `{ include-group = "..." }`) are kept and never match.
fn merge_dependency_lists(
    existing: &mut Array,
    new: &[String],
    label: &str,
    warnings: &mut Vec<String>,
) {
    let mut declared: HashSet<String> = existing
        .iter()
        .filter_map(Value::as_str)
        .map(package_name)
        .filter(|name| !name.is_empty())
        .map(str::to_lowercase)
        .collect();
    let multiline = is_multiline(existing);

    for dependency in new {
        let name = package_name(dependency);
        if name.is_empty() {
            continue;
        }
        if !declared.insert(name.to_lowercase()) {
            warnings.push(format!(
                "Package '{name}' already exists in {label}, keeping the existing entry"
            ));
            continue;
        }

        if multiline {
            let mut entry = Value::from(dependency.as_str());
            entry.decor_mut().set_prefix("\n    ");
            existing.push_formatted(entry);
        } else {
            existing.push(dependency.as_str());
        }
    }
}

fn merge_sources(sources: &mut dyn TableLike, new: &Manifest, warnings: &mut Vec<String>) {
    for (package, entry) in &new.sources {
        let table = entry.to_inline_table();
        let replacement = table_pairs(&table);
        let current = sources.get(package).map(item_pairs);

        match current {
            None => {
                sources.insert(package, value(table));
            }
            Some(Some(pairs)) if pairs == replacement => {}
            Some(_) => {
                warn!("Replacing source for {package}");
                warnings.push(format!(
                    "Different source for '{package}' already exists, replacing it with the new one"
                ));
                sources.insert(package, value(table));
            }
        }
    }
}

/// Bare package name of a dependency string: everything before the first
/// bracket, operator, semicolon or whitespace
pub fn package_name(dependency: &str) -> &str {
    let dependency = dependency.trim();
    let end = dependency
        .find(|c: char| matches!(c, '[' | '<' | '>' | '=' | '~' | '!' | ';') || c.is_whitespace())
        .unwrap_or(dependency.len());
    &dependency[..end]
}

/// Table at `parent[key]`, created when missing. `None` when the key holds
/// something other than a table.
fn child_table<'a>(parent: &'a mut dyn TableLike, key: &str) -> Option<&'a mut dyn TableLike> {
    if !parent.contains_key(key) {
        let mut table = Table::new();
        table.set_implicit(true);
        parent.insert(key, Item::Table(table));
    }
    parent.get_mut(key)?.as_table_like_mut()
}

/// A present, non-empty value
fn is_populated(item: Option<&Item>) -> bool {
    match item {
        None => false,
        Some(item) => match item.as_str() {
            Some(text) => !text.trim().is_empty(),
            None => !item.is_none(),
        },
    }
}

/// Key/value pairs of a table, used to compare entries regardless of layout
fn table_pairs(table: &dyn TableLike) -> BTreeMap<String, String> {
    table
        .iter()
        .map(|(key, item)| (key.to_string(), scalar_repr(item)))
        .collect()
}

fn item_pairs(item: &Item) -> Option<BTreeMap<String, String>> {
    item.as_table_like().map(table_pairs)
}

fn scalar_repr(item: &Item) -> String {
    match item.as_value() {
        Some(value) => match value.as_str() {
            Some(text) => text.to_string(),
            None => value.to_string().trim().to_string(),
        },
        None => item.to_string().trim().to_string(),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::SourceEntry;
    use crate::types::{Author, GitReference};

    fn manifest(dependencies: &[&str]) -> Manifest {
        Manifest {
            project: Project {
                name: "generated".to_string(),
                version: "0.1.0".to_string(),
                requires_python: Some(">=3.8".to_string()),
                dependencies: dependencies.iter().map(ToString::to_string).collect(),
                ..Project::default()
            },
            ..Manifest::default()
        }
    }

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("requests>=2.0"), "requests");
        assert_eq!(package_name("celery[redis]>=5"), "celery");
        assert_eq!(package_name("pytest ; python_version >= '3.8'"), "pytest");
        assert_eq!(package_name("Django~=4.2"), "Django");
        assert_eq!(package_name("numpy!=1.0"), "numpy");
        assert_eq!(package_name("flask"), "flask");
    }

    #[test]
    fn test_existing_scalars_win() {
        let existing = r#"[project]
name = "my-app"
version = ""
description = "Hand written"
"#;
        let outcome = PyProjectMerger::new().merge(existing, &manifest(&[]));
        let project = &outcome.document["project"];

        assert_eq!(project["name"].as_str(), Some("my-app"));
        // Empty existing values are filled in
        assert_eq!(project["version"].as_str(), Some("0.1.0"));
        assert_eq!(project["description"].as_str(), Some("Hand written"));
        assert_eq!(project["requires-python"].as_str(), Some(">=3.8"));
    }

    #[test]
    fn test_duplicate_dependency_warns_once() {
        let existing = r#"[project]
name = "my-app"
version = "1.0.0"
dependencies = [
    "Requests>=2.0",  # pinned for a reason
]
"#;
        let outcome = PyProjectMerger::new()
            .merge(existing, &manifest(&["requests>=2.31", "flask==3.0"]));
        let rendered = outcome.document.to_string();

        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("'requests'"));
        assert!(rendered.contains("\"Requests>=2.0\""));
        assert!(!rendered.contains("requests>=2.31"));
        assert!(rendered.contains("\"flask==3.0\""));
        assert!(rendered.contains("# pinned for a reason"));

        let dependencies = outcome.document["project"]["dependencies"]
            .as_array()
            .unwrap();
        assert_eq!(dependencies.len(), 2);
    }

    #[test]
    fn test_new_groups_adopted_and_existing_merged() {
        let existing = r#"[project]
name = "my-app"
version = "1.0.0"
dependencies = []

[dependency-groups]
dev = ["pytest>=7", { include-group = "lint" }]
lint = ["ruff"]
"#;
        let mut new = manifest(&[]);
        new.dependency_groups.insert(
            "dev".to_string(),
            vec!["pytest>=8".to_string(), "coverage".to_string()],
        );
        new.dependency_groups
            .insert("docs".to_string(), vec!["sphinx".to_string()]);

        let outcome = PyProjectMerger::new().merge(existing, &new);
        let groups = &outcome.document["dependency-groups"];

        let dev = groups["dev"].as_array().unwrap();
        assert_eq!(dev.len(), 3);
        assert!(dev.iter().any(|v| v.is_inline_table()));
        assert!(dev.iter().any(|v| v.as_str() == Some("coverage")));
        assert_eq!(groups["docs"].as_array().unwrap().len(), 1);
        assert_eq!(groups["lint"].as_array().unwrap().len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_authors_and_license() {
        let existing = r#"[project]
name = "my-app"
version = "1.0.0"
authors = [{ name = "Ada", email = "ada@example.com" }]
license = "Apache-2.0"
"#;
        let mut new = manifest(&[]);
        new.project.license = Some("MIT".to_string());
        new.project.authors = vec![
            Author {
                name: Some("Ada".to_string()),
                email: Some("ada@example.com".to_string()),
            },
            Author {
                name: Some("Grace".to_string()),
                email: None,
            },
        ];

        let outcome = PyProjectMerger::new().merge(existing, &new);
        let project = &outcome.document["project"];

        assert_eq!(project["authors"].as_array().unwrap().len(), 2);
        assert_eq!(project["license"].as_str(), Some("Apache-2.0"));
    }

    #[test]
    fn test_sources_replaced_with_warning() {
        let existing = r#"[project]
name = "my-app"
version = "1.0.0"
dependencies = ["mylib", "other"]

[tool.uv.sources]
mylib = { git = "https://github.com/old/mylib.git", branch = "main" }
other = { path = "../other" }
"#;
        let mut new = manifest(&["mylib", "other"]);
        new.sources.insert(
            "mylib".to_string(),
            SourceEntry::Git {
                git: "https://github.com/new/mylib.git".to_string(),
                reference: GitReference::Tag("v2.0".to_string()),
                subdirectory: None,
            },
        );
        new.sources.insert(
            "other".to_string(),
            SourceEntry::Path {
                path: "../other".to_string(),
                editable: false,
            },
        );

        let outcome = PyProjectMerger::new().merge(existing, &new);
        let sources = &outcome.document["tool"]["uv"]["sources"];

        assert_eq!(
            sources["mylib"]["git"].as_str(),
            Some("https://github.com/new/mylib.git")
        );
        assert_eq!(sources["mylib"]["tag"].as_str(), Some("v2.0"));
        // Identical source and duplicate dependencies: only the replacement warns
        let source_warnings: Vec<&String> = outcome
            .warnings
            .iter()
            .filter(|w| w.contains("Different source"))
            .collect();
        assert_eq!(source_warnings.len(), 1);
        assert!(source_warnings[0].contains("mylib"));
    }

    #[test]
    fn test_unrelated_content_preserved() {
        let existing = r#"# Project configuration
[project]
name = "my-app"
version = "1.0.0"

[tool.ruff]
line-length = 100
"#;
        let outcome = PyProjectMerger::new().merge(existing, &manifest(&["flask"]));
        let rendered = outcome.document.to_string();

        assert!(rendered.starts_with("# Project configuration\n[project]"));
        assert!(rendered.contains("[tool.ruff]\nline-length = 100"));
        assert!(rendered.contains("flask"));
        assert!(outcome.warnings.is_empty());
        assert!(!outcome.replaced_existing);
    }

    #[test]
    fn test_non_array_fields_left_unchanged() {
        let existing = r#"[project]
name = "my-app"
version = "1.0.0"
authors = "Ada"
dependencies = "flask"

[dependency-groups]
dev = "pytest"
"#;
        let mut new = manifest(&["requests"]);
        new.project.authors = vec![Author {
            name: Some("Grace".to_string()),
            email: None,
        }];
        new.dependency_groups
            .insert("dev".to_string(), vec!["coverage".to_string()]);

        let outcome = PyProjectMerger::new().merge(existing, &new);
        let project = &outcome.document["project"];

        assert_eq!(project["authors"].as_str(), Some("Ada"));
        assert_eq!(project["dependencies"].as_str(), Some("flask"));
        assert_eq!(
            outcome.document["dependency-groups"]["dev"].as_str(),
            Some("pytest")
        );
        assert_eq!(outcome.warnings.len(), 3);
        assert!(outcome.warnings.iter().all(|w| w.contains("not an array")));
    }

    #[test]
    fn test_missing_arrays_are_created() {
        let existing = "[project]\nname = \"my-app\"\nversion = \"1.0.0\"\n";
        let mut new = manifest(&["requests"]);
        new.project.authors = vec![Author {
            name: Some("Grace".to_string()),
            email: None,
        }];

        let outcome = PyProjectMerger::new().merge(existing, &new);
        let project = &outcome.document["project"];

        assert_eq!(project["authors"].as_array().unwrap().len(), 1);
        assert_eq!(project["dependencies"].as_array().unwrap().len(), 1);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_malformed_existing_falls_back() {
        let new = manifest(&["flask"]);
        let outcome = PyProjectMerger::new().merge("[project\nname = ", &new);

        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("Error reading existing pyproject.toml"));
        assert!(outcome.replaced_existing);
        assert_eq!(outcome.document.to_string(), new.to_document().to_string());
    }

    #[test]
    fn test_merge_missing_file_falls_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let new = manifest(&["flask"]);
        let outcome = PyProjectMerger::new().merge_file(&dir.path().join("pyproject.toml"), &new);

        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.replaced_existing);
        assert_eq!(outcome.document.to_string(), new.to_document().to_string());
    }
}
