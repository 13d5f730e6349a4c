//! The manifest fragment produced by the converter, and its rendering to a
//! `pyproject.toml` document.

use crate::types::{Author, GitReference, ParsedRequirement, Source};
use indexmap::IndexMap;
use toml_edit::{Array, DocumentMut, InlineTable, Item, RawString, Table, value};

/// `[project]` table contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub readme: Option<String>,
    pub requires_python: Option<String>,
    pub authors: Vec<Author>,
    pub license: Option<String>,
    pub dependencies: Vec<String>,
}

/// One `tool.uv.sources` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEntry {
    Git {
        git: String,
        reference: GitReference,
        subdirectory: Option<String>,
    },
    Url {
        url: String,
    },
    Path {
        path: String,
        editable: bool,
    },
}

impl SourceEntry {
    /// Source override for a requirement, `None` for registry packages and directives
    pub fn from_requirement(requirement: &ParsedRequirement) -> Option<Self> {
        match &requirement.source {
            Source::Pypi | Source::Directive { .. } => None,
            Source::Git(git) => Some(SourceEntry::Git {
                git: git.url.clone(),
                reference: GitReference::classify(&git.reference),
                subdirectory: git.subdirectory.clone(),
            }),
            Source::Url { url } => Some(SourceEntry::Url { url: url.clone() }),
            Source::Path { path } => Some(SourceEntry::Path {
                path: path.clone(),
                editable: requirement.editable,
            }),
        }
    }

    pub fn to_inline_table(&self) -> InlineTable {
        let mut table = InlineTable::new();
        match self {
            SourceEntry::Git {
                git,
                reference,
                subdirectory,
            } => {
                table.insert("git", git.as_str().into());
                table.insert(reference.key(), reference.value().into());
                if let Some(subdirectory) = subdirectory {
                    table.insert("subdirectory", subdirectory.as_str().into());
                }
            }
            SourceEntry::Url { url } => {
                table.insert("url", url.as_str().into());
            }
            SourceEntry::Path { path, editable } => {
                table.insert("path", path.as_str().into());
                if *editable {
                    table.insert("editable", true.into());
                }
            }
        }
        table
    }
}

/// A generated `pyproject.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub project: Project,
    /// Non-main groups, only those with at least one dependency
    pub dependency_groups: IndexMap<String, Vec<String>>,
    /// Global source overrides, keyed by package name
    pub sources: IndexMap<String, SourceEntry>,
}

impl Manifest {
    pub fn to_document(&self) -> DocumentMut {
        let mut doc = DocumentMut::new();
        doc.insert("project", Item::Table(self.project_table()));

        if !self.dependency_groups.is_empty() {
            let mut groups = Table::new();
            for (name, dependencies) in &self.dependency_groups {
                groups.insert(name.as_str(), value(dependency_array(dependencies)));
            }
            doc.insert("dependency-groups", Item::Table(groups));
        }

        if !self.sources.is_empty() {
            let mut sources = Table::new();
            for (package, entry) in &self.sources {
                sources.insert(package.as_str(), value(entry.to_inline_table()));
            }

            let mut uv = Table::new();
            uv.set_implicit(true);
            uv.insert("sources", Item::Table(sources));

            let mut tool = Table::new();
            tool.set_implicit(true);
            tool.insert("uv", Item::Table(uv));

            doc.insert("tool", Item::Table(tool));
        }

        doc
    }

    /// Render with the header comments above the document
    pub fn render(&self, comments: &[String]) -> String {
        with_header_comments(&self.to_document().to_string(), comments)
    }

    fn project_table(&self) -> Table {
        let project = &self.project;
        let mut table = Table::new();

        table.insert("name", value(project.name.as_str()));
        table.insert("version", value(project.version.as_str()));
        let optional = [
            ("description", &project.description),
            ("readme", &project.readme),
            ("requires-python", &project.requires_python),
        ];
        for (key, field) in optional {
            if let Some(field) = field.as_deref().filter(|f| !f.is_empty()) {
                table.insert(key, value(field));
            }
        }

        let authors: Array = project
            .authors
            .iter()
            .filter(|author| !author.is_empty())
            .map(author_table)
            .collect();
        if !authors.is_empty() {
            table.insert("authors", value(authors));
        }

        if let Some(license) = project.license.as_deref().filter(|l| !l.is_empty()) {
            table.insert("license", value(license_table(license)));
        }

        table.insert("dependencies", value(dependency_array(&project.dependencies)));
        table
    }
}

/// `{ name = "...", email = "..." }`
pub fn author_table(author: &Author) -> InlineTable {
    let mut table = InlineTable::new();
    if let Some(name) = &author.name {
        table.insert("name", name.as_str().into());
    }
    if let Some(email) = &author.email {
        table.insert("email", email.as_str().into());
    }
    table
}

/// `{ text = "MIT" }`
pub fn license_table(license: &str) -> InlineTable {
    let mut table = InlineTable::new();
    table.insert("text", license.into());
    table
}

/// One dependency per line, trailing comma; empty lists stay `[]`
pub fn dependency_array(dependencies: &[String]) -> Array {
    let mut array: Array = dependencies.iter().map(String::as_str).collect();
    if !array.is_empty() {
        array
            .iter_mut()
            .for_each(|item| item.decor_mut().set_prefix("\n    "));
        array.set_trailing_comma(true);
        array.set_trailing("\n");
    }
    array
}

/// Whether an existing array is laid out one element per line
pub(crate) fn is_multiline(array: &Array) -> bool {
    array.iter().next().is_some_and(|first| {
        first
            .decor()
            .prefix()
            .and_then(RawString::as_str)
            .is_some_and(|prefix| prefix.contains('\n'))
    })
}

/// Prepend `# ...` comment lines and a blank line to rendered TOML
pub fn with_header_comments(toml: &str, comments: &[String]) -> String {
    if comments.is_empty() {
        return toml.to_string();
    }
    format!("{}\n\n{toml}", comments.join("\n"))
}
