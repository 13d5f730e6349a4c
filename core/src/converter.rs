//! Builds a manifest from parsed requirement groups.

use crate::manifest::{Manifest, Project, SourceEntry};
use crate::types::{Metadata, ParsedRequirement, Source};
use indexmap::IndexMap;
use tracing::debug;

/// Group whose records become `project.dependencies`
pub const MAIN_GROUP: &str = "main";

/// Processing order for well-known groups; others follow alphabetically
const GROUP_ORDER: [&str; 5] = [MAIN_GROUP, "dev", "test", "docs", "lint"];

/// Parsed requirements keyed by group name
pub type RequirementGroups = IndexMap<String, Vec<ParsedRequirement>>;

/// Result of one conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversion {
    pub manifest: Manifest,
    /// Record warnings in order of occurrence, not deduplicated
    pub warnings: Vec<String>,
    /// `# Original option: ...` lines for the output header
    pub comments: Vec<String>,
}

/// Converts requirement groups into a pyproject manifest
pub struct PyProjectConverter;

impl PyProjectConverter {
    pub fn new() -> Self {
        Self
    }

    pub fn convert(&self, metadata: &Metadata, groups: &RequirementGroups) -> Conversion {
        let mut conversion = Conversion::default();
        let mut dependencies = Vec::new();

        let ordered = ordered_groups(groups);
        for &(name, requirements) in &ordered {
            let rendered = render_group(
                requirements,
                &mut conversion.warnings,
                &mut conversion.comments,
            );
            debug!("Group {name}: {} dependencies", rendered.len());

            if name == MAIN_GROUP {
                dependencies = rendered;
            } else if !rendered.is_empty() {
                conversion
                    .manifest
                    .dependency_groups
                    .insert(name.to_string(), rendered);
            }
        }

        conversion.manifest.project = project(metadata, dependencies);
        conversion.manifest.sources = sources(&ordered);
        conversion
    }
}

impl Default for PyProjectConverter {
    fn default() -> Self {
        Self::new()
    }
}

fn group_rank(name: &str) -> usize {
    GROUP_ORDER
        .iter()
        .position(|known| *known == name)
        .unwrap_or(GROUP_ORDER.len())
}

/// Groups in canonical order, independent of map insertion order
fn ordered_groups(groups: &RequirementGroups) -> Vec<(&str, &[ParsedRequirement])> {
    let mut ordered: Vec<(&str, &[ParsedRequirement])> = groups
        .iter()
        .map(|(name, requirements)| (name.as_str(), requirements.as_slice()))
        .collect();
    ordered.sort_by(|a, b| {
        group_rank(a.0)
            .cmp(&group_rank(b.0))
            .then_with(|| a.0.cmp(b.0))
    });
    ordered
}

fn render_group(
    requirements: &[ParsedRequirement],
    warnings: &mut Vec<String>,
    comments: &mut Vec<String>,
) -> Vec<String> {
    let mut dependencies = Vec::new();

    for requirement in requirements {
        warnings.extend(requirement.warnings.iter().cloned());

        match &requirement.source {
            Source::Directive { raw_option } => {
                if !raw_option.is_empty() {
                    comments.push(format!("# Original option: {raw_option}"));
                }
            }
            Source::Pypi => dependencies.push(render_pypi(requirement)),
            Source::Git(_) | Source::Url { .. } | Source::Path { .. } => {
                dependencies.push(requirement.name_with_extras());
            }
        }
    }

    dependencies
}

/// `name[extras]spec; markers`
fn render_pypi(requirement: &ParsedRequirement) -> String {
    let mut dependency = requirement.name_with_extras();
    dependency.push_str(&requirement.version_spec);
    if let Some(markers) = requirement.markers.as_deref().filter(|m| !m.is_empty()) {
        dependency.push_str("; ");
        dependency.push_str(markers);
    }
    dependency
}

/// One global source table over all groups; later groups overwrite earlier ones
fn sources(ordered: &[(&str, &[ParsedRequirement])]) -> IndexMap<String, SourceEntry> {
    let mut sources = IndexMap::new();
    for requirement in ordered.iter().flat_map(|(_, requirements)| requirements.iter()) {
        if let Some(entry) = SourceEntry::from_requirement(requirement) {
            sources.insert(requirement.package.clone(), entry);
        }
    }
    sources
}

fn project(metadata: &Metadata, dependencies: Vec<String>) -> Project {
    Project {
        name: metadata.name.clone(),
        version: metadata.version.clone(),
        description: metadata.description.clone(),
        readme: metadata.readme.clone(),
        requires_python: metadata.requires_python.clone(),
        authors: metadata
            .authors
            .iter()
            .filter(|author| !author.is_empty())
            .cloned()
            .collect(),
        license: metadata.license.clone(),
        dependencies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GitReference, GitSource};

    fn git(package: &str, url: &str, reference: &str) -> ParsedRequirement {
        ParsedRequirement::new(
            package,
            Source::Git(GitSource {
                url: url.to_string(),
                reference: reference.to_string(),
                subdirectory: None,
            }),
        )
    }

    fn groups(entries: Vec<(&str, Vec<ParsedRequirement>)>) -> RequirementGroups {
        entries
            .into_iter()
            .map(|(name, requirements)| (name.to_string(), requirements))
            .collect()
    }

    #[test]
    fn test_render_pypi() {
        let req = ParsedRequirement::pypi("celery", ">=5.0.0")
            .with_extras(["redis", "msgpack"])
            .with_markers("python_version >= \"3.8\"");
        assert_eq!(
            render_pypi(&req),
            "celery[redis,msgpack]>=5.0.0; python_version >= \"3.8\""
        );
        assert_eq!(render_pypi(&ParsedRequirement::pypi("flask", "")), "flask");
    }

    #[test]
    fn test_main_only_has_no_dependency_groups() {
        let conversion = PyProjectConverter::new().convert(
            &Metadata::new("demo", "0.1.0"),
            &groups(vec![(
                "main",
                vec![
                    ParsedRequirement::pypi("requests", ">=2.0"),
                    ParsedRequirement::pypi("flask", "==3.0"),
                ],
            )]),
        );

        let manifest = &conversion.manifest;
        assert_eq!(manifest.project.dependencies, vec!["requests>=2.0", "flask==3.0"]);
        assert!(manifest.dependency_groups.is_empty());
        assert!(manifest.sources.is_empty());
        assert!(!manifest.to_document().to_string().contains("dependency-groups"));
    }

    #[test]
    fn test_non_registry_sources_render_bare() {
        let conversion = PyProjectConverter::new().convert(
            &Metadata::new("demo", "0.1.0"),
            &groups(vec![(
                "main",
                vec![
                    git("mylib", "https://github.com/u/mylib.git", "v1.2").with_extras(["cli"]),
                    ParsedRequirement::new(
                        "local",
                        Source::Path {
                            path: "./local".to_string(),
                        },
                    )
                    .with_editable(true),
                ],
            )]),
        );

        let manifest = &conversion.manifest;
        assert_eq!(manifest.project.dependencies, vec!["mylib[cli]", "local"]);
        assert_eq!(
            manifest.sources["mylib"],
            SourceEntry::Git {
                git: "https://github.com/u/mylib.git".to_string(),
                reference: GitReference::Tag("v1.2".to_string()),
                subdirectory: None,
            }
        );
        assert!(matches!(
            manifest.sources["local"],
            SourceEntry::Path { editable: true, .. }
        ));

        // Every source-override name is declared as a dependency
        for package in manifest.sources.keys() {
            assert!(manifest.project.dependencies.iter().any(|d| d.starts_with(package.as_str())));
        }
    }

    #[test]
    fn test_directives_become_comments() {
        let directive = ParsedRequirement::new(
            "",
            Source::Directive {
                raw_option: "--index-url https://mirror/simple".to_string(),
            },
        )
        .with_warnings(vec!["Index URLs are not supported".to_string()]);

        let conversion = PyProjectConverter::new().convert(
            &Metadata::new("demo", "0.1.0"),
            &groups(vec![(
                "main",
                vec![directive, ParsedRequirement::pypi("flask", "")],
            )]),
        );

        assert_eq!(conversion.manifest.project.dependencies, vec!["flask"]);
        assert_eq!(
            conversion.comments,
            vec!["# Original option: --index-url https://mirror/simple"]
        );
        assert_eq!(conversion.warnings, vec!["Index URLs are not supported"]);
    }

    #[test]
    fn test_groups_in_canonical_order() {
        let conversion = PyProjectConverter::new().convert(
            &Metadata::new("demo", "0.1.0"),
            &groups(vec![
                ("lint", vec![ParsedRequirement::pypi("ruff", "")]),
                ("extra", vec![ParsedRequirement::pypi("rich", "")]),
                ("dev", vec![ParsedRequirement::pypi("pytest", "")]),
                ("docs", Vec::new()),
                ("main", vec![ParsedRequirement::pypi("flask", "")]),
            ]),
        );

        let names: Vec<&str> = conversion
            .manifest
            .dependency_groups
            .keys()
            .map(String::as_str)
            .collect();
        // Empty groups are left out
        assert_eq!(names, vec!["dev", "lint", "extra"]);
    }

    #[test]
    fn test_source_conflict_last_group_wins() {
        // Insertion order puts dev first; canonical order still processes main first
        let conversion = PyProjectConverter::new().convert(
            &Metadata::new("demo", "0.1.0"),
            &groups(vec![
                ("dev", vec![git("shared", "https://github.com/u/shared.git", "develop")]),
                ("main", vec![git("shared", "https://github.com/u/shared.git", "v2.0")]),
            ]),
        );

        let sources = &conversion.manifest.sources;
        assert_eq!(sources.len(), 1);
        assert!(matches!(
            &sources["shared"],
            SourceEntry::Git { reference: GitReference::Branch(branch), .. } if branch == "develop"
        ));
        assert!(conversion.warnings.is_empty());
    }

    #[test]
    fn test_metadata_flows_into_project() {
        let mut metadata = Metadata::new("demo", "1.2.3");
        metadata.requires_python = Some(">=3.10".to_string());
        metadata.license = Some("MIT".to_string());

        let conversion = PyProjectConverter::new().convert(&metadata, &RequirementGroups::new());
        let project = &conversion.manifest.project;

        assert_eq!(project.name, "demo");
        assert_eq!(project.version, "1.2.3");
        assert_eq!(project.requires_python.as_deref(), Some(">=3.10"));
        assert_eq!(project.license.as_deref(), Some("MIT"));
        assert!(project.dependencies.is_empty());
    }
}
