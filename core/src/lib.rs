pub mod converter;
pub mod error;
pub mod manifest;
pub mod merger;
pub mod parser;
pub mod types;
pub mod version;

// Re-export commonly used types at crate root
pub use converter::{Conversion, MAIN_GROUP, PyProjectConverter, RequirementGroups};
pub use error::ConvertError;
pub use manifest::{Manifest, Project, SourceEntry};
pub use merger::{MergeOutcome, PyProjectMerger};
pub use parser::{ParsedFile, RequirementsParser};
pub use types::{
    Author, GitReference, GitSource, Metadata, ParsedRequirement, Source, SourceKind,
};
pub use version::{Version, VersionError};
