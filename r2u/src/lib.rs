pub mod cli;
pub mod detector;
pub mod output;
pub mod validator;

pub use requirements_to_uv_core::{
    Conversion, ConvertError, Manifest, Metadata, ParsedRequirement, PyProjectConverter,
    PyProjectMerger, RequirementGroups, RequirementsParser,
};
