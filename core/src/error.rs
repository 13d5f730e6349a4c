use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop a conversion. Problems with individual lines or
/// included files are reported as warnings instead.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to read requirements file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(
        "No requirements files found in {}. Specify one with --requirements or create a requirements.txt",
        .0.display()
    )]
    NoRequirementsFiles(PathBuf),
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
