use std::path::PathBuf;

use thiserror::Error;


/// Fatal conversion failures.
///
/// Everything that lets the computation continue is reported through
/// [`Diagnostics`](crate::diagnostics::Diagnostics) instead.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Cannot read file {path:?}: {source}")]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed input in {file}: {message}")]
    MalformedInput {
        file: String,
        message: String,
    },

    #[error("Inconsistent dimensions: {0}")]
    InconsistentDimensions(String),

    #[error("Numerical invariant violated: {0}")]
    NumericalInvariantViolation(String),

    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("Archive error: {0}")]
    Archive(String),
}

impl ConvertError {
    pub fn malformed(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            file: file.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(e: serde_json::Error) -> Self {
        Self::Archive(e.to_string())
    }
}

#[cfg(feature = "hdf5")]
impl From<hdf5::Error> for ConvertError {
    fn from(e: hdf5::Error) -> Self {
        Self::Archive(e.to_string())
    }
}
