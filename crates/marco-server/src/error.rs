//! Errors raised by the compatibility search and store.

use marco_core::MarcoError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompatError {
    #[error("Base version '{version}' of '{package}' is not among the candidate versions")]
    BaseNotInCandidates { package: String, version: String },

    #[error("Could not find the artifact of base version {gav} for compatibility comparison")]
    BaseArtifactMissing { gav: String },

    #[error("Compatibility check '{command}' failed: {message}")]
    OracleFailure { command: String, message: String },

    #[error("Compatibility store {} is unreadable: {}", .path.display(), .message)]
    Store { path: PathBuf, message: String },

    #[error(transparent)]
    Core(#[from] MarcoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CompatError>;

impl From<CompatError> for MarcoError {
    fn from(err: CompatError) -> Self {
        match err {
            CompatError::Core(e) => e,
            CompatError::Io(e) => Self::Io(e),
            CompatError::Json(e) => Self::Json(e),
            other => Self::Other(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_missing_display() {
        let err = CompatError::BaseArtifactMissing {
            gav: "org.slf4j:slf4j-api:2.0.9".into(),
        };
        assert_eq!(
            err.to_string(),
            "Could not find the artifact of base version org.slf4j:slf4j-api:2.0.9 for compatibility comparison"
        );
    }

    #[test]
    fn test_from_core_error() {
        let err: CompatError = MarcoError::InvalidCoordinates {
            coordinates: "bad".into(),
        }
        .into();
        assert!(matches!(err, CompatError::Core(_)));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_into_core_error() {
        let err: MarcoError = CompatError::BaseNotInCandidates {
            package: "g:a".into(),
            version: "1.0".into(),
        }
        .into();
        assert!(matches!(err, MarcoError::Other(_)));
        assert!(err.to_string().contains("not among the candidate versions"));
    }
}
