//! Errors shared by the marco crates.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarcoError {
    #[error("Failed to parse {file_type}: {message}")]
    ParseError { file_type: String, message: String },

    #[error("Invalid Maven coordinates '{coordinates}': expected 'groupId:artifactId:version'")]
    InvalidCoordinates { coordinates: String },

    #[error("Could not find version '{version}' of '{package}' in repository metadata")]
    MetadataNotFound { package: String, version: String },

    #[error("Maven repository request failed for '{package}': {source}")]
    RegistryError {
        package: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl MarcoError {
    pub(crate) fn xml(file_type: &str, err: impl std::fmt::Display) -> Self {
        Self::ParseError {
            file_type: file_type.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MarcoError>;
