//! Errors raised while rewriting POM files.

use marco_core::MarcoError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("{}: no top-level <dependencies> element to insert into", .path.display())]
    MissingDependencies { path: PathBuf },

    #[error("Invalid POM layout: {0}")]
    Layout(String),

    #[error("Compatibility service request for {gav} failed: {message}")]
    Service { gav: String, message: String },

    #[error("Range converter '{command}' failed: {message}")]
    Converter { command: String, message: String },

    #[error("'{command}' failed: {message}")]
    BuildTool { command: String, message: String },

    #[error(transparent)]
    Core(#[from] MarcoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RewriteError>;

impl From<RewriteError> for MarcoError {
    fn from(err: RewriteError) -> Self {
        match err {
            RewriteError::Core(e) => e,
            RewriteError::Io(e) => Self::Io(e),
            other => Self::Other(Box::new(other)),
        }
    }
}
