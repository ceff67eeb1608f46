//! Shared model for the marco tools.
//!
//! Maven coordinates, version classification, the pom.xml reader, property
//! resolution and published-version lookup used by both the compatibility
//! server and the POM rewriting client.

pub mod api;
pub mod config;
pub mod error;
pub mod gav;
pub mod pom;
pub mod properties;
pub mod registry;
pub mod version;

pub use config::MarcoConfig;
pub use error::{MarcoError, Result};
pub use gav::{Gav, MavenScope};
pub use pom::{DependencySection, PomDependency, PomDocument, parse_pom};
pub use properties::PropertyTable;
pub use registry::{LocalRepository, MavenRepository, VersionSource, versions_including};
pub use version::{compare_versions, is_soft};
