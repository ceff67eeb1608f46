//! Compatibility search and query service.
//!
//! Classifies candidate versions of a Maven artifact against a base version
//! through a [`CompatibilityOracle`], records the compatible ones in a
//! [`CompatibilityStore`], and answers lookups over HTTP.

pub mod candidates;
pub mod error;
pub mod oracle;
pub mod search;
pub mod service;
pub mod store;

pub use candidates::candidate_versions;
pub use error::{CompatError, Result};
pub use oracle::{CheckError, CommandOracle, CompatibilityOracle, FailureTag, Verdict};
pub use search::{CompatibilityResult, CompatibilitySearch, SearchLimits, SearchMode};
pub use store::CompatibilityStore;
