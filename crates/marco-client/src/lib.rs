//! POM rewriting client.
//!
//! Loosens pinned dependency versions of a Maven project into version ranges
//! known to be compatible, after first declaring the dependencies the build
//! uses without declaring them. Parent and imported POMs in the local
//! repository are rewritten in place the same way.

pub mod analysis;
pub mod edit;
pub mod effective;
pub mod error;
pub mod maven;
pub mod range;
pub mod rewriter;
pub mod service;

pub use analysis::{BuildAnalyzer, parse_missing};
pub use effective::DescriptorDeriver;
pub use error::{Result, RewriteError};
pub use maven::MavenInvoker;
pub use range::{CommandRangeConverter, RangeConverter};
pub use rewriter::{PomRewriter, RewriteSummary};
pub use service::{CompatibilityService, HttpCompatibilityService};
