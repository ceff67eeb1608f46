//! Effective descriptor derivation.

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// File the effective descriptor is cached in, next to the source POM.
pub const EFFECTIVE_POM_FILE: &str = "effective_pom.xml";

#[async_trait]
pub trait DescriptorDeriver: Send + Sync {
    /// XML of `pom` with inheritance and interpolation applied.
    async fn effective_descriptor(&self, pom: &Path) -> Result<String>;
}
