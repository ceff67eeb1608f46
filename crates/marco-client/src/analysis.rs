//! Used-but-undeclared dependency discovery.

use crate::error::Result;
use async_trait::async_trait;
use marco_core::{PomDependency, parse_pom};
use std::path::Path;

/// Line after which `dependency:analyze-only -DoutputXML` prints the missing
/// dependencies as XML.
pub const MISSING_DEPENDENCIES_MARKER: &str =
    "[INFO] Add the following to your pom to correct the missing dependencies:";

#[async_trait]
pub trait BuildAnalyzer: Send + Sync {
    /// Dependencies the build uses without declaring them in `pom`.
    async fn missing_dependencies(&self, pom: &Path) -> Result<Vec<PomDependency>>;
}

/// Extracts the missing `compile`/`runtime` dependencies from an analysis report.
///
/// Log lines (starting with `[`) after the marker are ignored; the remaining
/// lines form a `<dependency>` list.
pub fn parse_missing(report: &str) -> Result<Vec<PomDependency>> {
    let Some((_, after)) = report.split_once(MISSING_DEPENDENCIES_MARKER) else {
        return Ok(Vec::new());
    };

    let mut fragment = String::from("<dependencies>\n");
    for line in after.lines().skip(1) {
        if line.starts_with('[') {
            continue;
        }
        fragment.push_str(line);
        fragment.push('\n');
    }
    fragment.push_str("</dependencies>");

    let doc = parse_pom(&fragment)?;
    Ok(doc
        .dependencies
        .into_iter()
        .filter(|dep| dep.scope.is_rewritable())
        .collect())
}
