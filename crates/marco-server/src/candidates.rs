//! Candidate list for a search.

use crate::error::{CompatError, Result};
use marco_core::{Gav, VersionSource, versions_including};

/// Published versions of `base`, newest first, optionally narrowed to at most
/// `max_candidates` upgrades and downgrades around the base.
pub async fn candidate_versions(
    source: &dyn VersionSource,
    base: &Gav,
    max_candidates: Option<usize>,
) -> Result<Vec<String>> {
    let versions = versions_including(source, base).await?;
    match max_candidates {
        Some(max) => window(&versions, base, max),
        None => Ok(versions),
    }
}

/// Keeps `max` versions on each side of `base`.
pub fn window(versions: &[String], base: &Gav, max: usize) -> Result<Vec<String>> {
    let index = versions
        .iter()
        .position(|v| *v == base.version)
        .ok_or_else(|| CompatError::BaseNotInCandidates {
            package: base.name(),
            version: base.version.clone(),
        })?;

    let start = index.saturating_sub(max);
    let end = (index + 1 + max).min(versions.len());
    Ok(versions[start..end].to_vec())
}
