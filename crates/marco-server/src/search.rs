//! Directional compatibility search.
//!
//! Candidates arrive newest first and must contain the base version. The
//! versions older than the base (downgrades) are walked outward from the
//! base first, then the newer ones (upgrades). Each direction stops on its
//! own after too many consecutive failures or once the index limit is hit.

use crate::error::{CompatError, Result};
use crate::oracle::{CheckError, CompatibilityOracle, FailureTag, Verdict};
use crate::store::CompatibilityStore;
use marco_core::Gav;
use std::collections::BTreeSet;
use std::sync::Arc;

pub const DEFAULT_INDEX_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Consecutive failures after which a direction is abandoned.
    pub max_consecutive_failures: Option<usize>,
    /// Candidates examined per direction, skips included.
    pub index_limit: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_consecutive_failures: None,
            index_limit: DEFAULT_INDEX_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    #[default]
    Full,
    /// Skip dynamic checks; a static pass counts as a success.
    StaticOnly,
}

/// Classification of one candidate against the base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityResult {
    pub base: Gav,
    pub candidate: String,
    pub statically_compatible: bool,
    /// `None` when the dynamic check was not run in static-only mode.
    pub dynamically_compatible: Option<bool>,
    pub error: Option<FailureTag>,
}

impl CompatibilityResult {
    fn new(
        base: &Gav,
        candidate: &str,
        statically_compatible: bool,
        dynamically_compatible: Option<bool>,
        error: Option<FailureTag>,
    ) -> Self {
        Self {
            base: base.clone(),
            candidate: candidate.to_string(),
            statically_compatible,
            dynamically_compatible,
            error,
        }
    }

    fn skipped(base: &Gav, candidate: &str) -> Self {
        Self::new(base, candidate, false, Some(false), Some(FailureTag::NoJar))
    }

    /// The candidate artifact was unavailable; it neither passed nor failed.
    pub fn is_skip(&self) -> bool {
        self.error == Some(FailureTag::NoJar)
    }

    pub fn is_compatible(&self) -> bool {
        self.statically_compatible && self.dynamically_compatible != Some(false)
    }
}

/// Candidates split around the base, each list ordered closest to the base first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directions {
    pub downgrades: Vec<String>,
    pub upgrades: Vec<String>,
}

impl Directions {
    pub fn split(base: &Gav, candidates: &[String]) -> Result<Self> {
        let index = candidates
            .iter()
            .position(|v| *v == base.version)
            .ok_or_else(|| CompatError::BaseNotInCandidates {
                package: base.name(),
                version: base.version.clone(),
            })?;

        Ok(Self {
            downgrades: candidates[index + 1..].to_vec(),
            upgrades: candidates[..index].iter().rev().cloned().collect(),
        })
    }
}

pub struct CompatibilitySearch {
    oracle: Arc<dyn CompatibilityOracle>,
    limits: SearchLimits,
    mode: SearchMode,
}

impl CompatibilitySearch {
    pub fn new(oracle: Arc<dyn CompatibilityOracle>, limits: SearchLimits) -> Self {
        Self {
            oracle,
            limits,
            mode: SearchMode::Full,
        }
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Classifies candidates, downgrades first then upgrades, in visit order.
    pub async fn compute_trail(
        &self,
        base: &Gav,
        candidates: &[String],
    ) -> Result<Vec<CompatibilityResult>> {
        let directions = Directions::split(base, candidates)?;

        if self.mode == SearchMode::Full {
            self.oracle
                .prepare(base)
                .await
                .map_err(|e| check_error(base, e))?;
        }

        let mut trail = self.walk(base, &directions.downgrades).await?;
        trail.extend(self.walk(base, &directions.upgrades).await?);
        Ok(trail)
    }

    /// Computes the compatibility set of `base` and merges it into `store`.
    ///
    /// Returns the stored set after the merge, which always contains the base.
    pub async fn compute_set(
        &self,
        store: &CompatibilityStore,
        base: &Gav,
        candidates: &[String],
    ) -> Result<BTreeSet<String>> {
        let trail = self.compute_trail(base, candidates).await?;

        let found = std::iter::once(base.version.clone()).chain(
            trail
                .into_iter()
                .filter(CompatibilityResult::is_compatible)
                .map(|result| result.candidate),
        );
        store.merge(&base.to_string(), found).await
    }

    async fn walk(&self, base: &Gav, direction: &[String]) -> Result<Vec<CompatibilityResult>> {
        let mut results = Vec::new();
        let mut failures = 0;

        for (index, candidate) in direction.iter().enumerate() {
            if index >= self.limits.index_limit {
                tracing::debug!("index limit {} reached for {}", self.limits.index_limit, base);
                break;
            }
            if let Some(max) = self.limits.max_consecutive_failures
                && failures >= max
            {
                tracing::debug!("{} consecutive failures for {}, stopping direction", failures, base);
                break;
            }

            let result = self.classify(base, candidate).await?;
            if result.is_skip() {
                tracing::info!("candidate {} of {} not found, skipping", candidate, base.name());
            } else if result.is_compatible() {
                failures = 0;
            } else {
                failures += 1;
            }

            tracing::debug!(
                "{} -> {}: static={} dynamic={:?} error={:?}",
                base,
                candidate,
                result.statically_compatible,
                result.dynamically_compatible,
                result.error
            );
            results.push(result);
        }

        Ok(results)
    }

    async fn classify(&self, base: &Gav, candidate: &str) -> Result<CompatibilityResult> {
        match self.oracle.statically_compatible(base, candidate).await {
            Ok(Verdict::Compatible) => {}
            Ok(Verdict::Incompatible(tag)) => {
                return Ok(CompatibilityResult::new(base, candidate, false, Some(false), tag));
            }
            Err(CheckError::CandidateArtifactMissing) => {
                return Ok(CompatibilityResult::skipped(base, candidate));
            }
            Err(e) => return Err(check_error(base, e)),
        }

        if self.mode == SearchMode::StaticOnly {
            return Ok(CompatibilityResult::new(base, candidate, true, None, None));
        }

        match self.oracle.dynamically_compatible(base, candidate).await {
            Ok(Verdict::Compatible) => Ok(CompatibilityResult::new(base, candidate, true, Some(true), None)),
            Ok(Verdict::Incompatible(tag)) => {
                Ok(CompatibilityResult::new(base, candidate, true, Some(false), tag))
            }
            Err(CheckError::CandidateArtifactMissing) => Ok(CompatibilityResult::skipped(base, candidate)),
            Err(e) => Err(check_error(base, e)),
        }
    }
}

fn check_error(base: &Gav, err: CheckError) -> CompatError {
    match err {
        CheckError::BaseArtifactMissing | CheckError::CandidateArtifactMissing => {
            CompatError::BaseArtifactMissing {
                gav: base.to_string(),
            }
        }
        CheckError::Failed { command, message } => CompatError::OracleFailure { command, message },
    }
}
