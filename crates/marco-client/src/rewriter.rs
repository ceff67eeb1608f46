//! Recursive POM rewriting.
//!
//! One pass over a POM runs four phases in order: derive the effective
//! descriptor (for property values only), inject used-but-undeclared
//! dependencies, replace soft versions with compatible ranges, then repeat
//! the pass in place on the parent and imported POMs found in the local
//! repository.

use crate::analysis::BuildAnalyzer;
use crate::edit::{self, Edit};
use crate::effective::DescriptorDeriver;
use crate::error::{Result, RewriteError};
use crate::range::{RangeConverter, clean_range};
use crate::service::CompatibilityService;
use futures::future::{BoxFuture, FutureExt};
use marco_core::{
    Gav, PomDependency, PomDocument, PropertyTable, VersionSource, is_soft, parse_pom,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_INJECTION_ROUNDS: usize = 5;

/// Artifacts that build plugins depend on; loosening them breaks the build itself.
const DENYLIST: [(Option<&str>, &str); 3] = [
    (None, "plexus-utils"),
    (Some("commons-collections"), "commons-collections"),
    (Some("org.apache.velocity"), "velocity"),
];

pub fn is_denylisted(group_id: &str, artifact_id: &str) -> bool {
    DENYLIST
        .iter()
        .any(|(g, a)| *a == artifact_id && g.is_none_or(|g| g == group_id))
}

/// Counts for one rewritten POM, excluding its parents and imports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub injected: usize,
    pub substituted: usize,
}

pub struct PomRewriter {
    service: Arc<dyn CompatibilityService>,
    versions: Arc<dyn VersionSource>,
    converter: Arc<dyn RangeConverter>,
    analyzer: Arc<dyn BuildAnalyzer>,
    deriver: Arc<dyn DescriptorDeriver>,
    repo_root: PathBuf,
    override_existing: bool,
    injection_rounds: usize,
}

impl PomRewriter {
    pub fn new(
        service: Arc<dyn CompatibilityService>,
        versions: Arc<dyn VersionSource>,
        converter: Arc<dyn RangeConverter>,
        analyzer: Arc<dyn BuildAnalyzer>,
        deriver: Arc<dyn DescriptorDeriver>,
        repo_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            service,
            versions,
            converter,
            analyzer,
            deriver,
            repo_root: repo_root.into(),
            override_existing: false,
            injection_rounds: DEFAULT_INJECTION_ROUNDS,
        }
    }

    /// Redo POMs that were already rewritten, restoring library POMs from their backups.
    pub fn with_override(mut self, override_existing: bool) -> Self {
        self.override_existing = override_existing;
        self
    }

    pub fn with_injection_rounds(mut self, rounds: usize) -> Self {
        self.injection_rounds = rounds;
        self
    }

    /// Rewrites `source` into `dest` and recursively rewrites its parent and
    /// imported POMs in the local repository.
    pub async fn expand_and_rewrite(&self, source: &Path, dest: &Path) -> Result<RewriteSummary> {
        let mut visited = HashSet::new();
        self.rewrite(source.to_path_buf(), dest.to_path_buf(), true, &mut visited)
            .await
    }

    /// One rewrite pass; `visited` holds the POMs already handled by the current call tree.
    pub fn rewrite<'a>(
        &'a self,
        source: PathBuf,
        dest: PathBuf,
        inject: bool,
        visited: &'a mut HashSet<PathBuf>,
    ) -> BoxFuture<'a, Result<RewriteSummary>> {
        async move {
            let in_place_marker = (inject && source == dest).then(|| completion_marker(&dest));
            if !self.override_existing {
                if source != dest && dest.is_file() {
                    tracing::info!("{} already exists, skipping", dest.display());
                    return Ok(RewriteSummary::default());
                }
                if let Some(marker) = in_place_marker.as_ref().filter(|m| m.is_file()) {
                    tracing::info!("skipping already rewritten {}", marker.display());
                    return Ok(RewriteSummary::default());
                }
            }

            if !visited.insert(pom_identity(&source).await) {
                tracing::info!("skipping already visited POM {}", source.display());
                return Ok(RewriteSummary::default());
            }

            if source.parent() != dest.parent() {
                return Err(RewriteError::Layout(format!(
                    "{} and {} must be in the same directory",
                    source.display(),
                    dest.display()
                )));
            }
            if !source.is_file() {
                return Err(RewriteError::Layout(format!(
                    "{} is not a file",
                    source.display()
                )));
            }

            let properties = self.property_table(&source).await?;

            let mut current = source.clone();
            let injected = if inject {
                self.inject_missing(&mut current, &dest).await?
            } else {
                tracing::debug!("injection disabled for {}", source.display());
                0
            };

            let substituted = self
                .substitute_soft_versions(&mut current, &dest, &properties)
                .await?;

            if current != dest {
                tokio::fs::copy(&current, &dest).await?;
            }

            tracing::info!(
                "{}: {} injected, {} substituted",
                dest.display(),
                injected,
                substituted
            );

            self.rewrite_ancestors(&dest, &properties, visited).await?;

            if let Some(marker) = in_place_marker {
                tokio::fs::copy(&dest, &marker).await?;
            }

            Ok(RewriteSummary {
                injected,
                substituted,
            })
        }
        .boxed()
    }

    /// Property table of the effective descriptor, falling back to the raw POM.
    async fn property_table(&self, source: &Path) -> Result<PropertyTable> {
        let effective = match self.deriver.effective_descriptor(source).await {
            Ok(xml) => parse_pom(&xml).map_err(RewriteError::from),
            Err(e) => Err(e),
        };

        let doc = match effective {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(
                    "no effective descriptor for {} ({}), using the raw POM",
                    source.display(),
                    e
                );
                parse_pom(&tokio::fs::read_to_string(source).await?)?
            }
        };
        Ok(PropertyTable::from_document(&doc))
    }

    /// Appends used-but-undeclared dependencies to `dest` until analysis
    /// reports nothing new or the round limit is reached.
    async fn inject_missing(&self, current: &mut PathBuf, dest: &Path) -> Result<usize> {
        let mut total = 0;
        let mut rounds = 0;

        while rounds < self.injection_rounds {
            rounds += 1;

            let missing = match self.analyzer.missing_dependencies(current).await {
                Ok(missing) => missing,
                Err(e) => {
                    tracing::warn!("dependency analysis of {} failed: {}", current.display(), e);
                    break;
                }
            };

            let content = tokio::fs::read_to_string(&*current).await?;
            let doc = parse_pom(&content)?;
            let new = undeclared(&doc, missing);
            if new.is_empty() {
                break;
            }

            let close = doc
                .dependencies_close
                .ok_or_else(|| RewriteError::MissingDependencies {
                    path: current.clone(),
                })?;
            for dep in &new {
                tracing::info!(
                    "injecting {}:{}",
                    dep.name(),
                    dep.version.as_deref().unwrap_or("")
                );
            }

            tokio::fs::write(dest, edit::insert_dependencies(&content, close, &new)).await?;
            *current = dest.to_path_buf();
            total += new.len();
        }

        tracing::info!(
            "ran {} rounds of dependency injection (limit={})",
            rounds,
            self.injection_rounds
        );
        Ok(total)
    }

    /// Replaces soft versions with the ranges built from their compatibility sets.
    async fn substitute_soft_versions(
        &self,
        current: &mut PathBuf,
        dest: &Path,
        properties: &PropertyTable,
    ) -> Result<usize> {
        let content = tokio::fs::read_to_string(&*current).await?;
        let doc = parse_pom(&content)?;

        let mut edits = Vec::new();
        let mut substituted = 0;
        for (dep, resolved) in soft_dependencies(&doc, properties) {
            let range = match self.compatible_range(dep, &resolved).await {
                Ok(Some(range)) => range,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("leaving {}:{} untouched: {}", dep.name(), resolved, e);
                    continue;
                }
            };

            let old = dep.version.as_deref().unwrap_or_default();
            let before = edits.len();
            edits.extend(
                doc.dependencies
                    .iter()
                    .filter(|d| d.same_declaration(dep) && d.scope.is_rewritable())
                    .filter_map(|d| d.version_span.clone())
                    .map(|span| Edit {
                        span,
                        text: edit::replaced_version(&range, old),
                    }),
            );
            if edits.len() > before {
                tracing::info!("replaced {}:{} with {}:{}", dep.name(), old, dep.name(), range);
                substituted += 1;
            }
        }

        if !edits.is_empty() {
            tokio::fs::write(dest, edit::apply(&content, edits)).await?;
            *current = dest.to_path_buf();
        }
        Ok(substituted)
    }

    /// `None` when no compatibility set is known or no range can be built.
    async fn compatible_range(&self, dep: &PomDependency, version: &str) -> Result<Option<String>> {
        let gav = Gav::new(dep.group_id.as_str(), dep.artifact_id.as_str(), version);
        let compatible = match self.service.compatible_versions(&gav).await? {
            Some(versions) if !versions.is_empty() => versions,
            _ => {
                tracing::debug!("no compatible versions known for {}", gav);
                return Ok(None);
            }
        };

        let available = self
            .versions
            .available_versions(&gav.group_id, &gav.artifact_id)
            .await?;
        let range = clean_range(&self.converter.to_range(&available, &compatible).await?);
        Ok((!range.is_empty()).then_some(range))
    }

    /// Rewrites the imported POMs, then the parent, in place in the local repository.
    async fn rewrite_ancestors(
        &self,
        pom: &Path,
        properties: &PropertyTable,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        let doc = parse_pom(&tokio::fs::read_to_string(pom).await?)?;
        let mut targets = doc.import_gavs(properties);
        let parent = doc.parent_gav(properties);
        tracing::info!(
            "found parent={}, and {} imported POMs",
            parent.as_ref().map_or_else(|| "none".to_string(), Gav::to_string),
            targets.len()
        );
        targets.extend(parent);

        for gav in targets {
            if let Err(e) = self.rewrite_library(&gav, visited).await {
                tracing::warn!("failed to rewrite POM of {}: {}", gav, e);
            }
        }
        Ok(())
    }

    async fn rewrite_library(&self, gav: &Gav, visited: &mut HashSet<PathBuf>) -> Result<()> {
        let pom = gav.pom_path(&self.repo_root);
        let backup = gav.backup_path(&self.repo_root);
        let marker = gav.marker_path(&self.repo_root);

        if !self.override_existing && marker.is_file() {
            tracing::info!("skipping already rewritten {}", marker.display());
            return Ok(());
        }
        if !pom.is_file() {
            tracing::info!("could not rewrite POM of {}, {} does not exist", gav, pom.display());
            return Ok(());
        }
        // Reached again through another branch of the same graph.
        if visited.contains(&pom_identity(&pom).await) {
            tracing::debug!("{} already rewritten in this run", pom.display());
            return Ok(());
        }

        if backup.is_file() {
            if self.override_existing {
                tokio::fs::copy(&backup, &pom).await?;
            }
        } else {
            tokio::fs::copy(&pom, &backup).await?;
        }

        let summary = self.rewrite(pom.clone(), pom.clone(), false, visited).await?;
        tokio::fs::copy(&pom, &marker).await?;
        tracing::info!(
            "made {} injections and {} substitutions in imported POM {}",
            summary.injected,
            summary.substituted,
            gav
        );
        Ok(())
    }
}

async fn pom_identity(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Marker written next to a POM rewritten in place by a top-level call.
fn completion_marker(pom: &Path) -> PathBuf {
    let name = pom
        .file_name()
        .map_or_else(|| "pom.xml".to_string(), |n| n.to_string_lossy().into_owned());
    pom.with_file_name(format!("static_recursive_{name}"))
}

/// Missing entries not yet declared at the top level, first occurrence of each kept.
fn undeclared(doc: &PomDocument, missing: Vec<PomDependency>) -> Vec<PomDependency> {
    let mut seen: HashSet<String> = doc.declared().map(PomDependency::name).collect();
    missing
        .into_iter()
        .filter(|dep| seen.insert(dep.name()))
        .collect()
}

/// Rewritable dependencies whose resolved version is soft, one per distinct
/// (group, artifact, raw version), paired with the resolved version.
fn soft_dependencies<'d>(
    doc: &'d PomDocument,
    properties: &PropertyTable,
) -> Vec<(&'d PomDependency, String)> {
    let mut found: Vec<(&PomDependency, String)> = Vec::new();
    for dep in &doc.dependencies {
        if !dep.scope.is_rewritable() || is_denylisted(&dep.group_id, &dep.artifact_id) {
            continue;
        }
        let Some(raw) = dep.version.as_deref() else {
            continue;
        };
        let resolved = if marco_core::version::is_property_ref(raw) {
            match properties.lookup(raw) {
                Some(value) => value.to_string(),
                None => continue,
            }
        } else {
            raw.to_string()
        };
        if resolved.is_empty() || !is_soft(&resolved) {
            continue;
        }
        if found.iter().any(|(seen, _)| seen.same_declaration(dep)) {
            continue;
        }
        found.push((dep, resolved));
    }
    found
}
