//! Published-version lookup for Maven artifacts.
//!
//! [`MavenRepository`] reads `maven-metadata.xml` from a remote repository
//! and falls back to scraping the artifact's directory listing when the
//! metadata is missing or stale. [`LocalRepository`] lists the version
//! directories of a local repository instead.

use crate::error::{MarcoError, Result};
use crate::gav::Gav;
use crate::version::sort_newest_first;
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";

// Directory entries of a repository listing: <a href="2.16.0/">2.16.0/</a>
static LISTING_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"/?#:]+)/""#).expect("Invalid regex"));

/// Ordered (newest-first) version list for a coordinate.
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// All published versions, newest first.
    async fn available_versions(&self, group_id: &str, artifact_id: &str) -> Result<Vec<String>>;

    /// Versions obtained without relying on repository metadata.
    ///
    /// Defaults to [`VersionSource::available_versions`].
    async fn scraped_versions(&self, group_id: &str, artifact_id: &str) -> Result<Vec<String>> {
        self.available_versions(group_id, artifact_id).await
    }
}

/// Version list that is guaranteed to contain `gav.version`.
///
/// Metadata that does not list the base version is stale; the listing is
/// scraped once before giving up.
pub async fn versions_including(source: &dyn VersionSource, gav: &Gav) -> Result<Vec<String>> {
    let versions = match source
        .available_versions(&gav.group_id, &gav.artifact_id)
        .await
    {
        Ok(versions) if versions.contains(&gav.version) => return Ok(versions),
        Ok(_) => {
            tracing::info!("metadata for {} does not list {}, scraping", gav.name(), gav.version);
            source.scraped_versions(&gav.group_id, &gav.artifact_id).await?
        }
        Err(e) => {
            tracing::warn!("metadata lookup failed for {}: {}", gav.name(), e);
            source.scraped_versions(&gav.group_id, &gav.artifact_id).await?
        }
    };

    if versions.contains(&gav.version) {
        Ok(versions)
    } else {
        Err(MarcoError::MetadataNotFound {
            package: gav.name(),
            version: gav.version.clone(),
        })
    }
}

/// Remote Maven repository client.
#[derive(Clone)]
pub struct MavenRepository {
    client: reqwest::Client,
    base_url: String,
}

impl MavenRepository {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn central() -> Self {
        Self::new(MAVEN_CENTRAL)
    }

    fn artifact_url(&self, group_id: &str, artifact_id: &str) -> String {
        let group_path = group_id
            .split('.')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/{}/{}",
            self.base_url,
            group_path,
            urlencoding::encode(artifact_id)
        )
    }

    async fn fetch(&self, url: &str, package: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MarcoError::RegistryError {
                package: package.to_string(),
                source: Box::new(e),
            })?;

        if !response.status().is_success() {
            return Err(MarcoError::RegistryError {
                package: package.to_string(),
                source: format!("GET {url} returned {}", response.status()).into(),
            });
        }

        response.text().await.map_err(|e| MarcoError::RegistryError {
            package: package.to_string(),
            source: Box::new(e),
        })
    }
}

#[async_trait]
impl VersionSource for MavenRepository {
    async fn available_versions(&self, group_id: &str, artifact_id: &str) -> Result<Vec<String>> {
        let package = format!("{group_id}:{artifact_id}");
        let url = format!(
            "{}/maven-metadata.xml",
            self.artifact_url(group_id, artifact_id)
        );
        tracing::debug!("fetching {}", url);

        let body = self.fetch(&url, &package).await?;
        let mut versions = parse_metadata_versions(&body)?;
        sort_newest_first(&mut versions);
        Ok(versions)
    }

    async fn scraped_versions(&self, group_id: &str, artifact_id: &str) -> Result<Vec<String>> {
        let package = format!("{group_id}:{artifact_id}");
        let url = format!("{}/", self.artifact_url(group_id, artifact_id));
        tracing::debug!("scraping {}", url);

        let body = self.fetch(&url, &package).await?;
        let mut versions = parse_directory_listing(&body);
        sort_newest_first(&mut versions);
        Ok(versions)
    }
}

/// Local repository (`~/.m2/repository` layout).
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl VersionSource for LocalRepository {
    async fn available_versions(&self, group_id: &str, artifact_id: &str) -> Result<Vec<String>> {
        let mut dir = self.root.clone();
        dir.extend(group_id.split('.'));
        dir.push(artifact_id);

        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with('.') {
                versions.push(name);
            }
        }

        sort_newest_first(&mut versions);
        Ok(versions)
    }
}

/// Extracts `<versioning><versions><version>` entries.
pub fn parse_metadata_versions(content: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut versions = Vec::new();

    loop {
        match reader
            .read_event()
            .map_err(|e| MarcoError::xml("maven-metadata.xml", e))?
        {
            Event::Start(ref e) => {
                stack.push(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(ref e) => {
                let in_versions = stack.len() >= 2
                    && stack[stack.len() - 1] == "version"
                    && stack[stack.len() - 2] == "versions";
                if in_versions {
                    let text = e
                        .decode()
                        .map(|cow| cow.trim().to_string())
                        .unwrap_or_else(|_| String::from_utf8_lossy(e.as_ref()).trim().to_string());
                    if !text.is_empty() {
                        versions.push(text);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(versions)
}

/// Extracts version directories from an HTML repository listing.
pub fn parse_directory_listing(html: &str) -> Vec<String> {
    LISTING_ENTRY
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| !name.starts_with('.'))
        .collect()
}
