//! Maven coordinates and their local-repository layout.

use crate::error::{MarcoError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// A `groupId:artifactId:version` coordinate.
///
/// `typ` and `scope` are only populated for `dependencyManagement` import
/// entries and take part in equality only there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gav {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub typ: Option<String>,
    pub scope: Option<String>,
}

impl Gav {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            typ: None,
            scope: None,
        }
    }

    /// Builds an import entry (`<type>pom</type><scope>import</scope>`).
    pub fn import(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            typ: Some("pom".into()),
            scope: Some("import".into()),
            ..Self::new(group_id, artifact_id, version)
        }
    }

    /// "{groupId}:{artifactId}"
    pub fn name(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// Directory of this release inside a local repository:
    /// `root/group/path/artifact/version`.
    pub fn repository_dir(&self, root: &Path) -> PathBuf {
        let mut dir = root.to_path_buf();
        dir.extend(self.group_id.split('.'));
        dir.push(&self.artifact_id);
        dir.push(&self.version);
        dir
    }

    /// `artifact-version.pom`
    pub fn pom_file_name(&self) -> String {
        format!("{}-{}.pom", self.artifact_id, self.version)
    }

    pub fn pom_path(&self, root: &Path) -> PathBuf {
        self.repository_dir(root).join(self.pom_file_name())
    }

    /// Pristine copy taken before the descriptor is first rewritten.
    pub fn backup_path(&self, root: &Path) -> PathBuf {
        self.repository_dir(root)
            .join(format!("original_{}", self.pom_file_name()))
    }

    /// Written once the descriptor's rewrite subtree has completed.
    pub fn marker_path(&self, root: &Path) -> PathBuf {
        self.repository_dir(root)
            .join(format!("static_recursive_{}", self.pom_file_name()))
    }
}

impl fmt::Display for Gav {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

impl std::str::FromStr for Gav {
    type Err = MarcoError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [g, a, v] if !g.is_empty() && !a.is_empty() && !v.is_empty() => Ok(Self::new(*g, *a, *v)),
            _ => Err(MarcoError::InvalidCoordinates {
                coordinates: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MavenScope {
    #[default]
    Compile,
    Test,
    Runtime,
    Provided,
    System,
    Import,
}

impl MavenScope {
    /// Only compile and runtime dependencies are loosened or injected.
    pub fn is_rewritable(self) -> bool {
        matches!(self, Self::Compile | Self::Runtime)
    }

    /// Absent scope means compile.
    pub fn parse_or_default(scope: Option<&str>) -> Self {
        scope
            .map(|s| s.parse::<Self>().unwrap_or_default())
            .unwrap_or_default()
    }
}

impl std::str::FromStr for MavenScope {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "test" => Self::Test,
            "runtime" => Self::Runtime,
            "provided" => Self::Provided,
            "system" => Self::System,
            "import" => Self::Import,
            _ => Self::Compile,
        })
    }
}
