//! End-to-end rewriting over a temporary project and local repository.

use async_trait::async_trait;
use marco_client::{
    BuildAnalyzer, CompatibilityService, DescriptorDeriver, PomRewriter, RangeConverter,
    RewriteError, RewriteSummary,
};
use marco_core::{Gav, PomDependency, VersionSource, compare_versions, parse_pom};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct FakeService {
    sets: HashMap<String, Vec<String>>,
}

impl FakeService {
    fn with(entries: &[(&str, &[&str])]) -> Self {
        Self {
            sets: entries
                .iter()
                .map(|(gav, versions)| {
                    (
                        (*gav).to_string(),
                        versions.iter().map(|v| (*v).to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl CompatibilityService for FakeService {
    async fn compatible_versions(&self, gav: &Gav) -> marco_client::Result<Option<Vec<String>>> {
        Ok(self.sets.get(&gav.to_string()).cloned())
    }
}

struct FakeVersions;

#[async_trait]
impl VersionSource for FakeVersions {
    async fn available_versions(&self, _g: &str, _a: &str) -> marco_core::Result<Vec<String>> {
        Ok(["1.3.0", "1.2.4", "1.2.3", "1.2.0"]
            .iter()
            .map(|v| (*v).to_string())
            .collect())
    }
}

/// Covers the compatible versions with a single `[lowest,highest]` range.
struct SpanConverter;

#[async_trait]
impl RangeConverter for SpanConverter {
    async fn to_range(
        &self,
        _available: &[String],
        compatible: &[String],
    ) -> marco_client::Result<String> {
        let mut sorted = compatible.to_vec();
        sorted.sort_by(|a, b| compare_versions(a, b));
        match (sorted.first(), sorted.last()) {
            (Some(low), Some(high)) => Ok(format!("[{low},{high}]\n")),
            _ => Ok(String::new()),
        }
    }
}

/// Hands out one scripted report per call, then nothing.
#[derive(Default)]
struct ScriptedAnalyzer {
    rounds: Mutex<VecDeque<Vec<PomDependency>>>,
    calls: Mutex<Vec<PathBuf>>,
}

impl ScriptedAnalyzer {
    fn with(rounds: Vec<Vec<PomDependency>>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
            calls: Mutex::default(),
        }
    }

    fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildAnalyzer for ScriptedAnalyzer {
    async fn missing_dependencies(&self, pom: &Path) -> marco_client::Result<Vec<PomDependency>> {
        self.calls.lock().unwrap().push(pom.to_path_buf());
        Ok(self.rounds.lock().unwrap().pop_front().unwrap_or_default())
    }
}

/// Never produces a descriptor, so the raw POM supplies the properties.
#[derive(Default)]
struct NoEffectivePom {
    calls: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl DescriptorDeriver for NoEffectivePom {
    async fn effective_descriptor(&self, pom: &Path) -> marco_client::Result<String> {
        self.calls.lock().unwrap().push(pom.to_path_buf());
        Err(RewriteError::BuildTool {
            command: "mvn help:effective-pom".into(),
            message: "not available in tests".into(),
        })
    }
}

struct Fixture {
    dir: TempDir,
    analyzer: Arc<ScriptedAnalyzer>,
    deriver: Arc<NoEffectivePom>,
}

impl Fixture {
    fn new(analyzer: ScriptedAnalyzer) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("project")).unwrap();
        std::fs::create_dir_all(dir.path().join("m2")).unwrap();
        Self {
            dir,
            analyzer: Arc::new(analyzer),
            deriver: Arc::new(NoEffectivePom::default()),
        }
    }

    fn source(&self) -> PathBuf {
        self.dir.path().join("project").join("pom.xml")
    }

    fn dest(&self) -> PathBuf {
        self.dir.path().join("project").join("pom.marco.xml")
    }

    fn repo(&self) -> PathBuf {
        self.dir.path().join("m2")
    }

    fn write_project(&self, xml: &str) {
        std::fs::write(self.source(), xml).unwrap();
    }

    fn write_library(&self, gav: &Gav, xml: &str) -> PathBuf {
        let path = gav.pom_path(&self.repo());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, xml).unwrap();
        path
    }

    fn rewriter(&self) -> PomRewriter {
        PomRewriter::new(
            Arc::new(FakeService::with(&[
                ("org.example:lib:1.2.3", &["1.2.3", "1.2.4", "1.3.0"]),
                ("junit:junit:4.13.2", &["4.13.1", "4.13.2"]),
                ("org.codehaus.plexus:plexus-utils:3.5.1", &["3.5.0", "3.5.1"]),
                ("org.example:unknown:1.0", &[]),
            ])),
            Arc::new(FakeVersions),
            Arc::new(SpanConverter),
            self.analyzer.clone(),
            self.deriver.clone(),
            self.repo(),
        )
    }

    async fn run(&self) -> marco_client::Result<RewriteSummary> {
        self.rewriter()
            .expand_and_rewrite(&self.source(), &self.dest())
            .await
    }
}

fn deps(entries: &str) -> Vec<PomDependency> {
    parse_pom(&format!("<dependencies>{entries}</dependencies>"))
        .unwrap()
        .dependencies
}

const PROJECT: &str = r"<?xml version='1.0' encoding='UTF-8'?>
<project>
  <groupId>marco.demo</groupId>
  <artifactId>project</artifactId>
  <version>1.0</version>
  <dependencies>
    <!-- kept verbatim -->
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>lib</artifactId>
      <version>1.2.3</version>
    </dependency>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13.2</version>
      <scope>test</scope>
    </dependency>
    <dependency>
      <groupId>org.codehaus.plexus</groupId>
      <artifactId>plexus-utils</artifactId>
      <version>3.5.1</version>
    </dependency>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>unknown</artifactId>
      <version>1.0</version>
    </dependency>
  </dependencies>
</project>
";

#[tokio::test]
async fn test_soft_version_becomes_compatible_range() {
    let fx = Fixture::new(ScriptedAnalyzer::default());
    fx.write_project(PROJECT);

    let summary = fx.run().await.unwrap();
    assert_eq!(
        summary,
        RewriteSummary {
            injected: 0,
            substituted: 1
        }
    );

    let out = std::fs::read_to_string(fx.dest()).unwrap();
    assert!(out.contains(r#"<version replaced_value="1.2.3">[1.2.3,1.3.0]</version>"#));
    // Test scope, denylisted and empty sets stay pinned.
    assert!(out.contains("<version>4.13.2</version>"));
    assert!(out.contains("<version>3.5.1</version>"));
    assert!(out.contains("<version>1.0</version>"));
    assert!(out.contains("<!-- kept verbatim -->"));
    // The source is never modified.
    assert_eq!(std::fs::read_to_string(fx.source()).unwrap(), PROJECT);
}

#[tokio::test]
async fn test_existing_destination_is_not_rewritten() {
    let fx = Fixture::new(ScriptedAnalyzer::default());
    fx.write_project(PROJECT);
    fx.run().await.unwrap();
    let first = std::fs::read_to_string(fx.dest()).unwrap();

    let summary = fx.run().await.unwrap();
    assert_eq!(summary, RewriteSummary::default());
    assert_eq!(std::fs::read_to_string(fx.dest()).unwrap(), first);
}

#[tokio::test]
async fn test_override_redoes_destination() {
    let fx = Fixture::new(ScriptedAnalyzer::default());
    fx.write_project(PROJECT);
    fx.run().await.unwrap();

    let summary = fx
        .rewriter()
        .with_override(true)
        .expand_and_rewrite(&fx.source(), &fx.dest())
        .await
        .unwrap();
    assert_eq!(summary.substituted, 1);
}

#[tokio::test]
async fn test_property_version_is_replaced_inline() {
    let fx = Fixture::new(ScriptedAnalyzer::default());
    fx.write_project(
        r"<project>
  <properties>
    <lib.version>1.2.3</lib.version>
  </properties>
  <dependencies>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>lib</artifactId>
      <version>${lib.version}</version>
    </dependency>
  </dependencies>
</project>",
    );

    assert_eq!(fx.run().await.unwrap().substituted, 1);
    let out = std::fs::read_to_string(fx.dest()).unwrap();
    assert!(out.contains(r#"<version replaced_value="${lib.version}">[1.2.3,1.3.0]</version>"#));
    assert!(out.contains("<lib.version>1.2.3</lib.version>"));
}

#[tokio::test]
async fn test_injection_converges() {
    let slf4j = "<dependency><groupId>org.slf4j</groupId><artifactId>slf4j-api</artifactId><version>2.0.9</version></dependency>";
    let lang3 = "<dependency><groupId>org.apache.commons</groupId><artifactId>commons-lang3</artifactId><version>3.14.0</version><scope>runtime</scope></dependency>";
    let fx = Fixture::new(ScriptedAnalyzer::with(vec![
        deps(slf4j),
        deps(&format!("{slf4j}{lang3}")),
        deps(&format!("{lang3}{slf4j}")),
        deps("<dependency><groupId>never</groupId><artifactId>reached</artifactId><version>1</version></dependency>"),
    ]));
    fx.write_project(PROJECT);

    let summary = fx.run().await.unwrap();
    assert_eq!(summary.injected, 2);
    assert_eq!(summary.substituted, 1);

    // The first round analyzes the source, later rounds the destination.
    let calls = fx.analyzer.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].ends_with("pom.xml"));
    assert!(calls[1].ends_with("pom.marco.xml"));

    let out = std::fs::read_to_string(fx.dest()).unwrap();
    assert!(out.contains(r#"<version inserted="true">2.0.9</version>"#));
    assert!(out.contains("<scope>runtime</scope>"));
    assert!(!out.contains("never"));

    let names: Vec<String> = parse_pom(&out).unwrap().declared().map(PomDependency::name).collect();
    assert_eq!(names.len(), 6);
}

#[tokio::test]
async fn test_injection_round_limit() {
    let rounds = (0..10)
        .map(|i| {
            deps(&format!(
                "<dependency><groupId>g</groupId><artifactId>a{i}</artifactId><version>1</version></dependency>"
            ))
        })
        .collect();
    let fx = Fixture::new(ScriptedAnalyzer::with(rounds));
    fx.write_project(PROJECT);

    let summary = fx
        .rewriter()
        .with_injection_rounds(2)
        .expand_and_rewrite(&fx.source(), &fx.dest())
        .await
        .unwrap();
    assert_eq!(summary.injected, 2);
    assert_eq!(fx.analyzer.calls().len(), 2);
}

#[tokio::test]
async fn test_injection_without_dependencies_element_fails() {
    let fx = Fixture::new(ScriptedAnalyzer::with(vec![deps(
        "<dependency><groupId>g</groupId><artifactId>a</artifactId><version>1</version></dependency>",
    )]));
    fx.write_project("<project><artifactId>bare</artifactId></project>");

    let err = fx.run().await.unwrap_err();
    assert!(matches!(err, RewriteError::MissingDependencies { .. }));
}

#[tokio::test]
async fn test_destination_in_other_directory_is_rejected() {
    let fx = Fixture::new(ScriptedAnalyzer::default());
    fx.write_project(PROJECT);

    let err = fx
        .rewriter()
        .expand_and_rewrite(&fx.source(), &fx.dir.path().join("elsewhere.xml"))
        .await
        .unwrap_err();
    assert!(matches!(err, RewriteError::Layout(_)));
}

#[tokio::test]
async fn test_parent_is_rewritten_in_place_with_backup_and_marker() {
    let fx = Fixture::new(ScriptedAnalyzer::default());
    let parent = Gav::new("marco.demo", "parent", "1.0");
    let parent_pom = r"<project>
  <groupId>marco.demo</groupId>
  <artifactId>parent</artifactId>
  <version>1.0</version>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>org.example</groupId>
        <artifactId>lib</artifactId>
        <version>1.2.3</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>
";
    let parent_path = fx.write_library(&parent, parent_pom);
    fx.write_project(
        r"<project>
  <parent>
    <groupId>marco.demo</groupId>
    <artifactId>parent</artifactId>
    <version>${parent.version}</version>
  </parent>
  <properties>
    <parent.version>1.0</parent.version>
  </properties>
  <artifactId>child</artifactId>
  <dependencies/>
</project>",
    );

    let summary = fx.run().await.unwrap();
    // Library counts are not part of the top-level summary.
    assert_eq!(summary, RewriteSummary::default());

    let rewritten = std::fs::read_to_string(&parent_path).unwrap();
    assert!(rewritten.contains(r#"replaced_value="1.2.3""#));
    assert_eq!(
        std::fs::read_to_string(parent.backup_path(&fx.repo())).unwrap(),
        parent_pom
    );
    assert_eq!(
        std::fs::read_to_string(parent.marker_path(&fx.repo())).unwrap(),
        rewritten
    );
}

#[tokio::test]
async fn test_override_restores_library_from_backup() {
    let fx = Fixture::new(ScriptedAnalyzer::default());
    let parent = Gav::new("marco.demo", "parent", "1.0");
    let parent_path = fx.write_library(
        &parent,
        r"<project>
  <dependencies>
    <dependency><groupId>org.example</groupId><artifactId>lib</artifactId><version>1.2.3</version></dependency>
  </dependencies>
</project>",
    );
    let project = r"<project>
  <parent><groupId>marco.demo</groupId><artifactId>parent</artifactId><version>1.0</version></parent>
  <dependencies/>
</project>";
    fx.write_project(project);

    fx.run().await.unwrap();
    let once = std::fs::read_to_string(&parent_path).unwrap();

    // Without override the marker short-circuits the library.
    std::fs::remove_file(fx.dest()).unwrap();
    fx.run().await.unwrap();
    assert_eq!(std::fs::read_to_string(&parent_path).unwrap(), once);

    // With override the pristine backup is rewritten again, not the rewritten copy.
    fx.rewriter()
        .with_override(true)
        .expand_and_rewrite(&fx.source(), &fx.dest())
        .await
        .unwrap();
    let twice = std::fs::read_to_string(&parent_path).unwrap();
    assert_eq!(twice, once);
    assert_eq!(twice.matches("replaced_value").count(), 1);
}

#[tokio::test]
async fn test_missing_parent_descriptor_is_skipped() {
    let fx = Fixture::new(ScriptedAnalyzer::default());
    fx.write_project(
        r"<project>
  <parent><groupId>org.absent</groupId><artifactId>parent</artifactId><version>9</version></parent>
  <dependencies/>
</project>",
    );

    assert!(fx.run().await.is_ok());
    assert!(!Gav::new("org.absent", "parent", "9").backup_path(&fx.repo()).exists());
}

#[tokio::test]
async fn test_cyclic_parent_and_import_graph_terminates() {
    let fx = Fixture::new(ScriptedAnalyzer::default());
    let a = Gav::new("org.cycle", "a", "1.0");
    let b = Gav::new("org.cycle", "b", "1.0");
    let a_path = fx.write_library(
        &a,
        r"<project>
  <parent><groupId>org.cycle</groupId><artifactId>b</artifactId><version>1.0</version></parent>
  <artifactId>a</artifactId>
</project>",
    );
    let b_path = fx.write_library(
        &b,
        r"<project>
  <groupId>org.cycle</groupId>
  <artifactId>b</artifactId>
  <version>1.0</version>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>org.cycle</groupId>
        <artifactId>a</artifactId>
        <version>1.0</version>
        <type>pom</type>
        <scope>import</scope>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>",
    );
    fx.write_project(
        r"<project>
  <parent><groupId>org.cycle</groupId><artifactId>a</artifactId><version>1.0</version></parent>
  <dependencies/>
</project>",
    );

    fx.run().await.unwrap();

    // Each descriptor was processed exactly once.
    let calls = fx.deriver.calls.lock().unwrap().clone();
    let count = |path: &Path| calls.iter().filter(|c| c.as_path() == path).count();
    assert_eq!(calls.len(), 3);
    assert_eq!(count(&fx.source()), 1);
    assert_eq!(count(&a_path), 1);
    assert_eq!(count(&b_path), 1);
    assert!(a.marker_path(&fx.repo()).exists());
    assert!(b.marker_path(&fx.repo()).exists());
}

#[tokio::test]
async fn test_override_keeps_shared_parent_rewritten() {
    let fx = Fixture::new(ScriptedAnalyzer::default());
    let shared = Gav::new("marco.demo", "shared-parent", "1.0");
    let shared_path = fx.write_library(
        &shared,
        r"<project>
  <groupId>marco.demo</groupId>
  <artifactId>shared-parent</artifactId>
  <version>1.0</version>
  <dependencies>
    <dependency><groupId>org.example</groupId><artifactId>lib</artifactId><version>1.2.3</version></dependency>
  </dependencies>
</project>",
    );
    for name in ["bom-x", "bom-y"] {
        fx.write_library(
            &Gav::new("marco.demo", name, "1.0"),
            r"<project>
  <parent><groupId>marco.demo</groupId><artifactId>shared-parent</artifactId><version>1.0</version></parent>
</project>",
        );
    }
    fx.write_project(
        r"<project>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>marco.demo</groupId><artifactId>bom-x</artifactId><version>1.0</version>
        <type>pom</type><scope>import</scope>
      </dependency>
      <dependency>
        <groupId>marco.demo</groupId><artifactId>bom-y</artifactId><version>1.0</version>
        <type>pom</type><scope>import</scope>
      </dependency>
    </dependencies>
  </dependencyManagement>
  <dependencies/>
</project>",
    );

    fx.run().await.unwrap();
    assert!(std::fs::read_to_string(&shared_path).unwrap().contains(r#"replaced_value="1.2.3""#));

    fx.rewriter()
        .with_override(true)
        .expand_and_rewrite(&fx.source(), &fx.dest())
        .await
        .unwrap();

    // The second import reaches the parent again without restoring its backup.
    let rewritten = std::fs::read_to_string(&shared_path).unwrap();
    assert!(rewritten.contains(r#"replaced_value="1.2.3""#));
    assert_eq!(
        std::fs::read_to_string(shared.marker_path(&fx.repo())).unwrap(),
        rewritten
    );
}

#[tokio::test]
async fn test_in_place_rewrite_is_not_repeated() {
    let fx = Fixture::new(ScriptedAnalyzer::default());
    fx.write_project(
        r"<project>
  <dependencies>
    <dependency><groupId>org.example</groupId><artifactId>lib</artifactId><version>1.2.3</version></dependency>
  </dependencies>
</project>",
    );

    let first = fx
        .rewriter()
        .expand_and_rewrite(&fx.source(), &fx.source())
        .await
        .unwrap();
    assert_eq!(first.substituted, 1);
    let rewritten = std::fs::read_to_string(fx.source()).unwrap();
    let marker = fx.dir.path().join("project").join("static_recursive_pom.xml");
    assert_eq!(std::fs::read_to_string(&marker).unwrap(), rewritten);

    let second = fx
        .rewriter()
        .expand_and_rewrite(&fx.source(), &fx.source())
        .await
        .unwrap();
    assert_eq!(second, RewriteSummary::default());
    assert_eq!(std::fs::read_to_string(fx.source()).unwrap(), rewritten);
    assert_eq!(fx.deriver.calls.lock().unwrap().len(), 1);
}
