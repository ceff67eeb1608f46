//! Maven-backed analyzer and descriptor deriver.

use crate::analysis::{BuildAnalyzer, parse_missing};
use crate::effective::{DescriptorDeriver, EFFECTIVE_POM_FILE};
use crate::error::{Result, RewriteError};
use async_trait::async_trait;
use marco_core::PomDependency;
use marco_core::pom::extract_xml;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command;

/// Runs the `mvn` executable from the directory of the POM it works on.
#[derive(Debug, Clone)]
pub struct MavenInvoker {
    executable: String,
}

impl MavenInvoker {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    async fn run(&self, pom: &Path, args: Vec<OsString>) -> Result<Output> {
        let command_line = format!(
            "{} {}",
            self.executable,
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        let mut command = Command::new(&self.executable);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = pom.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }

        tracing::debug!("running {}", command_line);
        command.output().await.map_err(|e| RewriteError::BuildTool {
            command: command_line,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl BuildAnalyzer for MavenInvoker {
    async fn missing_dependencies(&self, pom: &Path) -> Result<Vec<PomDependency>> {
        let args = vec![
            "dependency:analyze-only".into(),
            "-DoutputXML".into(),
            "-f".into(),
            pom.as_os_str().to_owned(),
        ];
        let output = self.run(pom, args).await?;
        if !output.status.success() {
            tracing::warn!(
                "dependency analysis of {} exited with {}",
                pom.display(),
                output.status
            );
        }
        parse_missing(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl DescriptorDeriver for MavenInvoker {
    async fn effective_descriptor(&self, pom: &Path) -> Result<String> {
        let target = pom
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(EFFECTIVE_POM_FILE);

        // Rewrites never touch properties or parents, so a cached descriptor stays valid.
        if tokio::fs::try_exists(&target).await? {
            tracing::debug!("reusing {}", target.display());
            return Ok(tokio::fs::read_to_string(&target).await?);
        }

        let mut output_arg = OsString::from("-Doutput=");
        output_arg.push(target.as_os_str());
        let args = vec![
            "help:effective-pom".into(),
            "-N".into(),
            "-f".into(),
            pom.as_os_str().to_owned(),
            output_arg,
        ];
        let output = self.run(pom, args).await?;
        if !output.status.success() {
            return Err(RewriteError::BuildTool {
                command: format!("{} help:effective-pom", self.executable),
                message: format!("exited with {}", output.status),
            });
        }

        let raw = tokio::fs::read_to_string(&target).await?;
        let xml = extract_xml(&raw).to_string();
        tokio::fs::write(&target, &xml).await?;
        Ok(xml)
    }
}
