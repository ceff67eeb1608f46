//! Compatibility oracles.
//!
//! An oracle answers two questions about a candidate version relative to a
//! base version: is it statically compatible (API surface), and is it
//! dynamically compatible (the base's clients still build and pass their
//! tests against it). The search never decides compatibility itself.

use async_trait::async_trait;
use marco_core::Gav;
use marco_core::config::OracleConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Reason attached to an incompatible or skipped candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureTag {
    NoGithub,
    NoTag,
    CandCompileTimeout,
    CandTestTimeout,
    Timeout,
    NoPom,
    NoResolve,
    NoCompile,
    NoTest,
    /// Candidate artifact not published; the candidate was skipped.
    NoJar,
}

impl FailureTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoGithub => "NO_GITHUB",
            Self::NoTag => "NO_TAG",
            Self::CandCompileTimeout => "CAND_COMPILE_TIMEOUT",
            Self::CandTestTimeout => "CAND_TEST_TIMEOUT",
            Self::Timeout => "TIMEOUT",
            Self::NoPom => "NO_POM",
            Self::NoResolve => "NO_RESOLVE",
            Self::NoCompile => "NO_COMPILE",
            Self::NoTest => "NO_TEST",
            Self::NoJar => "NO_JAR",
        }
    }
}

impl fmt::Display for FailureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a dynamic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Compatible,
    Incompatible(Option<FailureTag>),
}

#[derive(Error, Debug)]
pub enum CheckError {
    /// The base artifact cannot be fetched; no comparison is possible.
    #[error("base artifact not found")]
    BaseArtifactMissing,

    /// The candidate artifact cannot be fetched; the candidate is skipped.
    #[error("candidate artifact not found")]
    CandidateArtifactMissing,

    /// The oracle itself could not run.
    #[error("'{command}': {message}")]
    Failed { command: String, message: String },
}

#[async_trait]
pub trait CompatibilityOracle: Send + Sync {
    /// Called once per search before any candidate is classified.
    async fn prepare(&self, _base: &Gav) -> Result<(), CheckError> {
        Ok(())
    }

    async fn statically_compatible(
        &self,
        base: &Gav,
        candidate: &str,
    ) -> Result<Verdict, CheckError>;

    async fn dynamically_compatible(
        &self,
        base: &Gav,
        candidate: &str,
    ) -> Result<Verdict, CheckError>;
}

/// Exit-code protocol of external check programs.
pub mod exit_code {
    pub const COMPATIBLE: i32 = 0;
    pub const INCOMPATIBLE: i32 = 1;
    pub const BASE_MISSING: i32 = 2;
    pub const CANDIDATE_MISSING: i32 = 3;
}

/// Tags reported by a dynamic check through exit codes 10..=17.
pub fn tag_for_exit_code(code: i32) -> Option<FailureTag> {
    match code {
        10 => Some(FailureTag::NoGithub),
        11 => Some(FailureTag::NoTag),
        12 => Some(FailureTag::CandCompileTimeout),
        13 => Some(FailureTag::CandTestTimeout),
        14 => Some(FailureTag::NoPom),
        15 => Some(FailureTag::NoResolve),
        16 => Some(FailureTag::NoCompile),
        17 => Some(FailureTag::NoTest),
        _ => None,
    }
}

/// Oracle backed by two external programs.
///
/// Each program is invoked as `<command...> <group> <artifact> <base> <candidate>`
/// and reports through its exit code (see [`exit_code`]).
#[derive(Debug, Clone)]
pub struct CommandOracle {
    static_command: Vec<String>,
    dynamic_command: Vec<String>,
    timeout: Duration,
}

enum RunOutcome {
    Exited(i32),
    TimedOut,
}

impl CommandOracle {
    pub fn new(static_command: Vec<String>, dynamic_command: Vec<String>, timeout: Duration) -> Self {
        Self {
            static_command,
            dynamic_command,
            timeout,
        }
    }

    pub fn from_config(config: &OracleConfig) -> Self {
        Self::new(
            config.static_command.clone(),
            config.dynamic_command.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn run(&self, command: &[String], base: &Gav, candidate: &str) -> Result<RunOutcome, CheckError> {
        let command_line = command.join(" ");
        let Some((program, args)) = command.split_first() else {
            return Err(CheckError::Failed {
                command: command_line,
                message: "empty command".into(),
            });
        };

        let child = Command::new(program)
            .args(args)
            .args([
                base.group_id.as_str(),
                base.artifact_id.as_str(),
                base.version.as_str(),
                candidate,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CheckError::Failed {
                command: command_line.clone(),
                message: format!("failed to spawn: {e}"),
            })?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                if !output.stderr.is_empty() {
                    tracing::debug!(
                        "{} stderr: {}",
                        command_line,
                        String::from_utf8_lossy(&output.stderr).trim_end()
                    );
                }
                output
                    .status
                    .code()
                    .map(RunOutcome::Exited)
                    .ok_or_else(|| CheckError::Failed {
                        command: command_line,
                        message: "terminated by signal".into(),
                    })
            }
            Ok(Err(e)) => Err(CheckError::Failed {
                command: command_line,
                message: format!("failed to wait: {e}"),
            }),
            Err(_) => {
                tracing::warn!(
                    "{} timed out after {}s for {} -> {}",
                    command_line,
                    self.timeout.as_secs(),
                    base,
                    candidate
                );
                Ok(RunOutcome::TimedOut)
            }
        }
    }
}

#[async_trait]
impl CompatibilityOracle for CommandOracle {
    async fn statically_compatible(
        &self,
        base: &Gav,
        candidate: &str,
    ) -> Result<Verdict, CheckError> {
        match self.run(&self.static_command, base, candidate).await? {
            RunOutcome::Exited(exit_code::COMPATIBLE) => Ok(Verdict::Compatible),
            RunOutcome::Exited(exit_code::INCOMPATIBLE) => Ok(Verdict::Incompatible(None)),
            RunOutcome::Exited(exit_code::BASE_MISSING) => Err(CheckError::BaseArtifactMissing),
            RunOutcome::Exited(exit_code::CANDIDATE_MISSING) => {
                Err(CheckError::CandidateArtifactMissing)
            }
            RunOutcome::Exited(code) => Ok(Verdict::Incompatible(tag_for_exit_code(code))),
            RunOutcome::TimedOut => Ok(Verdict::Incompatible(Some(FailureTag::Timeout))),
        }
    }

    async fn dynamically_compatible(
        &self,
        base: &Gav,
        candidate: &str,
    ) -> Result<Verdict, CheckError> {
        match self.run(&self.dynamic_command, base, candidate).await? {
            RunOutcome::Exited(exit_code::COMPATIBLE) => Ok(Verdict::Compatible),
            RunOutcome::Exited(exit_code::BASE_MISSING) => Err(CheckError::BaseArtifactMissing),
            RunOutcome::Exited(exit_code::CANDIDATE_MISSING) => {
                Err(CheckError::CandidateArtifactMissing)
            }
            // A crashed test harness counts against the candidate.
            RunOutcome::Exited(code) => Ok(Verdict::Incompatible(tag_for_exit_code(code))),
            RunOutcome::TimedOut => Ok(Verdict::Incompatible(Some(FailureTag::Timeout))),
        }
    }
}
