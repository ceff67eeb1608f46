//! Conversion of a compatible-version list into a Maven version range.

use crate::error::{Result, RewriteError};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

#[async_trait]
pub trait RangeConverter: Send + Sync {
    /// Range expression covering `compatible` given every `available` version.
    ///
    /// An empty string means no range could be built.
    async fn to_range(&self, available: &[String], compatible: &[String]) -> Result<String>;
}

/// Runs an external converter as `<command...> -a <available...> -c <compatible...>`
/// and reads the range from its stdout.
#[derive(Debug, Clone)]
pub struct CommandRangeConverter {
    command: Vec<String>,
}

impl CommandRangeConverter {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl RangeConverter for CommandRangeConverter {
    async fn to_range(&self, available: &[String], compatible: &[String]) -> Result<String> {
        let command_line = self.command.join(" ");
        let Some((program, args)) = self.command.split_first() else {
            return Err(RewriteError::Converter {
                command: command_line,
                message: "empty command".into(),
            });
        };

        let output = Command::new(program)
            .args(args)
            .arg("-a")
            .args(available)
            .arg("-c")
            .args(compatible)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RewriteError::Converter {
                command: command_line.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(RewriteError::Converter {
                command: command_line,
                message: format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(clean_range(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Drops line breaks and surrounding whitespace from converter output.
pub fn clean_range(raw: &str) -> String {
    raw.replace(['\n', '\r'], "").trim().to_string()
}
