//! External shader metadata extraction.
//!
//! The scanner does not parse compiled shaders itself. It asks an external
//! tool for two things per file: the basic info (shader name and category)
//! and the raw annotation lines. Any failure means the file is skipped.

use crate::error::{Result, ScanError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Name and category reported for a shader file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicInfo {
    pub name: String,
    pub category: String,
}

/// Source of shader metadata.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Returns the shader's name and category.
    async fn basic_info(&self, path: &Path) -> Result<BasicInfo>;

    /// Returns the shader's annotation lines. An empty list is valid.
    async fn annotations(&self, path: &Path) -> Result<Vec<String>>;
}

/// Runs a `shaderinfo` compatible program: `-t` prints the name and the
/// category on the first two lines, `-a` prints one annotation per line.
#[derive(Debug, Clone)]
pub struct ShaderInfoTool {
    program: PathBuf,
    timeout: Duration,
}

impl ShaderInfoTool {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Bounds every invocation; a child that runs longer is killed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the program with `flag` on `path` and returns its stdout lines
    /// with carriage returns removed.
    async fn run(&self, flag: &str, path: &Path) -> Result<Vec<String>> {
        let child = Command::new(&self.program)
            .arg(flag)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ScanError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Dropping the pending future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ScanError::Timeout {
                path: path.to_path_buf(),
                timeout: self.timeout,
            })??;

        if !output.status.success() {
            return Err(ScanError::ExitStatus {
                path: path.to_path_buf(),
                status: output.status,
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| ScanError::InvalidUtf8 {
            path: path.to_path_buf(),
        })?;

        Ok(split_lines(&stdout))
    }
}

#[async_trait]
impl Extractor for ShaderInfoTool {
    async fn basic_info(&self, path: &Path) -> Result<BasicInfo> {
        let lines = self.run("-t", path).await?;
        parse_basic_info(path, &lines)
    }

    async fn annotations(&self, path: &Path) -> Result<Vec<String>> {
        let lines = self.run("-a", path).await?;
        Ok(lines.into_iter().filter(|line| !line.is_empty()).collect())
    }
}

fn split_lines(output: &str) -> Vec<String> {
    output
        .split('\n')
        .map(|line| line.replace('\r', ""))
        .collect()
}

fn parse_basic_info(path: &Path, lines: &[String]) -> Result<BasicInfo> {
    let malformed = |reason: &str| ScanError::MalformedOutput {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let name = lines.first().filter(|s| !s.is_empty());
    let category = lines.get(1).filter(|s| !s.is_empty());

    match (name, category) {
        (Some(name), Some(category)) => Ok(BasicInfo {
            name: name.clone(),
            category: category.clone(),
        }),
        (None, _) => Err(malformed("missing shader name")),
        (Some(_), None) => Err(malformed("missing shader category")),
    }
}
