//! Test helpers.
//!
//! [`ScriptedExtractor`] stands in for the external tool: a shader file's
//! content *is* the tool output. The first line is the name, the second the
//! category and every further line an annotation. A file starting with
//! `FAIL` makes extraction fail.

use crate::error::{Result, ScanError};
use crate::extractor::{BasicInfo, Extractor};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

pub(crate) fn write_shader(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedExtractor {
    calls: AtomicUsize,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedExtractor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every `basic_info` call sleeps for `delay` first.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every `basic_info` call consumes one permit of `gate` first.
    pub(crate) fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of `basic_info` calls so far.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn read(path: &Path) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(path)?;

        if content.starts_with("FAIL") {
            return Err(ScanError::MalformedOutput {
                path: path.to_path_buf(),
                reason: String::from("scripted failure"),
            });
        }

        Ok(content.lines().map(str::to_string).collect())
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn basic_info(&self, path: &Path) -> Result<BasicInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let lines = Self::read(path)?;
        match (lines.first(), lines.get(1)) {
            (Some(name), Some(category)) => Ok(BasicInfo {
                name: name.clone(),
                category: category.clone(),
            }),
            _ => Err(ScanError::MalformedOutput {
                path: path.to_path_buf(),
                reason: String::from("missing lines"),
            }),
        }
    }

    async fn annotations(&self, path: &Path) -> Result<Vec<String>> {
        Ok(Self::read(path)?.into_iter().skip(2).collect())
    }
}
