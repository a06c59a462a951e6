//! Tracing setup for the shader scan tool
//!
//! Logs go to the systemd journal when the process runs as a service with its
//! output connected to journald, and to stderr otherwise.

use tracing_subscriber::{EnvFilter, prelude::*};

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default log level filter (e.g., "info,shader_scan=debug")
    pub default_log_level: String,

    /// Whether to force stderr output (overrides journal detection)
    pub force_stderr: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_log_level: "info".to_string(),
            force_stderr: false,
        }
    }
}

impl TracingConfig {
    /// Set the default log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.default_log_level = level.into();
        self
    }

    /// Force stderr output instead of journal detection
    pub fn with_force_stderr(mut self, force: bool) -> Self {
        self.force_stderr = force;
        self
    }

    fn output(&self) -> LogOutput {
        if self.force_stderr {
            LogOutput::Stderr
        } else {
            LogOutput::detect()
        }
    }
}

/// Output destination for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Write to systemd journal with structured logging
    Journal,
    /// Write to stderr with formatted text
    Stderr,
}

impl LogOutput {
    /// Detect the appropriate output based on environment
    pub fn detect() -> Self {
        Self::from_journal_stream(std::env::var_os("JOURNAL_STREAM").is_some())
    }

    fn from_journal_stream(connected: bool) -> Self {
        if connected {
            LogOutput::Journal
        } else {
            LogOutput::Stderr
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            LogOutput::Journal => "systemd journal",
            LogOutput::Stderr => "stderr",
        }
    }
}

/// Initialize tracing with the given configuration
///
/// `RUST_LOG` takes precedence over [`TracingConfig::default_log_level`].
/// When journald cannot be reached the logs fall back to stderr.
///
/// # Errors
///
/// Fails if a global subscriber has already been installed.
pub fn initialize_tracing(config: TracingConfig) -> anyhow::Result<()> {
    let mut output = config.output();
    let mut journal_error = None;

    if output == LogOutput::Journal {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                tracing_subscriber::registry()
                    .with(env_filter(&config))
                    .with(journald_layer)
                    .try_init()?;
            }
            Err(e) => {
                journal_error = Some(e);
                output = LogOutput::Stderr;
            }
        }
    }

    if output == LogOutput::Stderr {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true)
            .with_ansi(false);
        tracing_subscriber::registry()
            .with(env_filter(&config))
            .with(fmt_layer)
            .try_init()?;
    }

    if let Some(e) = journal_error {
        tracing::warn!(error = %e, "Failed to connect to journald, logging to stderr");
    }

    tracing::debug!(
        output = ?output,
        "Tracing initialized - logs to {}",
        output.description()
    );

    Ok(())
}

fn env_filter(config: &TracingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_log_level))
}
