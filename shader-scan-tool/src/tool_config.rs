use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use shader_scan::{ScanOptions, ShaderInfoTool};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Directories searched for shaders, in priority order
    pub paths: Vec<String>,

    /// Extension of shader files, without the dot
    pub extension: String,

    /// How long a refresh that found nothing new blocks further refreshes
    pub cooldown_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            extension: String::from("sdl"),
            cooldown_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    /// Program queried for shader names, categories and annotations
    pub program: String,

    /// Upper bound for a single invocation of the program
    pub timeout_ms: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            program: String::from("shaderinfo"),
            timeout_ms: 30_000,
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Shader search configuration
    #[serde(rename = "scan")]
    pub scan: ScanConfig,

    /// External metadata tool configuration
    #[serde(rename = "extractor")]
    pub extractor: ExtractorConfig,
}

#[derive(Debug, Parser)]
#[command(name = "shader-scan-tool")]
#[command(about = "Lists the shaders found in a set of search directories")]
#[command(version = "0.1")]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Shader directory to search (repeatable, replaces scan.paths)
    #[arg(long = "path")]
    pub paths: Vec<String>,

    /// Cache scope the lookups are made in
    #[arg(long, default_value = "default")]
    pub scope: String,

    /// Tracing log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print the shaders of one category once a scan completed
    List {
        #[arg(long, default_value = "surface")]
        category: String,
    },

    /// Print every category with its number of shaders
    Categories,

    /// Keep looking up a category and print it whenever it changes
    Watch {
        #[arg(long, default_value = "surface")]
        category: String,

        /// Milliseconds between lookups
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

pub struct ToolConfig {
    pub config: Config,
    pub scope: String,
    pub log_level: String,
    pub command: Command,
}

impl ToolConfig {
    /// Load configuration from the command line and the optional config file
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(cli_args: CliArgs) -> Result<Self> {
        let mut config = if let Some(config_path) = &cli_args.config {
            let mut config = Config::from_yaml_file(config_path).with_context(|| {
                format!("Loading config from {}", config_path.display())
            })?;

            // Relative search paths are relative to the config file
            let base_dir = config_path.parent();
            for path in config.scan.paths.iter_mut() {
                *path = resolve_relative_path(path, base_dir);
            }
            config
        } else {
            Config::default()
        };

        if !cli_args.paths.is_empty() {
            config.scan.paths = cli_args.paths;
        }

        Self::validate(&config)?;

        Ok(ToolConfig {
            config,
            scope: cli_args.scope,
            log_level: cli_args.log_level,
            command: cli_args.command,
        })
    }

    /// Validate configuration values
    fn validate(config: &Config) -> Result<()> {
        if config.scan.paths.is_empty() {
            anyhow::bail!("scan.paths must list at least one directory (or pass --path)");
        }

        if config.scan.extension.is_empty() {
            anyhow::bail!("scan.extension must not be empty");
        }

        if config.extractor.program.is_empty() {
            anyhow::bail!("extractor.program must not be empty");
        }

        if config.extractor.timeout_ms == 0 {
            anyhow::bail!("extractor.timeout_ms must be greater than 0");
        }

        // Missing directories are skipped by the scanner (warning only)
        for path in &config.scan.paths {
            if !Path::new(path).is_dir() {
                eprintln!("WARNING: Shader directory does not exist: {}", path);
            }
        }

        Ok(())
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions::default()
            .with_extension(self.config.scan.extension.clone())
            .with_cooldown(Duration::from_millis(self.config.scan.cooldown_ms))
    }

    pub fn extractor(&self) -> ShaderInfoTool {
        ShaderInfoTool::new(&self.config.extractor.program)
            .with_timeout(Duration::from_millis(self.config.extractor.timeout_ms))
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("Failed to parse YAML config file: {}", path.display()))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

/// Helper function to resolve relative paths against a base directory
fn resolve_relative_path(path: &str, base_dir: Option<&Path>) -> String {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_string_lossy().to_string()
    } else if let Some(base) = base_dir {
        base.join(path).to_string_lossy().to_string()
    } else {
        path.to_string_lossy().to_string()
    }
}
