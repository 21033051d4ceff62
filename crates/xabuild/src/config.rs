//! Configuration file support for xabuild.
//!
//! An optional `xabuild.toml` holds tool locations and build defaults so CI
//! steps don't have to repeat them on every invocation.
//!
//! ## Configuration File Location
//!
//! The configuration file is searched for in the following order:
//! 1. Current working directory (`./xabuild.toml`)
//! 2. Parent directories (up to the repository root or filesystem root)
//!
//! ## Example Configuration
//!
//! ```toml
//! [tools]
//! xbuild = "/Library/Frameworks/Mono.framework/Commands/xbuild"
//! mdtool = "/Applications/Xamarin Studio.app/Contents/MacOS/mdtool"
//!
//! [build]
//! retry_on_hang = true
//! retry_attempts = 3
//!
//! [deploy]
//! dir = "build/deploy"
//! ```
//!
//! ## Precedence
//!
//! CLI flags win over the environment (`BITRISE_DEPLOY_DIR`), which wins
//! over the config file, which wins over built-in defaults. Everything is
//! resolved once into [`Settings`].

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use xabuild_sdk::{RetryPolicy, Toolchain};

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "xabuild.toml";

/// Environment variable naming the CI deploy directory.
pub const DEPLOY_DIR_ENV: &str = "BITRISE_DEPLOY_DIR";

/// Deploy directory used when nothing else is configured.
pub const DEFAULT_DEPLOY_DIR: &str = "deploy";

/// Root configuration structure for `xabuild.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XabuildConfig {
    /// External tool locations.
    pub tools: Toolchain,

    /// Build behaviour.
    pub build: BuildConfig,

    /// Artifact deployment.
    pub deploy: DeployConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Total attempts for the legacy `mdtool` build when `retry_on_hang` is set.
    ///
    /// Defaults to 3.
    pub retry_attempts: u32,

    /// Reissue a failed `mdtool` build, which is known to hang.
    pub retry_on_hang: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_on_hang: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Directory receiving packages, zipped dSYMs and generated export options.
    pub dir: Option<PathBuf>,
}

impl XabuildConfig {
    /// Loads configuration from the specified file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: XabuildConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Searches for `xabuild.toml` from the current directory upwards.
    pub fn discover() -> Result<Option<(Self, PathBuf)>> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&cwd)
    }

    /// Searches for `xabuild.toml` from `start_dir` upwards, stopping at the
    /// first directory containing `.git`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((config, path)))` - Found and loaded configuration with its path
    /// * `Ok(None)` - No configuration file found
    /// * `Err` - If a config file was found but couldn't be parsed
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            // Stop at repository root or filesystem root
            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub toolchain: Toolchain,
    /// Absolute deploy directory.
    pub deploy_dir: PathBuf,
    pub retry: RetryPolicy,
}

impl Settings {
    /// Merges CLI values, the deploy-dir environment value and the config file.
    pub fn resolve(
        cli_deploy_dir: Option<PathBuf>,
        cli_retry_on_hang: Option<bool>,
        env_deploy_dir: Option<String>,
        config: Option<&XabuildConfig>,
    ) -> Result<Self> {
        let config = config.cloned().unwrap_or_default();

        let deploy_dir = cli_deploy_dir
            .or_else(|| env_deploy_dir.filter(|d| !d.trim().is_empty()).map(PathBuf::from))
            .or(config.deploy.dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DEPLOY_DIR));
        let deploy_dir = std::path::absolute(&deploy_dir)
            .with_context(|| format!("Failed to resolve deploy directory {:?}", deploy_dir))?;

        let retry = if cli_retry_on_hang.unwrap_or(config.build.retry_on_hang) {
            RetryPolicy::attempts(config.build.retry_attempts)
        } else {
            RetryPolicy::none()
        };

        Ok(Self {
            toolchain: config.tools,
            deploy_dir,
            retry,
        })
    }
}

/// Parses a boolean-like CI input.
///
/// Accepts `true`, `t`, `yes`, `y`, `1` and `false`, `f`, `no`, `n`, `0` or
/// an empty string, ignoring case.
pub fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" | "" => Ok(false),
        _ => bail!("Invalid value for Boolean: \"{}\"", value),
    }
}
