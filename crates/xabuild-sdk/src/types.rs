//! Core types for xabuild-sdk.
//!
//! This module defines the fundamental types used throughout the SDK:
//!
//! - [`BuildError`] - Error types for parsing, building and exporting
//! - [`Api`] - Platform API a project targets (Android, iOS, Mac)
//! - [`ConfigPair`] - A `Configuration|Platform` build variant
//! - [`BuildCommand`] / [`BuildRequest`] - What to do with a project
//! - [`BuildOutput`] / [`Artifact`] - What a build produced

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Error types for xabuild-sdk operations.
///
/// Every variant is fatal for the project being processed, with the
/// exception of the retried `mdtool` build (see [`crate::runner::RetryPolicy`]).
/// Debug-symbol lookups never produce an error; see
/// [`crate::artifacts::DsymLookup`].
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// An I/O error occurred.
    #[error("I/O error: {0}. Check file paths and permissions")]
    Io(#[from] std::io::Error),

    /// The solution file is malformed.
    #[error("failed to parse solution {path} (line {line}): {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// An external tool could not be started at all.
    #[error("failed to start {description}: {source}\n\nEnsure the tool is installed and available on PATH.")]
    Spawn {
        description: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited with a non-zero status.
    #[error("{description} failed.\n\nExit status: {status}\n\nStdout:\n{stdout}\n\nStderr:\n{stderr}")]
    Command {
        description: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    /// No artifact of the expected kind was produced.
    #[error("no {kind} found under {root}")]
    ArtifactNotFound { kind: String, root: PathBuf },

    /// Several artifacts matched and no disambiguation rule applies.
    #[error("multiple {kind} candidates found under {root}: {candidates:?}")]
    AmbiguousArtifact {
        kind: String,
        root: PathBuf,
        candidates: Vec<PathBuf>,
    },

    /// A property list could not be read or has an unexpected shape.
    #[error("plist error: {0}")]
    Plist(String),

    /// A provisioning profile is missing or could not be decoded.
    #[error("provisioning profile error: {0}")]
    Provisioning(String),

    /// A `Configuration|Platform` string without the `|` separator.
    #[error("invalid configuration pair '{0}', expected 'Configuration|Platform'")]
    InvalidConfigPair(String),

    /// The requested command cannot be applied to the project.
    #[error("cannot {command} project {project}: {reason}")]
    UnsupportedCommand {
        command: BuildCommand,
        project: PathBuf,
        reason: String,
    },
}

/// Platform API a project file references.
///
/// Detected from the project's assembly references by
/// [`crate::api::detect`]. Projects referencing none of these are not
/// buildable by this tool and are left out of solution expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Api {
    /// `Mono.Android`
    Android,
    /// `monotouch`, built through `mdtool`.
    LegacyIos,
    /// `Xamarin.iOS`, built through `xbuild`.
    ModernIos,
    /// `Xamarin.Mac`
    Mac,
}

impl Api {
    /// Returns the assembly name identifying this API in a project file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Api::Android => "Mono.Android",
            Api::LegacyIos => "monotouch",
            Api::ModernIos => "Xamarin.iOS",
            Api::Mac => "Xamarin.Mac",
        }
    }

    /// Platform family name accepted by platform filters.
    pub fn family(&self) -> &'static str {
        match self {
            Api::Android => "android",
            Api::LegacyIos | Api::ModernIos => "ios",
            Api::Mac => "macos",
        }
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `Configuration|Platform` pair such as `Release|iPhone`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigPair {
    pub configuration: String,
    pub platform: String,
}

impl ConfigPair {
    pub fn new(configuration: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            configuration: configuration.into(),
            platform: platform.into(),
        }
    }

    /// The `Configuration|Platform` key used in solution files.
    pub fn key(&self) -> String {
        format!("{}|{}", self.configuration, self.platform)
    }
}

impl FromStr for ConfigPair {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('|') {
            Some((configuration, platform)) => Ok(Self::new(configuration, platform)),
            None => Err(BuildError::InvalidConfigPair(s.to_string())),
        }
    }
}

impl fmt::Display for ConfigPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.configuration, self.platform)
    }
}

/// Action requested for each project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildCommand {
    /// Compile into `bin/<platform>/<configuration>`.
    Build,
    /// Produce a distributable package (APK, IPA, xcarchive, APP/PKG).
    Archive,
}

impl BuildCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildCommand::Build => "build",
            BuildCommand::Archive => "archive",
        }
    }
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single project build invocation.
///
/// Created per project by the dispatcher once the solution-level pair has
/// been mapped to the project-level pair.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Path to the project file.
    pub project: PathBuf,
    /// Project-level configuration (e.g. `Release`).
    pub configuration: String,
    /// Project-level platform (e.g. `iPhone`).
    pub platform: String,
    /// Run the `Clean` target before building.
    pub clean: bool,
    /// Build or archive.
    pub command: BuildCommand,
}

impl BuildRequest {
    /// Output directory relative to the project: `bin/<platform>/<configuration>`.
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from("bin")
            .join(&self.platform)
            .join(&self.configuration)
    }

    /// Directory containing the project file.
    pub fn project_dir(&self) -> PathBuf {
        self.project
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default()
    }

    /// Absolute output root: the project directory joined with [`Self::output_path`].
    pub fn output_root(&self) -> PathBuf {
        self.project_dir().join(self.output_path())
    }
}

/// A produced package.
///
/// Paths are canonical (symlinks resolved) so they remain valid after
/// temporary build directories are cleaned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum Artifact {
    Apk(PathBuf),
    Ipa(PathBuf),
    XcArchive(PathBuf),
    App(PathBuf),
    Pkg(PathBuf),
}

impl Artifact {
    pub fn path(&self) -> &PathBuf {
        match self {
            Artifact::Apk(p)
            | Artifact::Ipa(p)
            | Artifact::XcArchive(p)
            | Artifact::App(p)
            | Artifact::Pkg(p) => p,
        }
    }
}

/// Result of processing one project.
///
/// One instance per processed project, collected in processing order and
/// handed to the caller for export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOutput {
    /// Project file that was built.
    pub project: PathBuf,
    /// API flavor of the project.
    pub api: Api,
    /// `bin/<platform>/<configuration>` under the project directory.
    pub output_root: PathBuf,
    /// Produced package; `None` for plain builds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    /// Debug-symbol bundle found next to an iOS package, if exactly one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsym: Option<PathBuf>,
}
