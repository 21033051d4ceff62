//! iOS packaging
//!
//! Two project flavors are supported:
//!
//! - `monotouch` projects are built with `mdtool`, which leaves an `.app`
//!   bundle behind. The IPA is then produced with
//!   `xcrun -sdk iphoneos PackageApplication`, unless a previous run already
//!   left one next to the bundle.
//! - `Xamarin.iOS` projects are built with `xbuild /p:BuildIpa=true`, which
//!   writes the IPA (or an `.xcarchive`) straight into the output directory.

use std::path::{Path, PathBuf};

use crate::artifacts::{self, TieBreak};
use crate::runner::{CommandRunner, CommandSpec, RetryPolicy, run_checked};
use crate::types::{Api, Artifact, BuildError, BuildOutput, BuildRequest};

use super::common::{Toolchain, output_path_property, xbuild};

/// iOS builder
pub struct IosBuilder<'a> {
    runner: &'a dyn CommandRunner,
    toolchain: &'a Toolchain,
    retry: RetryPolicy,
}

impl<'a> IosBuilder<'a> {
    pub fn new(runner: &'a dyn CommandRunner, toolchain: &'a Toolchain) -> Self {
        Self {
            runner,
            toolchain,
            retry: RetryPolicy::none(),
        }
    }

    /// Retry policy for the `mdtool` build; other commands are never retried.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn archive(&self, api: Api, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
        match api {
            Api::LegacyIos => self.archive_with_mdtool(request),
            Api::ModernIos => self.archive_with_xbuild(request),
            other => Err(BuildError::UnsupportedCommand {
                command: request.command,
                project: request.project.clone(),
                reason: format!("{} is not an iOS API", other),
            }),
        }
    }

    /// `mdtool -v build <project> --configuration:<c>|<p> --target:Build`
    pub fn mdtool_command(&self, request: &BuildRequest) -> CommandSpec {
        CommandSpec::new(&self.toolchain.mdtool, "mdtool build")
            .args(["-v", "build"])
            .path_arg(&request.project)
            .arg(format!(
                "--configuration:{}|{}",
                request.configuration, request.platform
            ))
            .arg("--target:Build")
    }

    fn archive_with_mdtool(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
        self.retry.run(self.runner, &self.mdtool_command(request))?;

        let output_root = request.output_root();
        let app = artifacts::locate(&output_root, "app", TieBreak::FirstLexical)?;
        let ipa = sibling_ipa(&app);

        if ipa.exists() {
            tracing::info!("reusing existing ipa at {}", ipa.display());
        } else {
            tracing::info!("packaging application");
            let spec = CommandSpec::new(&self.toolchain.xcrun, "xcrun PackageApplication")
                .args(["-sdk", "iphoneos", "PackageApplication", "-v"])
                .path_arg(&app)
                .arg("-o")
                .path_arg(&ipa);
            run_checked(self.runner, &spec)?;

            if !ipa.exists() {
                return Err(BuildError::ArtifactNotFound {
                    kind: ".ipa".to_string(),
                    root: ipa.parent().map(PathBuf::from).unwrap_or_default(),
                });
            }
        }

        let dsym = app
            .parent()
            .and_then(|dir| artifacts::find_dsym(dir).found());

        Ok(BuildOutput {
            project: request.project.clone(),
            api: Api::LegacyIos,
            output_root,
            artifact: Some(Artifact::Ipa(ipa)),
            dsym,
        })
    }

    fn archive_with_xbuild(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
        let spec = xbuild(self.toolchain, request, "Build")
            .arg("/p:BuildIpa=true")
            .arg(output_path_property(request));
        run_checked(self.runner, &spec)?;

        let output_root = request.output_root();
        if let Some(archive) = artifacts::find(&output_root, "xcarchive", TieBreak::Unique)? {
            tracing::info!("xcarchive found at path: {}", archive.display());
            return Ok(BuildOutput {
                project: request.project.clone(),
                api: Api::ModernIos,
                output_root,
                artifact: Some(Artifact::XcArchive(archive)),
                dsym: None,
            });
        }

        let ipa = artifacts::locate(&output_root, "ipa", TieBreak::FirstLexical)?;
        tracing::info!("ipa found at path: {}", ipa.display());
        let dsym = artifacts::find_dsym(&output_root).found();

        Ok(BuildOutput {
            project: request.project.clone(),
            api: Api::ModernIos,
            output_root,
            artifact: Some(Artifact::Ipa(ipa)),
            dsym,
        })
    }
}

/// `<dir>/<name>.app` -> `<dir>/<name>.ipa`
fn sibling_ipa(app: &Path) -> PathBuf {
    app.with_extension("ipa")
}
