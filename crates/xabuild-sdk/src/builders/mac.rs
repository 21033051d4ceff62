//! Mac packaging
//!
//! `Xamarin.Mac` projects are built with `xbuild /p:CreatePackage=true`.
//! The output directory then holds an `.xcarchive`, a `.pkg` installer or
//! a plain `.app` bundle, checked in that order.

use crate::artifacts::{self, TieBreak};
use crate::runner::{CommandRunner, run_checked};
use crate::types::{Api, Artifact, BuildError, BuildOutput, BuildRequest};

use super::common::{Toolchain, output_path_property, xbuild};

/// Mac builder
pub struct MacBuilder<'a> {
    runner: &'a dyn CommandRunner,
    toolchain: &'a Toolchain,
}

impl<'a> MacBuilder<'a> {
    pub fn new(runner: &'a dyn CommandRunner, toolchain: &'a Toolchain) -> Self {
        Self { runner, toolchain }
    }

    pub fn archive(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
        let spec = xbuild(self.toolchain, request, "Build")
            .arg("/p:CreatePackage=true")
            .arg(output_path_property(request));
        run_checked(self.runner, &spec)?;

        let output_root = request.output_root();
        let artifact = if let Some(archive) = artifacts::find(&output_root, "xcarchive", TieBreak::Unique)? {
            Artifact::XcArchive(archive)
        } else if let Some(pkg) = artifacts::find(&output_root, "pkg", TieBreak::Unique)? {
            Artifact::Pkg(pkg)
        } else {
            Artifact::App(artifacts::locate(&output_root, "app", TieBreak::FirstLexical)?)
        };
        tracing::info!("mac package found at path: {}", artifact.path().display());

        Ok(BuildOutput {
            project: request.project.clone(),
            api: Api::Mac,
            output_root,
            artifact: Some(artifact),
            dsym: None,
        })
    }
}
