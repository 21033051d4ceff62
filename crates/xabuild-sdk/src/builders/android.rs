//! Android packaging
//!
//! Archives a `Mono.Android` project into an APK with `xbuild`. The
//! `SignAndroidPackage` target produces both a signed and an unsigned APK;
//! `PackageForAndroid` produces only the unsigned one.

use crate::api;
use crate::artifacts::{self, TieBreak};
use crate::runner::{CommandRunner, run_checked};
use crate::types::{Api, Artifact, BuildError, BuildOutput, BuildRequest};

use super::common::{Toolchain, output_path_property, xbuild};

const SIGNED_SUFFIX: &str = "-Signed.apk";

/// Android builder
pub struct AndroidBuilder<'a> {
    runner: &'a dyn CommandRunner,
    toolchain: &'a Toolchain,
    /// Explicit signing choice; `None` reads `AndroidKeyStore` from the project.
    sign_apk: Option<bool>,
}

impl<'a> AndroidBuilder<'a> {
    pub fn new(runner: &'a dyn CommandRunner, toolchain: &'a Toolchain) -> Self {
        Self {
            runner,
            toolchain,
            sign_apk: None,
        }
    }

    pub fn sign_apk(mut self, sign_apk: Option<bool>) -> Self {
        self.sign_apk = sign_apk;
        self
    }

    /// Packages the APK and locates it under `bin/**/<configuration>/**`.
    ///
    /// When signing, an APK ending in `-Signed.apk` is preferred over the
    /// unsigned one built alongside it.
    pub fn archive(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
        let sign = self.sign_apk.unwrap_or_else(|| {
            api::android_signing_configured(&request.project, &request.configuration, &request.platform)
        });
        let target = if sign {
            "SignAndroidPackage"
        } else {
            "PackageForAndroid"
        };
        tracing::info!(signed = sign, "packaging {}", request.project.display());

        let spec = xbuild(self.toolchain, request, target).arg(output_path_property(request));
        run_checked(self.runner, &spec)?;

        let tie_break = if sign {
            TieBreak::PreferSuffix(SIGNED_SUFFIX)
        } else {
            TieBreak::FirstLexical
        };
        let apk = artifacts::locate_under_configuration(
            &request.project_dir(),
            &request.configuration,
            "apk",
            tie_break,
        )?;
        tracing::info!("apk found at path: {}", apk.display());

        Ok(BuildOutput {
            project: request.project.clone(),
            api: Api::Android,
            output_root: request.output_root(),
            artifact: Some(Artifact::Apk(apk)),
            dsym: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{CommandOutput, RecordingRunner};
    use crate::types::BuildCommand;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn project(dir: &Path, keystore: bool) -> BuildRequest {
        let path = dir.join("App.Droid.csproj");
        let signing = if keystore {
            "<AndroidKeyStore>True</AndroidKeyStore>"
        } else {
            ""
        };
        fs::write(
            &path,
            format!(
                r#"<Project>
  <PropertyGroup Condition=" '$(Configuration)|$(Platform)' == 'Release|AnyCPU' ">{}</PropertyGroup>
  <ItemGroup><Reference Include="Mono.Android" /></ItemGroup>
</Project>"#,
                signing
            ),
        )
        .unwrap();
        BuildRequest {
            project: path,
            configuration: "Release".into(),
            platform: "AnyCPU".into(),
            clean: false,
            command: BuildCommand::Archive,
        }
    }

    fn write_apks(dir: &Path) {
        let out = dir.join("bin/AnyCPU/Release");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("com.example.app.apk"), b"").unwrap();
        fs::write(out.join("com.example.app-Signed.apk"), b"").unwrap();
    }

    #[test]
    fn keystore_selects_sign_target_and_signed_apk() {
        let dir = TempDir::new().unwrap();
        let request = project(dir.path(), true);
        write_apks(dir.path());
        let runner = RecordingRunner::new();

        let output = AndroidBuilder::new(&runner, &Toolchain::default())
            .archive(&request)
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].has_arg("/t:SignAndroidPackage"));
        assert!(calls[0].has_arg("/p:OutputPath=bin/AnyCPU/Release/"));
        let apk = output.artifact.unwrap();
        assert!(apk.path().ends_with("com.example.app-Signed.apk"));
    }

    #[test]
    fn explicit_override_skips_signing() {
        let dir = TempDir::new().unwrap();
        let request = project(dir.path(), true);
        write_apks(dir.path());
        let runner = RecordingRunner::new();

        let output = AndroidBuilder::new(&runner, &Toolchain::default())
            .sign_apk(Some(false))
            .archive(&request)
            .unwrap();

        assert!(runner.calls()[0].has_arg("/t:PackageForAndroid"));
        assert!(output.artifact.unwrap().path().ends_with("com.example.app.apk"));
    }

    #[test]
    fn missing_apk_is_not_found() {
        let dir = TempDir::new().unwrap();
        let request = project(dir.path(), false);
        let runner = RecordingRunner::new();

        let err = AndroidBuilder::new(&runner, &Toolchain::default())
            .archive(&request)
            .unwrap_err();
        assert!(matches!(err, BuildError::ArtifactNotFound { .. }));
    }

    #[test]
    fn failed_package_is_fatal() {
        let dir = TempDir::new().unwrap();
        let request = project(dir.path(), false);
        let runner = RecordingRunner::new();
        runner.push_response(CommandOutput::failure(1, "error XA5101"));

        let err = AndroidBuilder::new(&runner, &Toolchain::default())
            .archive(&request)
            .unwrap_err();
        assert!(matches!(err, BuildError::Command { .. }));
    }
}
