use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::TargetOs;
use crate::artifacts::{self, DsymLookup, TieBreak};
use crate::builders::Toolchain;
use crate::runner::{CommandRunner, CommandSpec, run_checked};
use crate::types::{Artifact, BuildError};

/// A package exported from an `.xcarchive` into a private temp directory.
///
/// The directory is removed when this value is dropped, so copy the
/// artifact out first.
#[derive(Debug)]
pub struct ExportedArchive {
    dir: TempDir,
    artifact: Artifact,
}

impl ExportedArchive {
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Runs `xcodebuild -exportArchive` into a fresh temp directory and locates
/// the exported package (`.ipa` for iOS; `.pkg`, else `.app`, for Mac).
pub fn export_archive<R: CommandRunner + ?Sized>(
    runner: &R,
    toolchain: &Toolchain,
    archive: &Path,
    options_path: &Path,
    target: TargetOs,
) -> Result<ExportedArchive, BuildError> {
    let dir = tempfile::Builder::new().prefix("_xabuild_").tempdir()?;
    tracing::info!("exporting {} from {}", target, archive.display());

    let spec = CommandSpec::new(&toolchain.xcodebuild, "xcodebuild -exportArchive")
        .arg("-exportArchive")
        .arg("-archivePath")
        .path_arg(archive)
        .arg("-exportPath")
        .path_arg(dir.path())
        .arg("-exportOptionsPlist")
        .path_arg(options_path);
    run_checked(runner, &spec)?;

    let artifact = match target {
        TargetOs::Ios => Artifact::Ipa(artifacts::locate(dir.path(), "ipa", TieBreak::FirstLexical)?),
        TargetOs::Mac => match artifacts::find(dir.path(), "pkg", TieBreak::FirstLexical)? {
            Some(pkg) => Artifact::Pkg(pkg),
            None => Artifact::App(artifacts::locate(dir.path(), "app", TieBreak::FirstLexical)?),
        },
    };

    Ok(ExportedArchive { dir, artifact })
}

/// Looks up the app's debug symbols in `<archive>/dSYMs`.
pub fn archive_dsym(archive: &Path) -> Option<PathBuf> {
    match artifacts::find_dsym(&archive.join("dSYMs")) {
        DsymLookup::Found(path) => Some(path),
        DsymLookup::Missing | DsymLookup::Ambiguous(_) => None,
    }
}
