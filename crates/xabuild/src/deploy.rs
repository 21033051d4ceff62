//! Publishing artifacts to the CI deploy directory.
//!
//! Packages are copied (not moved) into the deploy directory so the build
//! tree stays intact for later steps. Bundle directories such as `.dSYM`
//! and `.app` are zipped. Each deployed path is exported to later steps
//! with `envman`.

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use xabuild_sdk::runner::{CommandRunner, CommandSpec, run_checked};
use xabuild_sdk::Toolchain;

pub const APK_PATH_KEY: &str = "BITRISE_APK_PATH";
pub const IPA_PATH_KEY: &str = "BITRISE_IPA_PATH";
pub const DSYM_PATH_KEY: &str = "BITRISE_DSYM_PATH";
pub const APP_PATH_KEY: &str = "BITRISE_APP_PATH";
pub const PKG_PATH_KEY: &str = "BITRISE_PKG_PATH";
pub const TEST_RESULT_KEY: &str = "BITRISE_XAMARIN_TEST_RESULT";

/// Copies artifacts into the deploy directory and exports their paths.
pub struct Deployer<'a> {
    runner: &'a dyn CommandRunner,
    toolchain: &'a Toolchain,
    deploy_dir: PathBuf,
    /// Destinations written during this run.
    deployed: RefCell<HashSet<PathBuf>>,
}

impl<'a> Deployer<'a> {
    pub fn new(runner: &'a dyn CommandRunner, toolchain: &'a Toolchain, deploy_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            toolchain,
            deploy_dir: deploy_dir.into(),
            deployed: RefCell::new(HashSet::new()),
        }
    }

    /// Records `destination` and warns when an earlier artifact of this run
    /// already used it. Returns false in that case.
    fn claim(&self, destination: &Path) -> bool {
        let fresh = self.deployed.borrow_mut().insert(destination.to_path_buf());
        if !fresh {
            tracing::warn!(
                "{} was already deployed by an earlier project and is overwritten",
                destination.display()
            );
        }
        fresh
    }

    fn ensure_deploy_dir(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.deploy_dir)
            .with_context(|| format!("Failed to create deploy directory {:?}", self.deploy_dir))?;
        fs::canonicalize(&self.deploy_dir)
            .with_context(|| format!("Failed to resolve deploy directory {:?}", self.deploy_dir))
    }

    /// Copies a single file into the deploy directory.
    ///
    /// Returns the destination path. A file that already lives in the
    /// deploy directory is left untouched.
    pub fn deploy_file(&self, path: &Path) -> Result<PathBuf> {
        let source = fs::canonicalize(path).with_context(|| format!("Artifact not found: {:?}", path))?;
        let name = source
            .file_name()
            .with_context(|| format!("Artifact has no file name: {:?}", source))?;
        let destination = self.ensure_deploy_dir()?.join(name);
        self.claim(&destination);

        if destination != source {
            fs::copy(&source, &destination)
                .with_context(|| format!("Failed to copy {:?} to {:?}", source, destination))?;
        }
        tracing::info!("the {} is now available at: {}", describe(&destination), destination.display());
        Ok(destination)
    }

    /// Zips a bundle directory into `<deploy>/<name>.zip`.
    ///
    /// Runs `zip -rTy` from the bundle's parent so archive entries are
    /// relative and symlinks are stored as links.
    pub fn deploy_bundle(&self, bundle: &Path) -> Result<PathBuf> {
        let bundle = fs::canonicalize(bundle).with_context(|| format!("Bundle not found: {:?}", bundle))?;
        let parent = bundle
            .parent()
            .with_context(|| format!("Bundle has no parent directory: {:?}", bundle))?;
        let name = bundle
            .file_name()
            .with_context(|| format!("Bundle has no file name: {:?}", bundle))?
            .to_string_lossy()
            .into_owned();
        let zip_path = self.ensure_deploy_dir()?.join(format!("{}.zip", name));
        self.claim(&zip_path);

        let spec = CommandSpec::new(&self.toolchain.zip, format!("zip {}", name))
            .arg("-rTy")
            .path_arg(&zip_path)
            .arg(&name)
            .current_dir(parent);
        run_checked(self.runner, &spec).with_context(|| format!("Failed to zip {}", name))?;

        tracing::info!("the zipped {} is now available at: {}", name, zip_path.display());
        Ok(zip_path)
    }

    /// Zips a `.dSYM` bundle into the deploy directory.
    pub fn deploy_dsym(&self, dsym: &Path) -> Result<PathBuf> {
        self.deploy_bundle(dsym)
    }

    /// Publishes `key=value` to later CI steps with `envman add`.
    pub fn export_env(&self, key: &str, value: &str) -> Result<()> {
        let spec = CommandSpec::new(&self.toolchain.envman, format!("envman add {}", key))
            .args(["add", "--key", key, "--value", value]);
        run_checked(self.runner, &spec).with_context(|| format!("Failed to export {}", key))?;
        Ok(())
    }

    pub fn export_path(&self, key: &str, path: &Path) -> Result<()> {
        self.export_env(key, &path.to_string_lossy())
    }
}

fn describe(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_uppercase())
        .unwrap_or_else(|| "artifact".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use xabuild_sdk::runner::{CommandOutput, RecordingRunner};

    #[test]
    fn deploy_file_copies_and_keeps_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("bin/App.apk");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"apk").unwrap();

        let runner = RecordingRunner::new();
        let toolchain = Toolchain::default();
        let deployer = Deployer::new(&runner, &toolchain, temp.path().join("deploy"));

        let deployed = deployer.deploy_file(&source).unwrap();
        assert!(source.exists());
        assert_eq!(fs::read(&deployed).unwrap(), b"apk");
        assert_eq!(deployed.file_name().unwrap(), "App.apk");
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn deploy_file_in_place_is_untouched() {
        let temp = TempDir::new().unwrap();
        let deploy = temp.path().join("deploy");
        fs::create_dir_all(&deploy).unwrap();
        fs::write(deploy.join("App.ipa"), b"ipa").unwrap();

        let runner = RecordingRunner::new();
        let toolchain = Toolchain::default();
        let deployer = Deployer::new(&runner, &toolchain, &deploy);

        let deployed = deployer.deploy_file(&deploy.join("App.ipa")).unwrap();
        assert_eq!(fs::read(deployed).unwrap(), b"ipa");
    }

    #[test]
    fn same_name_from_two_projects_is_flagged() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("Phone/bin/App.ipa");
        let second = temp.path().join("Tablet/bin/App.ipa");
        for (path, body) in [(&first, b"phone"), (&second, b"table")] {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }

        let runner = RecordingRunner::new();
        let toolchain = Toolchain::default();
        let deployer = Deployer::new(&runner, &toolchain, temp.path().join("deploy"));

        let deployed = deployer.deploy_file(&first).unwrap();
        assert!(!deployer.claim(&deployed));

        let again = deployer.deploy_file(&second).unwrap();
        assert_eq!(again, deployed);
        assert_eq!(fs::read(&again).unwrap(), b"table");
    }

    #[test]
    fn distinct_names_are_not_flagged() {
        let runner = RecordingRunner::new();
        let toolchain = Toolchain::default();
        let deployer = Deployer::new(&runner, &toolchain, "/tmp/deploy");

        assert!(deployer.claim(Path::new("/tmp/deploy/App.apk")));
        assert!(deployer.claim(Path::new("/tmp/deploy/App.ipa")));
        assert!(!deployer.claim(Path::new("/tmp/deploy/App.apk")));
    }

    #[test]
    fn deploy_dsym_zips_from_parent() {
        let temp = TempDir::new().unwrap();
        let dsym = temp.path().join("out/App.app.dSYM");
        fs::create_dir_all(&dsym).unwrap();

        let runner = RecordingRunner::new();
        let toolchain = Toolchain::default();
        let deployer = Deployer::new(&runner, &toolchain, temp.path().join("deploy"));

        let zip = deployer.deploy_dsym(&dsym).unwrap();
        assert!(zip.ends_with("App.app.dSYM.zip"));

        let calls = runner.calls();
        assert_eq!(calls[0].program, "zip");
        assert_eq!(calls[0].args[0], "-rTy");
        assert_eq!(calls[0].args[2], "App.app.dSYM");
        assert_eq!(
            calls[0].current_dir,
            Some(fs::canonicalize(temp.path().join("out")).unwrap())
        );
    }

    #[test]
    fn export_env_runs_envman() {
        let runner = RecordingRunner::new();
        let toolchain = Toolchain::default();
        let deployer = Deployer::new(&runner, &toolchain, "/tmp/deploy");

        deployer.export_env(TEST_RESULT_KEY, "succeeded").unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].program, "envman");
        assert_eq!(
            calls[0].args,
            vec!["add", "--key", TEST_RESULT_KEY, "--value", "succeeded"]
        );
    }

    #[test]
    fn export_failure_is_reported() {
        let runner = RecordingRunner::new();
        runner.push_response(CommandOutput::failure(1, "envman: not in a step"));
        let toolchain = Toolchain::default();
        let deployer = Deployer::new(&runner, &toolchain, "/tmp/deploy");

        let err = deployer.export_env(APK_PATH_KEY, "/tmp/deploy/App.apk").unwrap_err();
        assert!(err.to_string().contains(APK_PATH_KEY));
    }
}
