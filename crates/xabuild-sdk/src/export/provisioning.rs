use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::TargetOs;
use super::options::ExportMethod;
use super::plist::{self, Value};
use crate::artifacts::{self, TieBreak};
use crate::builders::Toolchain;
use crate::runner::{CommandRunner, CommandSpec, run_checked};
use crate::types::BuildError;

/// A decoded provisioning profile embedded in an archived app.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisioningProfile {
    entries: BTreeMap<String, Value>,
}

impl ProvisioningProfile {
    /// Builds a profile from the decoded (CMS-unwrapped) plist.
    ///
    /// `DeveloperCertificates` is dropped; it holds raw certificate blobs
    /// that are never consulted.
    pub fn from_plist(xml: &str) -> Result<Self, BuildError> {
        let mut entries = plist::parse_dictionary(xml)
            .map_err(|e| BuildError::Provisioning(format!("cannot decode profile: {}", e)))?;
        entries.remove("DeveloperCertificates");
        Ok(Self { entries })
    }

    /// Decodes a signed profile with `security cms -D -i <path>`.
    pub fn decode<R: CommandRunner + ?Sized>(
        runner: &R,
        toolchain: &Toolchain,
        path: &Path,
    ) -> Result<Self, BuildError> {
        let spec = CommandSpec::new(&toolchain.security, "security cms")
            .args(["cms", "-D", "-i"])
            .path_arg(path);
        let output = run_checked(runner, &spec)?;
        Self::from_plist(&output.stdout)
    }

    /// Finds the profile embedded in the archived app bundle.
    pub fn locate(archive: &Path, target: TargetOs) -> Result<PathBuf, BuildError> {
        let applications = archive.join("Products").join("Applications");
        let app = artifacts::find(&applications, "app", TieBreak::FirstLexical)?.ok_or_else(|| {
            BuildError::Provisioning(format!("no app bundle in {}", applications.display()))
        })?;

        let profile = match target {
            TargetOs::Ios => app.join("embedded.mobileprovision"),
            TargetOs::Mac => app.join("Contents").join("embedded.provisionprofile"),
        };
        if !profile.is_file() {
            return Err(BuildError::Provisioning(format!(
                "no provisioning profile found at {}",
                profile.display()
            )));
        }
        Ok(profile)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn name(&self) -> Option<&str> {
        self.get("Name").and_then(Value::as_str)
    }

    /// Derives the export method from device and entitlement settings.
    ///
    /// | ProvisionedDevices | Other | Method |
    /// |---|---|---|
    /// | absent | `ProvisionsAllDevices` true | enterprise |
    /// | absent | | app-store |
    /// | present | `get-task-allow` true | development |
    /// | present | entitlements without `get-task-allow` true | ad-hoc |
    /// | present | no entitlements | development |
    pub fn export_method(&self) -> ExportMethod {
        if self.get("ProvisionedDevices").is_none() {
            return if self.get("ProvisionsAllDevices").is_some_and(Value::is_true) {
                ExportMethod::Enterprise
            } else {
                ExportMethod::AppStore
            };
        }

        match self.get("Entitlements").and_then(Value::as_dictionary) {
            Some(entitlements) => {
                if entitlements.get("get-task-allow").is_some_and(Value::is_true) {
                    ExportMethod::Development
                } else {
                    ExportMethod::AdHoc
                }
            }
            None => ExportMethod::Development,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{CommandOutput, RecordingRunner};
    use std::fs;
    use tempfile::TempDir;

    fn profile(body: &str) -> ProvisioningProfile {
        let xml = format!("{}<dict>{}</dict></plist>", plist::HEADER, body);
        ProvisioningProfile::from_plist(&xml).unwrap()
    }

    const DEVICES: &str = "<key>ProvisionedDevices</key><array><string>00008030</string></array>";

    #[test]
    fn enterprise_when_all_devices() {
        let p = profile("<key>ProvisionsAllDevices</key><true/>");
        assert_eq!(p.export_method(), ExportMethod::Enterprise);
    }

    #[test]
    fn app_store_without_devices() {
        assert_eq!(profile("").export_method(), ExportMethod::AppStore);
        let p = profile("<key>ProvisionsAllDevices</key><false/>");
        assert_eq!(p.export_method(), ExportMethod::AppStore);
    }

    #[test]
    fn development_when_task_allow() {
        let p = profile(&format!(
            "{}<key>Entitlements</key><dict><key>get-task-allow</key><true/></dict>",
            DEVICES
        ));
        assert_eq!(p.export_method(), ExportMethod::Development);
    }

    #[test]
    fn ad_hoc_when_task_allow_missing_or_false() {
        let p = profile(&format!(
            "{}<key>Entitlements</key><dict><key>get-task-allow</key><false/></dict>",
            DEVICES
        ));
        assert_eq!(p.export_method(), ExportMethod::AdHoc);

        let p = profile(&format!("{}<key>Entitlements</key><dict></dict>", DEVICES));
        assert_eq!(p.export_method(), ExportMethod::AdHoc);
    }

    #[test]
    fn development_without_entitlements() {
        assert_eq!(profile(DEVICES).export_method(), ExportMethod::Development);
    }

    #[test]
    fn certificates_are_dropped() {
        let p = profile(
            "<key>Name</key><string>Team Profile</string>\
             <key>DeveloperCertificates</key><array><data>AAAA</data></array>",
        );
        assert_eq!(p.name(), Some("Team Profile"));
        assert!(p.get("DeveloperCertificates").is_none());
    }

    #[test]
    fn decode_runs_security_cms() {
        let runner = RecordingRunner::new();
        runner.push_response(CommandOutput::success(format!(
            "{}<dict><key>ProvisionsAllDevices</key><true/></dict></plist>",
            plist::HEADER
        )));

        let p = ProvisioningProfile::decode(&runner, &Toolchain::default(), Path::new("/a/embedded.mobileprovision"))
            .unwrap();
        assert_eq!(p.export_method(), ExportMethod::Enterprise);
        let calls = runner.calls();
        assert_eq!(calls[0].program, "security");
        assert_eq!(calls[0].args, vec!["cms", "-D", "-i", "/a/embedded.mobileprovision"]);
    }

    #[test]
    fn locate_follows_target_layout() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("App.xcarchive");
        let app = archive.join("Products/Applications/App.app");
        fs::create_dir_all(app.join("Contents")).unwrap();
        fs::write(app.join("embedded.mobileprovision"), b"").unwrap();

        let ios = ProvisioningProfile::locate(&archive, TargetOs::Ios).unwrap();
        assert!(ios.ends_with("App.app/embedded.mobileprovision"));

        let err = ProvisioningProfile::locate(&archive, TargetOs::Mac).unwrap_err();
        assert!(matches!(err, BuildError::Provisioning(_)));
    }
}
