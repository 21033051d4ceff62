//! Archive export.
//!
//! An `.xcarchive` is turned into a distributable package in two steps:
//! write an export options plist (derived from the embedded provisioning
//! profile for iOS, or from the requested method for Mac), then run
//! `xcodebuild -exportArchive` with it.

mod archive;
mod options;
pub mod plist;
mod provisioning;

pub use archive::{ExportedArchive, archive_dsym, export_archive};
pub use options::{ExportMethod, ExportOptions};
pub use provisioning::ProvisioningProfile;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::builders::Toolchain;
use crate::runner::CommandRunner;
use crate::types::{Api, BuildError};

/// Operating system an archive was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    Ios,
    Mac,
}

impl TargetOs {
    /// `None` for Android, which never produces an archive.
    pub fn from_api(api: Api) -> Option<Self> {
        match api {
            Api::LegacyIos | Api::ModernIos => Some(TargetOs::Ios),
            Api::Mac => Some(TargetOs::Mac),
            Api::Android => None,
        }
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetOs::Ios => f.write_str("ios"),
            TargetOs::Mac => f.write_str("mac"),
        }
    }
}

/// Builds export options for `archive`.
///
/// For Mac archives `mac_method` is used as given (`None` leaves the method
/// out) and symbol upload is disabled. iOS archives take their method from
/// the embedded provisioning profile.
pub fn generate_export_options<R: CommandRunner + ?Sized>(
    runner: &R,
    toolchain: &Toolchain,
    archive: &Path,
    target: TargetOs,
    mac_method: Option<ExportMethod>,
) -> Result<ExportOptions, BuildError> {
    let options = match target {
        TargetOs::Mac => ExportOptions {
            method: mac_method,
            upload_symbols: Some(false),
        },
        TargetOs::Ios => {
            let profile_path = ProvisioningProfile::locate(archive, target)?;
            let profile = ProvisioningProfile::decode(runner, toolchain, &profile_path)?;
            tracing::info!(
                "using provisioning profile {}",
                profile.name().unwrap_or("(unnamed)")
            );
            ExportOptions {
                method: Some(profile.export_method()),
                upload_symbols: None,
            }
        }
    };

    match options.method {
        Some(method) => tracing::info!("creating export options for export type: {}", method),
        None => tracing::info!("creating export options without export type"),
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{CommandOutput, RecordingRunner};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn mac_options_skip_profile() {
        let runner = RecordingRunner::new();
        let options = generate_export_options(
            &runner,
            &Toolchain::default(),
            Path::new("/archives/App.xcarchive"),
            TargetOs::Mac,
            None,
        )
        .unwrap();

        assert_eq!(options.method, None);
        assert_eq!(options.upload_symbols, Some(false));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn ios_options_follow_profile() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("App.xcarchive");
        let app = archive.join("Products/Applications/App.app");
        fs::create_dir_all(&app).unwrap();
        fs::write(app.join("embedded.mobileprovision"), b"signed").unwrap();

        let runner = RecordingRunner::new();
        runner.push_response(CommandOutput::success(format!(
            "{}<dict><key>ProvisionedDevices</key><array/><key>Entitlements</key><dict/></dict></plist>",
            plist::HEADER
        )));

        let options = generate_export_options(
            &runner,
            &Toolchain::default(),
            &archive,
            TargetOs::Ios,
            Some(ExportMethod::AppStore),
        )
        .unwrap();
        assert_eq!(options.method, Some(ExportMethod::AdHoc));
        assert_eq!(runner.count("security"), 1);
    }

    #[test]
    fn target_os_from_api() {
        assert_eq!(TargetOs::from_api(Api::ModernIos), Some(TargetOs::Ios));
        assert_eq!(TargetOs::from_api(Api::Mac), Some(TargetOs::Mac));
        assert_eq!(TargetOs::from_api(Api::Android), None);
    }
}
