//! Tool locations and the `xbuild` command lines shared by all builders.

use serde::{Deserialize, Serialize};

use crate::runner::CommandSpec;
use crate::types::BuildRequest;

/// Default `mdtool` location inside the Xamarin Studio bundle.
pub const DEFAULT_MDTOOL: &str = "/Applications/Xamarin Studio.app/Contents/MacOS/mdtool";

/// Paths of the external tools, overridable from `[tools]` in `xabuild.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toolchain {
    pub xbuild: String,
    pub mdtool: String,
    pub xcrun: String,
    pub xcodebuild: String,
    pub zip: String,
    pub security: String,
    pub envman: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            xbuild: "xbuild".to_string(),
            mdtool: DEFAULT_MDTOOL.to_string(),
            xcrun: "xcrun".to_string(),
            xcodebuild: "xcodebuild".to_string(),
            zip: "zip".to_string(),
            security: "security".to_string(),
            envman: "envman".to_string(),
        }
    }
}

/// `xbuild <project> /t:<target> /p:Configuration=<c> /p:Platform=<p>`
pub(crate) fn xbuild(toolchain: &Toolchain, request: &BuildRequest, target: &str) -> CommandSpec {
    CommandSpec::new(&toolchain.xbuild, format!("xbuild {}", target))
        .path_arg(&request.project)
        .arg(format!("/t:{}", target))
        .arg(format!("/p:Configuration={}", request.configuration))
        .arg(format!("/p:Platform={}", request.platform))
}

/// `/p:OutputPath=bin/<platform>/<configuration>/`, always with forward slashes.
pub(crate) fn output_path_property(request: &BuildRequest) -> String {
    format!(
        "/p:OutputPath=bin/{}/{}/",
        request.platform, request.configuration
    )
}

pub fn clean_command(toolchain: &Toolchain, request: &BuildRequest) -> CommandSpec {
    xbuild(toolchain, request, "Clean")
}

pub fn build_command(toolchain: &Toolchain, request: &BuildRequest) -> CommandSpec {
    xbuild(toolchain, request, "Build").arg(output_path_property(request))
}
