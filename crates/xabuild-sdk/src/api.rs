//! Project API detection.
//!
//! A Xamarin project file declares its platform through an assembly
//! reference such as `<Reference Include="Mono.Android" />`. Detection is a
//! plain substring check; real project files reference at most one of the
//! platform assemblies.

use std::fs;
use std::path::Path;

use crate::types::Api;

/// Markers checked in order; the first hit wins.
const API_MARKERS: [(&str, Api); 4] = [
    (r#"Include="Mono.Android""#, Api::Android),
    (r#"Include="monotouch""#, Api::LegacyIos),
    (r#"Include="Xamarin.iOS""#, Api::ModernIos),
    (r#"Include="Xamarin.Mac""#, Api::Mac),
];

/// Classifies the project file at `project_path`.
///
/// Returns `None` when the file does not exist, cannot be read, or
/// references none of the known platform assemblies.
pub fn detect(project_path: &Path) -> Option<Api> {
    if !project_path.is_file() {
        return None;
    }
    let contents = fs::read_to_string(project_path).ok()?;
    detect_str(&contents)
}

/// Classifies project file contents that are already in memory.
pub fn detect_str(contents: &str) -> Option<Api> {
    API_MARKERS
        .iter()
        .find(|(marker, _)| contents.contains(marker))
        .map(|(_, api)| *api)
}

/// Returns `true` when the Android project signs its APK for the given pair.
///
/// Looks for a `PropertyGroup` conditioned on
/// `'$(Configuration)|$(Platform)' == '<configuration>|<platform>'` that sets
/// `<AndroidKeyStore>True</AndroidKeyStore>`. Unreadable or malformed project
/// files are treated as unsigned.
pub fn android_signing_configured(project_path: &Path, configuration: &str, platform: &str) -> bool {
    let Ok(contents) = fs::read_to_string(project_path) else {
        return false;
    };
    android_signing_configured_str(&contents, configuration, platform)
}

fn android_signing_configured_str(contents: &str, configuration: &str, platform: &str) -> bool {
    let Ok(doc) = roxmltree::Document::parse(contents) else {
        tracing::debug!("project file is not well-formed XML, assuming unsigned APK");
        return false;
    };
    let wanted = format!("{}|{}", configuration, platform);

    doc.descendants()
        .filter(|n| n.has_tag_name("PropertyGroup"))
        .filter(|group| {
            group
                .attribute("Condition")
                .and_then(condition_pair)
                .is_some_and(|pair| pair == wanted)
        })
        .flat_map(|group| group.children())
        .filter(|n| n.has_tag_name("AndroidKeyStore"))
        .any(|n| n.text().is_some_and(|t| t.trim().eq_ignore_ascii_case("true")))
}

/// Extracts `Debug|AnyCPU` from ` '$(Configuration)|$(Platform)' == 'Debug|AnyCPU' `.
fn condition_pair(condition: &str) -> Option<&str> {
    let (lhs, rhs) = condition.split_once("==")?;
    if !lhs.contains("$(Configuration)|$(Platform)") {
        return None;
    }
    Some(rhs.trim().trim_matches('\''))
}
