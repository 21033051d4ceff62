use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::plist::{self, Value};
use crate::types::BuildError;

/// Distribution method passed to `xcodebuild -exportArchive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportMethod {
    Development,
    AdHoc,
    Enterprise,
    AppStore,
}

impl ExportMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportMethod::Development => "development",
            ExportMethod::AdHoc => "ad-hoc",
            ExportMethod::Enterprise => "enterprise",
            ExportMethod::AppStore => "app-store",
        }
    }
}

impl fmt::Display for ExportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportMethod {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(ExportMethod::Development),
            "ad-hoc" => Ok(ExportMethod::AdHoc),
            "enterprise" => Ok(ExportMethod::Enterprise),
            "app-store" => Ok(ExportMethod::AppStore),
            other => Err(BuildError::Plist(format!(
                "unknown export method '{}', expected development, ad-hoc, enterprise or app-store",
                other
            ))),
        }
    }
}

/// Contents of an export options plist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub method: Option<ExportMethod>,
    /// Written as the string `YES`/`NO`; Mac archives have no symbols to upload.
    pub upload_symbols: Option<bool>,
}

impl ExportOptions {
    pub fn to_plist(&self) -> String {
        let mut entries = Vec::new();
        if let Some(method) = self.method {
            entries.push(("method", method.as_str()));
        }
        if let Some(upload) = self.upload_symbols {
            entries.push(("uploadSymbols", if upload { "YES" } else { "NO" }));
        }
        plist::write_string_dictionary(entries)
    }

    pub fn from_plist(xml: &str) -> Result<Self, BuildError> {
        let dict = plist::parse_dictionary(xml)?;

        let method = match dict.get("method").and_then(Value::as_str) {
            Some(method) => Some(method.parse()?),
            None => None,
        };
        let upload_symbols = dict.get("uploadSymbols").map(|v| match v {
            Value::String(s) => s.eq_ignore_ascii_case("YES"),
            other => other.is_true(),
        });

        Ok(Self {
            method,
            upload_symbols,
        })
    }

    pub fn write(&self, path: &Path) -> Result<(), BuildError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_plist())?;
        tracing::info!("export options saved at {}", path.display());
        Ok(())
    }
}
