//! Solution file analysis.
//!
//! A solution (`.sln`) enumerates member projects and maps each
//! solution-level `Configuration|Platform` pair to the pair every project
//! builds with. [`SolutionFile::parse`] keeps only projects whose platform
//! API is recognized (see [`crate::api`]); shared libraries, test projects
//! and solution folders are dropped without failing the parse.
//!
//! ## Example
//!
//! ```no_run
//! use xabuild_sdk::SolutionFile;
//!
//! let solution = SolutionFile::parse("MyApp.sln")?;
//! for project in &solution.projects {
//!     if let Some(pair) = project.mapping.resolve("Release", "iPhone") {
//!         println!("{} builds as {}", project.name, pair);
//!     }
//! }
//! # Ok::<(), xabuild_sdk::BuildError>(())
//! ```

mod mapping;
mod parser;

pub use mapping::ConfigMapping;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::api;
use crate::types::{Api, BuildError};

/// A parsed solution file.
#[derive(Debug, Clone, Serialize)]
pub struct SolutionFile {
    /// Absolute path of the solution file.
    pub path: PathBuf,
    /// Recognized member projects, in declaration order.
    pub projects: Vec<ProjectDescriptor>,
    /// Solution-level `Configuration|Platform` names, in declaration order.
    pub configurations: Vec<String>,
}

/// One buildable member project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDescriptor {
    /// Project GUID, upper-cased, without braces. Empty for standalone projects.
    pub id: String,
    /// Display name from the solution, or the file stem for standalone projects.
    pub name: String,
    /// Absolute path of the project file.
    pub path: PathBuf,
    /// Platform API the project references.
    pub api: Api,
    /// Solution-level to project-level configuration mapping.
    pub mapping: ConfigMapping,
}

impl SolutionFile {
    /// Reads and parses the solution at `path`.
    ///
    /// # Errors
    ///
    /// * [`BuildError::Io`] if the file cannot be read
    /// * [`BuildError::Parse`] if a configuration line is malformed or a
    ///   section is not closed
    pub fn parse(path: impl AsRef<Path>) -> Result<Self, BuildError> {
        let path = std::path::absolute(path.as_ref())?;
        let contents = fs::read_to_string(&path)?;
        Self::parse_str(&path, &contents)
    }

    /// Parses solution text; project paths are resolved against `path`'s parent.
    pub fn parse_str(path: &Path, contents: &str) -> Result<Self, BuildError> {
        let solution = parser::SolutionParser::new(path).parse(contents)?;
        tracing::debug!(
            solution = %path.display(),
            projects = solution.projects.len(),
            configurations = solution.configurations.len(),
            "parsed solution"
        );
        Ok(solution)
    }

    /// Returns `true` if `Configuration|Platform` is declared by the solution.
    pub fn declares(&self, configuration: &str, platform: &str) -> bool {
        let key = format!("{}|{}", configuration, platform);
        self.configurations.iter().any(|c| *c == key)
    }
}

impl ProjectDescriptor {
    /// Builds a descriptor for a project file given directly on the command line.
    ///
    /// The mapping is empty, so the requested configuration and platform are
    /// used unchanged. Returns `None` if the project API is not recognized.
    pub fn standalone(path: impl AsRef<Path>) -> Result<Option<Self>, BuildError> {
        let path = std::path::absolute(path.as_ref())?;
        let Some(api) = api::detect(&path) else {
            return Ok(None);
        };
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Some(Self {
            id: String::new(),
            name,
            path,
            api,
            mapping: ConfigMapping::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConfigPair;
    use tempfile::TempDir;

    const ANDROID_ID: &str = "6C5E0D0F-2B7A-4E4E-9D1B-0A7A1B2C3D4E";
    const IOS_ID: &str = "A1B2C3D4-E5F6-4711-8899-AABBCCDDEEFF";
    const SHARED_ID: &str = "0F0E0D0C-0B0A-4909-8887-868584838281";

    fn write_project(dir: &Path, relative: &str, reference: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            format!(
                "<Project>\n  <ItemGroup>\n    <Reference Include=\"{}\" />\n  </ItemGroup>\n</Project>\n",
                reference
            ),
        )
        .unwrap();
    }

    fn fixture_solution() -> String {
        format!(
            r#"
Microsoft Visual Studio Solution File, Format Version 12.00
# Visual Studio 2013
Project("{{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}}") = "App.Droid", "Droid\App.Droid.csproj", "{{{android}}}"
EndProject
Project("{{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}}") = "App.iOS", "iOS\App.iOS.csproj", "{{{ios}}}"
	ProjectSection(ProjectDependencies) = postProject
		{{{shared}}} = {{{shared}}}
	EndProjectSection
EndProject
Project("{{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}}") = "App.Core", "Core\App.Core.csproj", "{{{shared}}}"
EndProject
Global
	GlobalSection(SolutionConfigurationPlatforms) = preSolution
		Debug|Any CPU = Debug|Any CPU
		Release|iPhone = Release|iPhone
	EndGlobalSection
	GlobalSection(ProjectConfigurationPlatforms) = postSolution
		{{{android}}}.Debug|Any CPU.ActiveCfg = Debug|Any CPU
		{{{android}}}.Debug|Any CPU.Build.0 = Debug|Any CPU
		{{{android}}}.Release|iPhone.ActiveCfg = Release|Any CPU
		{{{ios}}}.Debug|Any CPU.ActiveCfg = Debug|iPhoneSimulator
		{{{ios}}}.Release|iPhone.ActiveCfg = AppStore|iPhone
		{{{ios}}}.Release|iPhone.Build.0 = Release|iPhone
		{{{shared}}}.Debug|Any CPU.ActiveCfg = Debug|Any CPU
	EndGlobalSection
EndGlobal
"#,
            android = ANDROID_ID,
            ios = IOS_ID,
            shared = SHARED_ID,
        )
    }

    fn fixture_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_project(dir.path(), "Droid/App.Droid.csproj", "Mono.Android");
        write_project(dir.path(), "iOS/App.iOS.csproj", "Xamarin.iOS");
        write_project(dir.path(), "Core/App.Core.csproj", "System.Core");
        fs::write(dir.path().join("App.sln"), fixture_solution()).unwrap();
        dir
    }

    #[test]
    fn parses_recognized_projects_in_order() {
        let dir = fixture_dir();
        let solution = SolutionFile::parse(dir.path().join("App.sln")).unwrap();

        assert_eq!(solution.projects.len(), 2);
        assert_eq!(solution.projects[0].name, "App.Droid");
        assert_eq!(solution.projects[0].api, Api::Android);
        assert_eq!(solution.projects[0].path, dir.path().join("Droid/App.Droid.csproj"));
        assert_eq!(solution.projects[1].name, "App.iOS");
        assert_eq!(solution.projects[1].api, Api::ModernIos);
        assert!(solution.projects.iter().all(|p| p.path.is_absolute()));
    }

    #[test]
    fn collects_solution_configurations() {
        let dir = fixture_dir();
        let solution = SolutionFile::parse(dir.path().join("App.sln")).unwrap();

        assert_eq!(solution.configurations, vec!["Debug|Any CPU", "Release|iPhone"]);
        assert!(solution.declares("Release", "iPhone"));
        assert!(!solution.declares("Release", "iPhoneSimulator"));
    }

    #[test]
    fn builds_mappings_with_role_suffix_stripped() {
        let dir = fixture_dir();
        let solution = SolutionFile::parse(dir.path().join("App.sln")).unwrap();

        let android = &solution.projects[0].mapping;
        assert_eq!(
            android.resolve("Debug", "Any CPU"),
            Some(&ConfigPair::new("Debug", "AnyCPU"))
        );
        assert_eq!(
            android.resolve("Release", "iPhone"),
            Some(&ConfigPair::new("Release", "AnyCPU"))
        );

        // Build.0 comes after ActiveCfg and overwrites it
        let ios = &solution.projects[1].mapping;
        assert_eq!(
            ios.resolve("Release", "iPhone"),
            Some(&ConfigPair::new("Release", "iPhone"))
        );
        assert_eq!(ios.len(), 2);
    }

    #[test]
    fn empty_solution_has_no_projects() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Empty.sln");
        let text = "Global\n\tGlobalSection(SolutionConfigurationPlatforms) = preSolution\n\tEndGlobalSection\nEndGlobal\n";
        let solution = SolutionFile::parse_str(&path, text).unwrap();

        assert!(solution.projects.is_empty());
        assert!(solution.configurations.is_empty());
    }

    #[test]
    fn solution_with_only_unrecognized_projects_is_empty() {
        let dir = TempDir::new().unwrap();
        write_project(dir.path(), "Tests/Tests.csproj", "nunit.framework");
        let text = format!(
            "Project(\"{{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}}\") = \"Tests\", \"Tests\\Tests.csproj\", \"{{{}}}\"\nEndProject\n",
            SHARED_ID
        );
        let solution = SolutionFile::parse_str(&dir.path().join("App.sln"), &text).unwrap();
        assert!(solution.projects.is_empty());
    }

    #[test]
    fn malformed_configuration_line_is_fatal() {
        let path = PathBuf::from("/tmp/Broken.sln");
        let text = "Global\n\tGlobalSection(SolutionConfigurationPlatforms) = preSolution\n\t\tDebug|Any CPU\n\tEndGlobalSection\nEndGlobal\n";
        let err = SolutionFile::parse_str(&path, text).unwrap_err();

        match err {
            BuildError::Parse { line, reason, .. } => {
                assert_eq!(line, 3);
                assert!(reason.contains("Debug|Any CPU"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_section_is_fatal() {
        let path = PathBuf::from("/tmp/Truncated.sln");
        let text = "Global\n\tGlobalSection(ProjectConfigurationPlatforms) = postSolution\n";
        let err = SolutionFile::parse_str(&path, text).unwrap_err();
        assert!(matches!(err, BuildError::Parse { .. }));
        assert!(err.to_string().contains("ProjectConfigurationPlatforms"));
    }

    #[test]
    fn nested_section_is_fatal() {
        let path = PathBuf::from("/tmp/Nested.sln");
        let text = "Global\n\tGlobalSection(SolutionConfigurationPlatforms) = preSolution\n\tGlobalSection(ProjectConfigurationPlatforms) = postSolution\n";
        let err = SolutionFile::parse_str(&path, text).unwrap_err();
        assert!(matches!(err, BuildError::Parse { line: 3, .. }));
    }

    #[test]
    fn missing_solution_file_is_io_error() {
        let err = SolutionFile::parse("/nonexistent/App.sln").unwrap_err();
        assert!(matches!(err, BuildError::Io(_)));
    }

    #[test]
    fn standalone_project_uses_file_stem() {
        let dir = TempDir::new().unwrap();
        write_project(dir.path(), "App.Mac.csproj", "Xamarin.Mac");

        let project = ProjectDescriptor::standalone(dir.path().join("App.Mac.csproj"))
            .unwrap()
            .unwrap();
        assert_eq!(project.name, "App.Mac");
        assert_eq!(project.api, Api::Mac);
        assert!(project.mapping.is_empty());

        let none = ProjectDescriptor::standalone(dir.path().join("Missing.csproj")).unwrap();
        assert!(none.is_none());
    }
}
