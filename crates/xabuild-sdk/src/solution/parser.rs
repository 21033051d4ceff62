//! Line-oriented solution file parser.
//!
//! A solution file is parsed in a single forward pass. The parser is a small
//! state machine with one handler per state:
//!
//! ```text
//! Outside ──Project(..)──────────────────────────────▶ InProject ──EndProject──▶ Outside
//! Outside ──GlobalSection(SolutionConfigurationPlatforms)──▶ InSolutionConfigs ──EndGlobalSection──▶ Outside
//! Outside ──GlobalSection(ProjectConfigurationPlatforms)───▶ InProjectConfigs  ──EndGlobalSection──▶ Outside
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::{ConfigMapping, ProjectDescriptor, SolutionFile};
use crate::api;
use crate::types::{BuildError, ConfigPair};

const SOLUTION_CONFIGS_START: &str = "GlobalSection(SolutionConfigurationPlatforms) = preSolution";
const PROJECT_CONFIGS_START: &str = "GlobalSection(ProjectConfigurationPlatforms) = postSolution";
const SECTION_START: &str = "GlobalSection(";
const SECTION_END: &str = "EndGlobalSection";
const PROJECT_END: &str = "EndProject";

// Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "App.Droid", "Droid\App.Droid.csproj", "{6C5E0D0F-...}"
static PROJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*Project\("\{(?P<type_id>[^}]*)\}"\)\s*=\s*"(?P<name>[^"]*)"\s*,\s*"(?P<path>[^"]*)"\s*,\s*"\{(?P<id>[^}]*)\}""#,
    )
    .expect("valid regex")
});

// {6C5E0D0F-...}.Release|iPhone.Build.0 = Release|iPhone
static PROJECT_CONFIG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\{(?P<id>[^}]*)\}\.(?P<key>[^=]+?)\s*=\s*(?P<value>.*)$").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Outside,
    InProject,
    InSolutionConfigs,
    InProjectConfigs,
}

impl ParserState {
    fn describe(&self) -> &'static str {
        match self {
            ParserState::Outside => "top level",
            ParserState::InProject => "Project block",
            ParserState::InSolutionConfigs => "SolutionConfigurationPlatforms section",
            ParserState::InProjectConfigs => "ProjectConfigurationPlatforms section",
        }
    }
}

pub(super) struct SolutionParser<'a> {
    path: &'a Path,
    base_dir: PathBuf,
    state: ParserState,
    line_no: usize,
    projects: Vec<ProjectDescriptor>,
    configurations: Vec<String>,
    mappings: HashMap<String, ConfigMapping>,
}

impl<'a> SolutionParser<'a> {
    /// `path` should be absolute; project paths are resolved against its parent.
    pub(super) fn new(path: &'a Path) -> Self {
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            path,
            base_dir,
            state: ParserState::Outside,
            line_no: 0,
            projects: Vec::new(),
            configurations: Vec::new(),
            mappings: HashMap::new(),
        }
    }

    pub(super) fn parse(mut self, contents: &str) -> Result<SolutionFile, BuildError> {
        for line in contents.lines() {
            self.line_no += 1;
            self.state = match self.state {
                ParserState::Outside => self.outside(line),
                ParserState::InProject => self.in_project(line),
                ParserState::InSolutionConfigs => self.in_solution_configs(line)?,
                ParserState::InProjectConfigs => self.in_project_configs(line)?,
            };
        }

        if self.state != ParserState::Outside {
            return Err(self.error(format!(
                "unexpected end of file inside {}",
                self.state.describe()
            )));
        }

        let mut mappings = self.mappings;
        let projects = self
            .projects
            .into_iter()
            .map(|mut project| {
                project.mapping = mappings.remove(&project.id).unwrap_or_default();
                project
            })
            .collect();

        Ok(SolutionFile {
            path: self.path.to_path_buf(),
            projects,
            configurations: self.configurations,
        })
    }

    fn outside(&mut self, line: &str) -> ParserState {
        if let Some(caps) = PROJECT_RE.captures(line) {
            let relative = caps["path"].trim().replace('\\', "/");
            let project_path = self.base_dir.join(relative);

            match api::detect(&project_path) {
                Some(api) => {
                    tracing::debug!(
                        project = %project_path.display(),
                        api = %api,
                        "found project"
                    );
                    self.projects.push(ProjectDescriptor {
                        id: normalize_id(&caps["id"]),
                        name: caps["name"].to_string(),
                        path: project_path,
                        api,
                        mapping: ConfigMapping::new(),
                    });
                }
                None => {
                    tracing::debug!(
                        project = %project_path.display(),
                        "skipping project with no supported platform reference"
                    );
                }
            }
            return ParserState::InProject;
        }

        if line.contains(SOLUTION_CONFIGS_START) {
            ParserState::InSolutionConfigs
        } else if line.contains(PROJECT_CONFIGS_START) {
            ParserState::InProjectConfigs
        } else {
            ParserState::Outside
        }
    }

    fn in_project(&mut self, line: &str) -> ParserState {
        if line.trim() == PROJECT_END {
            ParserState::Outside
        } else {
            ParserState::InProject
        }
    }

    fn in_solution_configs(&mut self, line: &str) -> Result<ParserState, BuildError> {
        if line.contains(SECTION_END) {
            return Ok(ParserState::Outside);
        }
        if line.contains(SECTION_START) {
            return Err(self.error("GlobalSection opened before EndGlobalSection"));
        }
        if line.trim().is_empty() {
            return Ok(ParserState::InSolutionConfigs);
        }

        let config = line
            .split_once('=')
            .map(|(_, rhs)| rhs.trim())
            .filter(|rhs| !rhs.is_empty())
            .ok_or_else(|| self.error(format!("failed to parse configuration: {}", line.trim())))?;
        self.configurations.push(config.to_string());

        Ok(ParserState::InSolutionConfigs)
    }

    fn in_project_configs(&mut self, line: &str) -> Result<ParserState, BuildError> {
        if line.contains(SECTION_END) {
            return Ok(ParserState::Outside);
        }
        if line.contains(SECTION_START) {
            return Err(self.error("GlobalSection opened before EndGlobalSection"));
        }

        let Some(caps) = PROJECT_CONFIG_RE.captures(line) else {
            return Ok(ParserState::InProjectConfigs);
        };

        // Drop the role suffix: "Release|iPhone.Build.0" -> "Release|iPhone"
        let key = caps["key"].trim();
        let key = key.split_once('.').map_or(key, |(head, _)| head);
        let value: String = caps["value"].chars().filter(|c| !c.is_whitespace()).collect();

        match value.parse::<ConfigPair>() {
            Ok(pair) => {
                self.mappings
                    .entry(normalize_id(&caps["id"]))
                    .or_default()
                    .insert(key, pair);
            }
            Err(_) => {
                tracing::debug!(line = self.line_no, value = %value, "ignoring project configuration without platform");
            }
        }

        Ok(ParserState::InProjectConfigs)
    }

    fn error(&self, reason: impl Into<String>) -> BuildError {
        BuildError::Parse {
            path: self.path.to_path_buf(),
            line: self.line_no,
            reason: reason.into(),
        }
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_ascii_uppercase()
}
