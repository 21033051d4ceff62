use std::path::Path;

use crate::runner::{CommandRunner, RetryPolicy, run_checked};
use crate::solution::{ProjectDescriptor, SolutionFile};
use crate::types::{Api, BuildCommand, BuildError, BuildOutput, BuildRequest};

use super::android::AndroidBuilder;
use super::common::{Toolchain, build_command, clean_command};
use super::ios::IosBuilder;
use super::mac::MacBuilder;

/// Knobs applied to every project a dispatcher handles.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Run the `Clean` target before building.
    pub clean: bool,
    /// Only build projects whose platform or platform family is listed.
    pub platform_filter: Option<Vec<String>>,
    /// Force APK signing on or off; `None` follows the project's keystore setting.
    pub sign_apk: Option<bool>,
    /// Retry policy for the legacy `mdtool` build.
    pub retry: RetryPolicy,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            clean: true,
            platform_filter: None,
            sign_apk: None,
            retry: RetryPolicy::none(),
        }
    }
}

/// Drives clean, build and archive commands for projects and solutions.
///
/// Projects are processed one at a time, in solution order. The first
/// fatal error aborts the run.
pub struct BuildDispatcher<'a> {
    runner: &'a dyn CommandRunner,
    toolchain: &'a Toolchain,
    options: DispatchOptions,
}

impl<'a> BuildDispatcher<'a> {
    pub fn new(runner: &'a dyn CommandRunner, toolchain: &'a Toolchain, options: DispatchOptions) -> Self {
        Self {
            runner,
            toolchain,
            options,
        }
    }

    /// Builds a solution (`.sln`) or a single project file.
    pub fn run_target(
        &self,
        path: &Path,
        configuration: &str,
        platform: &str,
        command: BuildCommand,
    ) -> Result<Vec<BuildOutput>, BuildError> {
        let is_solution = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sln"));

        if is_solution {
            let solution = SolutionFile::parse(path)?;
            return self.run_solution(&solution, configuration, platform, command);
        }

        let Some(project) = ProjectDescriptor::standalone(path)? else {
            return Err(BuildError::UnsupportedCommand {
                command,
                project: path.to_path_buf(),
                reason: "project references no Android, iOS or Mac platform assembly".to_string(),
            });
        };
        let request = self.request(&project, configuration, platform, command);
        Ok(self.dispatch(&project, &request)?.into_iter().collect())
    }

    /// Builds every solution project that maps `configuration|platform`.
    ///
    /// Projects without a mapping for the pair are skipped.
    pub fn run_solution(
        &self,
        solution: &SolutionFile,
        configuration: &str,
        platform: &str,
        command: BuildCommand,
    ) -> Result<Vec<BuildOutput>, BuildError> {
        if !solution.declares(configuration, platform) {
            tracing::warn!(
                "solution {} does not declare {}|{}",
                solution.path.display(),
                configuration,
                platform
            );
        }

        let mut outputs = Vec::new();
        for project in &solution.projects {
            let Some(pair) = project.mapping.resolve(configuration, platform) else {
                tracing::debug!(
                    project = %project.name,
                    "no mapping for {}|{}, skipping",
                    configuration,
                    platform
                );
                continue;
            };
            let request = self.request(project, &pair.configuration, &pair.platform, command);
            if let Some(output) = self.dispatch(project, &request)? {
                outputs.push(output);
            }
        }
        Ok(outputs)
    }

    /// Runs clean (optional) and then build or archive for one project.
    ///
    /// Returns `Ok(None)` when the platform filter excludes the project.
    pub fn dispatch(
        &self,
        project: &ProjectDescriptor,
        request: &BuildRequest,
    ) -> Result<Option<BuildOutput>, BuildError> {
        if !self.passes_filter(project.api, &request.platform) {
            tracing::info!(
                project = %project.name,
                platform = %request.platform,
                "platform filtered out, skipping"
            );
            return Ok(None);
        }

        tracing::info!(
            "{} {} ({}|{})",
            request.command,
            project.name,
            request.configuration,
            request.platform
        );

        if request.clean {
            run_checked(self.runner, &clean_command(self.toolchain, request))?;
        }

        let output = match request.command {
            BuildCommand::Build => {
                run_checked(self.runner, &build_command(self.toolchain, request))?;
                BuildOutput {
                    project: request.project.clone(),
                    api: project.api,
                    output_root: request.output_root(),
                    artifact: None,
                    dsym: None,
                }
            }
            BuildCommand::Archive => match project.api {
                Api::Android => AndroidBuilder::new(self.runner, self.toolchain)
                    .sign_apk(self.options.sign_apk)
                    .archive(request)?,
                Api::LegacyIos | Api::ModernIos => IosBuilder::new(self.runner, self.toolchain)
                    .retry(self.options.retry)
                    .archive(project.api, request)?,
                Api::Mac => MacBuilder::new(self.runner, self.toolchain).archive(request)?,
            },
        };

        Ok(Some(output))
    }

    fn request(
        &self,
        project: &ProjectDescriptor,
        configuration: &str,
        platform: &str,
        command: BuildCommand,
    ) -> BuildRequest {
        BuildRequest {
            project: project.path.clone(),
            configuration: configuration.to_string(),
            platform: platform.to_string(),
            clean: self.options.clean,
            command,
        }
    }

    fn passes_filter(&self, api: Api, platform: &str) -> bool {
        match &self.options.platform_filter {
            None => true,
            Some(filter) => filter.iter().map(|f| f.trim()).any(|f| {
                f.eq_ignore_ascii_case(platform) || f.eq_ignore_ascii_case(api.family())
            }),
        }
    }
}
