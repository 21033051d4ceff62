//! # xabuild
//!
//! CI build step for Xamarin projects and solutions.
//!
//! ## Overview
//!
//! `xabuild` is the command-line front end of `xabuild-sdk`. It:
//!
//! - **Builds** - Cleans and builds or archives every project a solution maps
//! - **Exports** - Turns `.xcarchive` bundles into IPA/PKG/APP packages
//! - **Deploys** - Copies packages and zipped dSYMs into the deploy directory
//!   and publishes their paths with `envman`
//!
//! ## Quick Start
//!
//! ```bash
//! # Archive every project mapped to Release|iPhone
//! xabuild -p MyApp.sln -c Release -l iPhone
//!
//! # Build Android projects only, without cleaning first
//! xabuild -p MyApp.sln -c Debug -l "Any CPU" -x build -i no -f android
//! ```
//!
//! ## Environment
//!
//! | Variable | Use |
//! |----------|-----|
//! | `BITRISE_DEPLOY_DIR` | Deploy directory, unless `--deploy-dir` is given |
//! | `RUST_LOG` | Log filter, overrides `--verbose` |
//!
//! Exported keys: `BITRISE_APK_PATH`, `BITRISE_IPA_PATH`, `BITRISE_DSYM_PATH`,
//! `BITRISE_APP_PATH`, `BITRISE_PKG_PATH` and `BITRISE_XAMARIN_TEST_RESULT`.
//!
//! ## Modules
//!
//! - [`config`] - Configuration file support for `xabuild.toml`
//! - [`deploy`] - Artifact deployment and CI env export

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser, ValueEnum};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use xabuild_sdk::export::{self, ExportMethod, TargetOs};
use xabuild_sdk::runner::{CommandRunner, SystemRunner};
use xabuild_sdk::{Artifact, BuildCommand, BuildDispatcher, BuildOutput, DispatchOptions, Toolchain};

pub mod config;
pub mod deploy;
mod logging;

use config::{DEFAULT_DEPLOY_DIR, DEPLOY_DIR_ENV, Settings, XabuildConfig, parse_bool};
use deploy::Deployer;

/// File name of generated export options inside the deploy directory.
const EXPORT_OPTIONS_FILE: &str = "export_options.plist";

/// Build, archive and export Xamarin projects in CI.
#[derive(Parser, Debug)]
#[command(name = "xabuild", author, version, about = "Xamarin build step for CI", long_about = None)]
struct Cli {
    /// Solution (.sln) or project file to build
    #[arg(short = 'p', long)]
    project: PathBuf,

    /// Solution configuration, e.g. Release
    #[arg(short = 'c', long)]
    configuration: Option<String>,

    /// Solution platform, e.g. iPhone
    #[arg(short = 'l', long)]
    platform: Option<String>,

    /// Run the Clean target before building (true/false, yes/no, 1/0)
    #[arg(short = 'i', long, default_value = "true", value_parser = parse_bool_arg, action = ArgAction::Set)]
    clean: bool,

    /// Comma-separated platforms or families (android, ios, macos) to build
    #[arg(short = 'f', long)]
    filter: Option<String>,

    /// Existing export options plist for archive export
    #[arg(short = 'e', long = "options")]
    export_options: Option<PathBuf>,

    /// Export method for Mac archives, or "none"
    #[arg(short = 'm', long)]
    method: Option<String>,

    /// What to do with each project
    #[arg(short = 'x', long, value_enum, default_value_t = CommandArg::Archive)]
    command: CommandArg,

    /// Sign Android packages; defaults to the project's AndroidKeyStore setting
    #[arg(short = 's', long, value_parser = parse_bool_arg)]
    sign_apk: Option<bool>,

    /// Retry the mdtool build when it hangs
    #[arg(long, value_parser = parse_bool_arg)]
    retry_on_hang: Option<bool>,

    /// Deploy directory; defaults to $BITRISE_DEPLOY_DIR
    #[arg(long)]
    deploy_dir: Option<PathBuf>,

    /// Explicit config file instead of discovering xabuild.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the build outputs as JSON
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum CommandArg {
    Build,
    Archive,
}

impl From<CommandArg> for BuildCommand {
    fn from(value: CommandArg) -> Self {
        match value {
            CommandArg::Build => BuildCommand::Build,
            CommandArg::Archive => BuildCommand::Archive,
        }
    }
}

fn parse_bool_arg(value: &str) -> Result<bool, String> {
    parse_bool(value).map_err(|e| e.to_string())
}

pub fn run() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();
    logging::init(cli.verbose);
    run_with(&cli, &SystemRunner, env::var(DEPLOY_DIR_ENV).ok())
}

/// Runs one invocation and always publishes the test-result marker.
fn run_with(cli: &Cli, runner: &dyn CommandRunner, env_deploy_dir: Option<String>) -> Result<()> {
    let settings = match resolve_settings(cli, env_deploy_dir) {
        Ok(settings) => settings,
        Err(e) => {
            let toolchain = Toolchain::default();
            export_result(&Deployer::new(runner, &toolchain, DEFAULT_DEPLOY_DIR), false);
            return Err(e);
        }
    };

    let deployer = Deployer::new(runner, &settings.toolchain, &settings.deploy_dir);
    let result = execute(cli, &settings, runner, &deployer);
    export_result(&deployer, result.is_ok());
    result
}

fn resolve_settings(cli: &Cli, env_deploy_dir: Option<String>) -> Result<Settings> {
    let config = match &cli.config {
        Some(path) => Some(XabuildConfig::load_from_file(path)?),
        None => XabuildConfig::discover()?.map(|(config, path)| {
            tracing::debug!("using config file {}", path.display());
            config
        }),
    };
    Settings::resolve(
        cli.deploy_dir.clone(),
        cli.retry_on_hang,
        env_deploy_dir,
        config.as_ref(),
    )
}

fn export_result(deployer: &Deployer<'_>, succeeded: bool) {
    let marker = if succeeded { "succeeded" } else { "failed" };
    if let Err(e) = deployer.export_env(deploy::TEST_RESULT_KEY, marker) {
        tracing::warn!("{:#}", e);
    }
}

/// Validated build inputs.
#[derive(Debug, Clone, PartialEq)]
struct Inputs {
    project: PathBuf,
    configuration: String,
    platform: String,
    command: BuildCommand,
    platform_filter: Option<Vec<String>>,
    mac_method: Option<ExportMethod>,
}

fn validate(cli: &Cli) -> Result<Inputs> {
    if !cli.project.exists() {
        bail!("No project file found at {:?}", cli.project);
    }
    let configuration = non_empty(cli.configuration.as_deref())
        .ok_or_else(|| anyhow!("No configuration specified (--configuration)"))?;
    let platform = non_empty(cli.platform.as_deref())
        .ok_or_else(|| anyhow!("No platform specified (--platform)"))?;

    let platform_filter = cli.filter.as_deref().and_then(parse_filter);
    let mac_method = match non_empty(cli.method.as_deref()) {
        None | Some("none") => None,
        Some(method) => Some(method.parse::<ExportMethod>().context("Invalid --method")?),
    };

    Ok(Inputs {
        project: cli.project.clone(),
        configuration: configuration.to_string(),
        platform: platform.to_string(),
        command: cli.command.into(),
        platform_filter,
        mac_method,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_filter(raw: &str) -> Option<Vec<String>> {
    let entries: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if entries.is_empty() { None } else { Some(entries) }
}

fn execute(cli: &Cli, settings: &Settings, runner: &dyn CommandRunner, deployer: &Deployer<'_>) -> Result<()> {
    let inputs = validate(cli)?;
    tracing::info!(
        project = %inputs.project.display(),
        configuration = %inputs.configuration,
        platform = %inputs.platform,
        command = %inputs.command,
        "configs"
    );

    let options = DispatchOptions {
        clean: cli.clean,
        platform_filter: inputs.platform_filter.clone(),
        sign_apk: cli.sign_apk,
        retry: settings.retry,
    };
    let outputs = BuildDispatcher::new(runner, &settings.toolchain, options)
        .run_target(&inputs.project, &inputs.configuration, &inputs.platform, inputs.command)
        .context("Build failed")?;

    if outputs.is_empty() {
        tracing::warn!(
            "no project was built for {}|{}",
            inputs.configuration,
            inputs.platform
        );
    }

    for output in &outputs {
        publish(output, cli, &inputs, settings, runner, deployer)?;
    }

    if let Some(path) = &cli.summary {
        write_summary(path, &outputs)?;
    }
    Ok(())
}

/// Deploys one build output and exports its paths.
fn publish(
    output: &BuildOutput,
    cli: &Cli,
    inputs: &Inputs,
    settings: &Settings,
    runner: &dyn CommandRunner,
    deployer: &Deployer<'_>,
) -> Result<()> {
    let Some(artifact) = &output.artifact else {
        return Ok(());
    };

    match artifact {
        Artifact::XcArchive(archive) => {
            let target = TargetOs::from_api(output.api)
                .ok_or_else(|| anyhow!("{} projects do not produce archives", output.api))?;

            let options_path = match &cli.export_options {
                Some(path) => path.clone(),
                None => {
                    let options = export::generate_export_options(
                        runner,
                        &settings.toolchain,
                        archive,
                        target,
                        inputs.mac_method,
                    )
                    .context("Failed to create export options")?;
                    let path = settings.deploy_dir.join(EXPORT_OPTIONS_FILE);
                    options.write(&path)?;
                    path
                }
            };

            let exported = export::export_archive(runner, &settings.toolchain, archive, &options_path, target)
                .with_context(|| format!("Failed to export {}", archive.display()))?;
            deploy_package(exported.artifact(), deployer)?;

            if target == TargetOs::Ios
                && let Some(dsym) = export::archive_dsym(archive)
            {
                let zip = deployer.deploy_dsym(&dsym)?;
                deployer.export_path(deploy::DSYM_PATH_KEY, &zip)?;
            }
        }
        package => {
            deploy_package(package, deployer)?;
            if let Some(dsym) = &output.dsym {
                let zip = deployer.deploy_dsym(dsym)?;
                deployer.export_path(deploy::DSYM_PATH_KEY, &zip)?;
            }
        }
    }
    Ok(())
}

fn deploy_package(artifact: &Artifact, deployer: &Deployer<'_>) -> Result<()> {
    let (key, deployed) = match artifact {
        Artifact::Apk(path) => (deploy::APK_PATH_KEY, deployer.deploy_file(path)?),
        Artifact::Ipa(path) => (deploy::IPA_PATH_KEY, deployer.deploy_file(path)?),
        Artifact::Pkg(path) => (deploy::PKG_PATH_KEY, deployer.deploy_file(path)?),
        Artifact::App(path) => (deploy::APP_PATH_KEY, deployer.deploy_bundle(path)?),
        Artifact::XcArchive(path) => bail!("archive {:?} must be exported before deployment", path),
    };
    deployer.export_path(key, &deployed)
}

fn write_summary(path: &Path, outputs: &[BuildOutput]) -> Result<()> {
    let json = serde_json::to_string_pretty(outputs).context("Failed to serialize build summary")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    fs::write(path, json).with_context(|| format!("Failed to write summary to {:?}", path))?;
    tracing::info!("summary written to {}", path.display());
    Ok(())
}

fn load_dotenv() {
    if let Some(root) = repo_root() {
        let _ = dotenvy::from_path(root.join(".env.local"));
    }
}

fn repo_root() -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    let root = cwd
        .ancestors()
        .find(|candidate| candidate.join(".git").exists())
        .map(Path::to_path_buf);
    Some(root.unwrap_or(cwd))
}
