//! Xamarin build orchestration for CI
//!
//! `xabuild-sdk` builds and packages Xamarin Android, iOS and Mac projects by
//! driving the platform build tools (`xbuild`, `mdtool`, `xcrun`,
//! `xcodebuild`). It reads solution files to find buildable projects and
//! their configuration mappings, runs the right command sequence per
//! project, and locates the produced packages.
//!
//! # Architecture
//!
//! - **Solution**: Parses `.sln` files into [`SolutionFile`] and [`ProjectDescriptor`]s
//! - **API detection**: Classifies project files by platform assembly ([`api`])
//! - **Builders**: Issues clean/build/archive commands per API ([`builders`])
//! - **Artifacts**: Ranked artifact lookup with explicit tie-breaks ([`artifacts`])
//! - **Export**: Export options and `.xcarchive` export ([`export`])
//! - **Runner**: The external process seam ([`runner`])
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use xabuild_sdk::builders::{BuildDispatcher, DispatchOptions, Toolchain};
//! use xabuild_sdk::runner::SystemRunner;
//! use xabuild_sdk::{Artifact, BuildCommand};
//!
//! fn main() -> Result<(), xabuild_sdk::BuildError> {
//!     let toolchain = Toolchain::default();
//!     let dispatcher = BuildDispatcher::new(&SystemRunner, &toolchain, DispatchOptions::default());
//!
//!     for output in dispatcher.run_target(Path::new("MyApp.sln"), "Release", "iPhone", BuildCommand::Archive)? {
//!         if let Some(Artifact::Ipa(ipa)) = &output.artifact {
//!             println!("{}", ipa.display());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod artifacts;
pub mod builders;
pub mod export;
pub mod runner;
pub mod solution;
pub mod types;

pub use builders::{BuildDispatcher, DispatchOptions, Toolchain};
pub use runner::{CommandRunner, RetryPolicy, SystemRunner};
pub use solution::{ConfigMapping, ProjectDescriptor, SolutionFile};
pub use types::{Api, Artifact, BuildCommand, BuildError, BuildOutput, BuildRequest, ConfigPair};

/// Library version, matching `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
