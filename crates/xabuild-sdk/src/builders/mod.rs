//! Build automation for Xamarin projects.
//!
//! This module issues the external build commands for each project flavor
//! and locates what they produced.
//!
//! ## Overview
//!
//! Every project goes through the same steps:
//!
//! 1. **Filter** - Skip projects excluded by the platform filter
//! 2. **Clean** - Optionally run the `Clean` target
//! 3. **Build or archive** - Compile, or produce a distributable package
//! 4. **Locate** - Find the package and debug symbols in the output tree
//!
//! ## Builders
//!
//! | Builder | API | Tool | Output |
//! |---------|-----|------|--------|
//! | [`AndroidBuilder`] | `Mono.Android` | `xbuild` | APK |
//! | [`IosBuilder`] | `monotouch` | `mdtool` + `xcrun` | IPA |
//! | [`IosBuilder`] | `Xamarin.iOS` | `xbuild` | IPA or xcarchive |
//! | [`MacBuilder`] | `Xamarin.Mac` | `xbuild` | xcarchive, PKG or APP |
//!
//! [`BuildDispatcher`] picks the builder from the detected API and expands
//! solutions into per-project requests.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use xabuild_sdk::builders::{BuildDispatcher, DispatchOptions, Toolchain};
//! use xabuild_sdk::runner::SystemRunner;
//! use xabuild_sdk::BuildCommand;
//!
//! let toolchain = Toolchain::default();
//! let dispatcher = BuildDispatcher::new(&SystemRunner, &toolchain, DispatchOptions::default());
//! let outputs = dispatcher.run_target(
//!     Path::new("MyApp.sln"),
//!     "Release",
//!     "iPhone",
//!     BuildCommand::Archive,
//! )?;
//! # Ok::<(), xabuild_sdk::BuildError>(())
//! ```

pub mod android;
mod common;
mod dispatcher;
pub mod ios;
pub mod mac;

pub use android::AndroidBuilder;
pub use common::{DEFAULT_MDTOOL, Toolchain, build_command, clean_command};
pub use dispatcher::{BuildDispatcher, DispatchOptions};
pub use ios::IosBuilder;
pub use mac::MacBuilder;
