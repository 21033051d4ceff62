//! Artifact discovery in build output trees.
//!
//! Lookups never rely on directory iteration order. [`candidates`] returns
//! every match ranked lexically by full path and [`pick`] applies an
//! explicit [`TieBreak`]. Bundle directories (`.app`, `.xcarchive`,
//! `.dSYM`) are reported but never descended into.

use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::types::BuildError;

/// How to choose between several candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak<'a> {
    /// Take the lexically smallest path.
    FirstLexical,
    /// Take the first path whose file name ends with the suffix, falling
    /// back to the lexically smallest.
    PreferSuffix(&'a str),
    /// Exactly one candidate is allowed.
    Unique,
}

/// Returned by [`pick`] when [`TieBreak::Unique`] sees more than one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguous(pub Vec<PathBuf>);

/// Outcome of a debug-symbol lookup. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DsymLookup {
    Missing,
    Found(PathBuf),
    Ambiguous(Vec<PathBuf>),
}

impl DsymLookup {
    pub fn found(self) -> Option<PathBuf> {
        match self {
            DsymLookup::Found(path) => Some(path),
            _ => None,
        }
    }
}

/// Lists entries below `root` with the given extension, at most `max_depth`
/// levels deep, sorted by full path.
///
/// A missing `root` yields an empty list.
pub fn candidates(root: &Path, extension: &str, max_depth: usize) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut entries = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next() {
        let Ok(entry) = entry else { continue };
        if !has_extension(entry.path(), extension) {
            continue;
        }
        found.push(entry.path().to_path_buf());
        if entry.file_type().is_dir() {
            entries.skip_current_dir();
        }
    }

    found.sort();
    found
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
}

/// Chooses one path out of ranked `candidates`.
pub fn pick(candidates: Vec<PathBuf>, tie_break: TieBreak<'_>) -> Result<Option<PathBuf>, Ambiguous> {
    match tie_break {
        TieBreak::FirstLexical => Ok(candidates.into_iter().next()),
        TieBreak::PreferSuffix(suffix) => {
            let preferred = candidates.iter().position(|c| {
                c.file_name()
                    .is_some_and(|name| name.to_string_lossy().ends_with(suffix))
            });
            Ok(match preferred {
                Some(index) => candidates.into_iter().nth(index),
                None => candidates.into_iter().next(),
            })
        }
        TieBreak::Unique => {
            if candidates.len() > 1 {
                Err(Ambiguous(candidates))
            } else {
                Ok(candidates.into_iter().next())
            }
        }
    }
}

/// Finds an optional artifact directly inside `root`.
///
/// Returns the canonical path of the chosen candidate, or `None` if there
/// are no candidates.
pub fn find(root: &Path, extension: &str, tie_break: TieBreak<'_>) -> Result<Option<PathBuf>, BuildError> {
    select(root, candidates(root, extension, 1), extension, tie_break)
}

/// Like [`find`], but a missing artifact is [`BuildError::ArtifactNotFound`].
pub fn locate(root: &Path, extension: &str, tie_break: TieBreak<'_>) -> Result<PathBuf, BuildError> {
    find(root, extension, tie_break)?.ok_or_else(|| not_found(root, extension))
}

/// Locates an artifact anywhere under `<project_dir>/bin` whose path has a
/// `configuration` directory, matching `bin/**/<configuration>/**/*.<ext>`.
pub fn locate_under_configuration(
    project_dir: &Path,
    configuration: &str,
    extension: &str,
    tie_break: TieBreak<'_>,
) -> Result<PathBuf, BuildError> {
    let bin = project_dir.join("bin");
    let matching = candidates(&bin, extension, usize::MAX)
        .into_iter()
        .filter(|path| in_configuration_dir(&bin, path, configuration))
        .collect();

    select(&bin, matching, extension, tie_break)?.ok_or_else(|| not_found(&bin, extension))
}

fn in_configuration_dir(bin: &Path, path: &Path, configuration: &str) -> bool {
    let Ok(relative) = path.strip_prefix(bin) else {
        return false;
    };
    relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .any(|c| matches!(c, Component::Normal(name) if name == configuration))
}

fn select(
    root: &Path,
    candidates: Vec<PathBuf>,
    extension: &str,
    tie_break: TieBreak<'_>,
) -> Result<Option<PathBuf>, BuildError> {
    match pick(candidates, tie_break) {
        Ok(Some(path)) => {
            let real = fs::canonicalize(&path)?;
            tracing::debug!(path = %real.display(), "found .{}", extension);
            Ok(Some(real))
        }
        Ok(None) => Ok(None),
        Err(Ambiguous(candidates)) => Err(BuildError::AmbiguousArtifact {
            kind: format!(".{}", extension),
            root: root.to_path_buf(),
            candidates,
        }),
    }
}

fn not_found(root: &Path, extension: &str) -> BuildError {
    BuildError::ArtifactNotFound {
        kind: format!(".{}", extension),
        root: root.to_path_buf(),
    }
}

/// Looks for exactly one `*.app.dSYM` bundle directly inside `dir`.
///
/// Zero or several bundles are logged as warnings; debug symbols are
/// optional and never fail a build.
pub fn find_dsym(dir: &Path) -> DsymLookup {
    let mut bundles: Vec<PathBuf> = candidates(dir, "dSYM", 1)
        .into_iter()
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .is_some_and(|n| n.to_string_lossy().ends_with(".app.dSYM"))
        })
        .collect();

    for bundle in &bundles {
        tracing::debug!(path = %bundle.display(), "dSYM found");
    }

    match bundles.len() {
        0 => {
            tracing::warn!(dir = %dir.display(), "no dSYM found");
            DsymLookup::Missing
        }
        1 => {
            let bundle = bundles.remove(0);
            DsymLookup::Found(fs::canonicalize(&bundle).unwrap_or(bundle))
        }
        _ => {
            tracing::warn!(dir = %dir.display(), count = bundles.len(), "multiple dSYMs found");
            DsymLookup::Ambiguous(bundles)
        }
    }
}
