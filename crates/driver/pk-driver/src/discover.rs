//! Module discovery under a unit's source root

use crate::error::BuildError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Source-root-relative exclude patterns
///
/// A pattern excludes a module when it matches the module's relative path as a
/// glob, or names a directory or file the relative path starts with.
#[derive(Debug, Clone)]
pub struct ExcludeSet {
    globs: GlobSet,
    prefixes: Vec<PathBuf>,
}

impl ExcludeSet {
    /// Compiles the given patterns; empty patterns are ignored.
    ///
    /// # Errors
    ///
    /// Returns the glob error of the first invalid pattern
    pub fn new(patterns: &[String]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        let mut prefixes = Vec::new();

        for pattern in patterns {
            let pattern = pattern.trim().trim_start_matches("./").trim_end_matches('/');
            if pattern.is_empty() {
                continue;
            }
            builder.add(Glob::new(pattern)?);
            prefixes.push(PathBuf::from(pattern));
        }

        Ok(Self {
            globs: builder.build()?,
            prefixes,
        })
    }

    /// Filter that excludes nothing
    pub fn empty() -> Self {
        Self {
            globs: GlobSet::empty(),
            prefixes: Vec::new(),
        }
    }

    /// Whether the module at `relative` (to the source root) is excluded
    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.globs.is_match(relative) || self.prefixes.iter().any(|prefix| relative.starts_with(prefix))
    }
}

/// Modules found under a source root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Module paths, sorted
    pub modules: Vec<PathBuf>,
    /// `.php` files dropped by exclude patterns
    pub skipped: usize,
}

/// Recursively collects the `.php` modules under `root`.
///
/// # Errors
///
/// Returns [`BuildError::Io`] when a directory cannot be read
pub fn discover_modules(root: &Path, excludes: &ExcludeSet) -> Result<Discovery, BuildError> {
    let mut discovery = Discovery::default();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(root).to_path_buf();
            BuildError::io(path, io::Error::from(err))
        })?;

        if !entry.file_type().is_file() || !is_php(entry.path()) {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if excludes.is_excluded(relative) {
            discovery.skipped += 1;
            continue;
        }

        discovery.modules.push(entry.into_path());
    }

    discovery.modules.sort();
    Ok(discovery)
}

fn is_php(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("php"))
}
