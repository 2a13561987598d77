//! Checked-in fixture projects
//!
//! Each directory under `test-projects/` holds a `phpack.toml`, its sources
//! and an `expected/` directory. Every file in `expected/` must equal the file
//! of the same name under the project's `build/` directory after a full build.

use anyhow::{Context, Result, bail};
use phpack::manifest::Manifest;
use pk_driver::BuildSession;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Directory holding the fixture projects
pub fn projects_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test-projects")
}

/// Fixture project directories, sorted by name
pub fn fixture_projects() -> Result<Vec<PathBuf>> {
    let mut projects = Vec::new();
    for entry in fs::read_dir(projects_dir()).context("Failed to read test-projects directory")? {
        let path = entry?.path();
        if path.join(Manifest::FILE_NAME).is_file() {
            projects.push(path);
        }
    }
    projects.sort();
    Ok(projects)
}

/// Builds a copy of `project` and compares every expected output
///
/// Returns the names of the compared outputs.
pub fn check_fixture(project: &Path) -> Result<Vec<String>> {
    let workspace = TempDir::new()?;
    copy_dir(project, workspace.path())?;

    let manifest = Manifest::find_in_dir(workspace.path())?;
    let graph = manifest.build_graph(workspace.path())?;
    BuildSession::new(manifest.options).build_all(&graph)?;

    let expected_dir = project.join("expected");
    let mut compared = Vec::new();
    for entry in fs::read_dir(&expected_dir)
        .with_context(|| format!("Missing expected outputs in {}", expected_dir.display()))?
    {
        let expected_path = entry?.path();
        let name = expected_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        let expected = fs::read_to_string(&expected_path)?;
        let actual = fs::read_to_string(workspace.path().join("build").join(&name))
            .with_context(|| format!("Output {name} was not written"))?;

        if actual != expected {
            bail!("Output {name} differs\n--- expected\n{expected}\n--- actual\n{actual}");
        }
        compared.push(name);
    }

    compared.sort();
    Ok(compared)
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(from)?;
        if relative.starts_with("expected") || relative.starts_with("build") {
            continue;
        }

        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
