//! Command implementations

use crate::manifest::Manifest;
use anyhow::Result;
use colored::Colorize;
use pk_driver::{BuildGraph, BuildSession, DependencyHolder, UnitReport};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Loaded manifest with its unit graph
pub struct Workspace {
    /// Parsed manifest
    pub manifest: Manifest,
    /// Units declared by the manifest
    pub graph: BuildGraph,
}

impl Workspace {
    /// Reads `manifest` (relative to `root`) and builds the unit graph
    pub fn load(root: &Path, manifest: &Path) -> Result<Self> {
        let manifest = Manifest::from_file(&root.join(manifest))?;
        let graph = manifest.build_graph(root)?;
        debug!(root = %root.display(), units = graph.len(), "loaded manifest");
        Ok(Self { manifest, graph })
    }
}

/// Builds the named units, or every unit when `units` is empty
pub fn build(workspace: &Workspace, units: &[String]) -> Result<BuildSession> {
    let start = Instant::now();
    let mut session = BuildSession::new(workspace.manifest.options);

    if units.is_empty() {
        session.build_all(&workspace.graph)?;
    } else {
        workspace.graph.validate()?;
        for unit in units {
            session.build_named(&workspace.graph, unit)?;
        }
    }

    for report in session.reports() {
        print_report(report);
    }
    println!(
        "{} {} units, {} files compiled ({} skipped) in {:.2}s",
        "Finished".green().bold(),
        session.reports().len(),
        session.compiled(),
        session.skipped(),
        start.elapsed().as_secs_f64()
    );

    Ok(session)
}

/// Bundles every unit in memory without writing outputs
pub fn check(workspace: &Workspace) -> Result<BuildSession> {
    let mut session = BuildSession::check(workspace.manifest.options);
    session.build_all(&workspace.graph)?;

    println!(
        "{} {} units, {} files",
        "Checked".green().bold(),
        session.reports().len(),
        session.compiled()
    );
    Ok(session)
}

/// Prints every unit with its kind and dependencies
pub fn list(workspace: &Workspace) {
    for (_, unit) in workspace.graph.iter() {
        let dependencies: Vec<&str> = unit.dependencies().iter().collect();
        let mut line = format!("{} {}", unit.name().bold(), format!("({})", unit.kind()).dimmed());
        if !dependencies.is_empty() {
            line.push_str(&format!(" -> {}", dependencies.join(", ")));
        }
        println!("{line}");
        println!("    {} {}", "output:".dimmed(), unit.output().display());
    }
}

fn print_report(report: &UnitReport) {
    println!(
        "[{}] Compiled {} files (skipped {}) in {:.2}s!",
        report.name.cyan(),
        report.compiled,
        report.skipped,
        report.elapsed.as_secs_f64()
    );
}
