//! One top-level build invocation over a [`BuildGraph`]

use crate::compiler::Compiler;
use crate::discover::{ExcludeSet, discover_modules};
use crate::error::BuildError;
use crate::graph::{BuildGraph, DependencyHolder, Unit, UnitId};
use crate::options::CompilerOptions;
use indexmap::IndexSet;
use pk_bundle::artifact_header;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of building one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    /// Unit name
    pub name: String,
    /// Output file
    pub output: PathBuf,
    /// Modules bundled, plus one for a project's entry
    pub compiled: usize,
    /// `.php` files dropped by exclude patterns
    pub skipped: usize,
    /// Time spent building the unit itself
    pub elapsed: Duration,
    /// Whether the output file was written
    pub written: bool,
}

/// Memoized, cycle-checked builds of graph units
///
/// Each unit is built at most once per session; a unit reached again through
/// another dependency path is skipped.
pub struct BuildSession {
    compiler: Compiler,
    write_outputs: bool,
    built: IndexSet<String>,
    in_progress: Vec<String>,
    compiled: usize,
    skipped: usize,
    reports: Vec<UnitReport>,
    /// Written output of each unit, without the artifact header
    bodies: FxHashMap<String, String>,
    /// Each unit's own bundled sources, without inlined dependencies or entry
    sources: FxHashMap<String, String>,
}

impl BuildSession {
    /// A session that writes every unit's output file
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            compiler: Compiler::new(options),
            write_outputs: true,
            built: IndexSet::new(),
            in_progress: Vec::new(),
            compiled: 0,
            skipped: 0,
            reports: Vec::new(),
            bodies: FxHashMap::default(),
            sources: FxHashMap::default(),
        }
    }

    /// A session that bundles into memory only
    pub fn check(options: CompilerOptions) -> Self {
        Self {
            write_outputs: false,
            ..Self::new(options)
        }
    }

    /// Builds every unit in declaration order
    ///
    /// # Errors
    ///
    /// Fails on an unknown dependency or the first failing unit
    pub fn build_all(&mut self, graph: &BuildGraph) -> Result<(), BuildError> {
        graph.validate()?;
        for (id, _) in graph.iter() {
            self.build(graph, id)?;
        }
        Ok(())
    }

    /// Builds the unit called `name`, after its dependencies
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Configuration`] for an unknown unit and otherwise
    /// propagates [`BuildSession::build`] failures
    pub fn build_named(&mut self, graph: &BuildGraph, name: &str) -> Result<(), BuildError> {
        let id = graph
            .lookup(name)
            .ok_or_else(|| BuildError::configuration(name, "no unit with this name is declared"))?;
        self.build(graph, id)
    }

    /// Builds a unit and, first, its dependencies in declaration order
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::DependencyCycle`] when the unit is reached while
    /// it is still being built, and the first error of any unit otherwise.
    pub fn build(&mut self, graph: &BuildGraph, id: UnitId) -> Result<(), BuildError> {
        let unit = graph.unit(id);
        let name = unit.name();

        if self.built.contains(name) {
            debug!(unit = name, "already built, skipping");
            return Ok(());
        }
        if let Some(position) = self.in_progress.iter().position(|pending| pending == name) {
            let mut cycle = self.in_progress[position..].to_vec();
            cycle.push(name.to_string());
            return Err(BuildError::DependencyCycle { cycle });
        }

        self.in_progress.push(name.to_string());
        let result = unit
            .build_dependencies(graph, self)
            .and_then(|()| self.build_unit(graph, id, unit));
        self.in_progress.pop();

        let report = result?;
        info!(
            unit = name,
            compiled = report.compiled,
            skipped = report.skipped,
            output = %report.output.display(),
            "built unit"
        );
        self.compiled += report.compiled;
        self.skipped += report.skipped;
        self.built.insert(name.to_string());
        self.reports.push(report);
        Ok(())
    }

    fn build_unit(&mut self, graph: &BuildGraph, id: UnitId, unit: &Unit) -> Result<UnitReport, BuildError> {
        let started = Instant::now();
        let name = unit.name();

        if !unit.source().is_dir() {
            return Err(BuildError::configuration(
                name,
                format!("source root {} does not exist or is not a directory", unit.source().display()),
            ));
        }
        if let Some(entry) = unit.entry() {
            if !entry.is_file() {
                return Err(BuildError::configuration(
                    name,
                    format!("entry module {} does not exist", entry.display()),
                ));
            }
        }

        let excludes = ExcludeSet::new(unit.excludes())
            .map_err(|err| BuildError::configuration(name, format!("invalid exclude pattern: {err}")))?;
        let mut discovery = discover_modules(unit.source(), &excludes)?;
        if let Some(entry) = unit.entry() {
            discovery.modules.retain(|module| !same_file(module, entry));
        }

        let mut body = String::new();
        if unit.inlines_dependencies() {
            let dependencies = graph.transitive_dependencies(id);
            for dependency in self.built.iter().filter(|built| dependencies.contains(*built)) {
                if let Some(text) = self.sources.get(dependency) {
                    body.push_str(text);
                }
            }
        }

        let sources = self.compiler.compile_sources(name, &discovery.modules)?;
        body.push_str(&sources.text);
        let mut compiled = sources.modules;
        self.sources.insert(name.to_string(), sources.text);

        if let Some(entry) = unit.entry() {
            body.push_str(&self.compiler.compile_entry(name, entry)?);
            compiled += 1;
        }

        if self.write_outputs {
            self.write_output(name, unit.output(), &body)?;
        }
        self.bodies.insert(name.to_string(), body);

        Ok(UnitReport {
            name: name.to_string(),
            output: unit.output().to_path_buf(),
            compiled,
            skipped: discovery.skipped,
            elapsed: started.elapsed(),
            written: self.write_outputs,
        })
    }

    fn write_output(&self, unit: &str, output: &Path, body: &str) -> Result<(), BuildError> {
        if let Some(dir) = output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|err| {
                BuildError::configuration(
                    unit,
                    format!("unable to create output directory {}: {err}", dir.display()),
                )
            })?;
        }

        let mut contents = artifact_header(self.compiler.options().strict);
        contents.push_str(body);
        fs::write(output, contents).map_err(|err| BuildError::io(output, err))
    }

    /// Whether the unit called `name` has been built in this session
    pub fn is_built(&self, name: &str) -> bool {
        self.built.contains(name)
    }

    /// Built unit names in build order
    pub fn built(&self) -> impl Iterator<Item = &str> {
        self.built.iter().map(String::as_str)
    }

    /// Reports of built units, in build order
    pub fn reports(&self) -> &[UnitReport] {
        &self.reports
    }

    /// Modules compiled across all units
    pub fn compiled(&self) -> usize {
        self.compiled
    }

    /// Files skipped across all units
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Output of a built unit without the artifact header
    pub fn output_of(&self, name: &str) -> Option<&str> {
        self.bodies.get(name).map(String::as_str)
    }
}

fn same_file(left: &Path, right: &Path) -> bool {
    match (left.canonicalize(), right.canonicalize()) {
        (Ok(left), Ok(right)) => left == right,
        _ => left == right,
    }
}
