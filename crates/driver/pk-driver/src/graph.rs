//! Build units and the graph that orders them

use crate::error::BuildError;
use crate::session::BuildSession;
use indexmap::{IndexMap, IndexSet};
use pk_arena::{Arena, Idx};
use std::path::{Path, PathBuf};

/// Unique identifier for a unit in a [`BuildGraph`]
pub type UnitId = Idx<Unit>;

/// Ordered, duplicate-free dependency names of a unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    names: IndexSet<String>,
}

impl DependencySet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dependency; returns `false` if it was already present
    pub fn add(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    /// Whether `name` is a dependency
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of dependencies
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether there are no dependencies
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for DependencySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Something that must have its dependencies built before itself
pub trait DependencyHolder {
    /// Units that must be built first
    fn dependencies(&self) -> &DependencySet;

    /// Builds every dependency, in declaration order, within `session`
    ///
    /// # Errors
    ///
    /// Propagates the first dependency build failure
    fn build_dependencies(&self, graph: &BuildGraph, session: &mut BuildSession) -> Result<(), BuildError> {
        for name in self.dependencies().iter() {
            session.build_named(graph, name)?;
        }
        Ok(())
    }
}

/// A unit bundled into one output file of its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    /// Unit name
    pub name: String,
    /// Directory whose `.php` modules are bundled
    pub source: PathBuf,
    /// File the bundle is written to
    pub output: PathBuf,
    /// Source-relative exclude patterns
    pub excludes: Vec<String>,
    /// Units built before this one
    pub dependencies: DependencySet,
}

impl Library {
    /// Library bundling `source` into `output`
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            output: output.into(),
            excludes: Vec::new(),
            dependencies: DependencySet::new(),
        }
    }

    /// Adds an exclude pattern
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into());
        self
    }

    /// Adds a dependency
    #[must_use]
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.add(name);
        self
    }
}

impl DependencyHolder for Library {
    fn dependencies(&self) -> &DependencySet {
        &self.dependencies
    }
}

/// A unit with an entry module appended after its bundled sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Unit name
    pub name: String,
    /// Directory whose `.php` modules are bundled
    pub source: PathBuf,
    /// File the bundle is written to
    pub output: PathBuf,
    /// Source-relative exclude patterns
    pub excludes: Vec<String>,
    /// Units built before this one
    pub dependencies: DependencySet,
    /// Module written last, with references left as written
    pub entry: PathBuf,
    /// Write the dependencies' bundles into this project's output as well
    pub inline_dependencies: bool,
}

impl Project {
    /// Project bundling `source` into `output`, then appending `entry`
    pub fn new(
        name: impl Into<String>,
        source: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        entry: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            output: output.into(),
            excludes: Vec::new(),
            dependencies: DependencySet::new(),
            entry: entry.into(),
            inline_dependencies: false,
        }
    }

    /// Adds an exclude pattern
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into());
        self
    }

    /// Adds a dependency
    #[must_use]
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.add(name);
        self
    }

    /// Sets whether dependency bundles are inlined
    #[must_use]
    pub fn inline_dependencies(mut self, inline: bool) -> Self {
        self.inline_dependencies = inline;
        self
    }
}

impl DependencyHolder for Project {
    fn dependencies(&self) -> &DependencySet {
        &self.dependencies
    }
}

/// A library or a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    /// A library unit
    Library(Library),
    /// A project unit
    Project(Project),
}

impl Unit {
    /// Unit name
    pub fn name(&self) -> &str {
        match self {
            Self::Library(library) => &library.name,
            Self::Project(project) => &project.name,
        }
    }

    /// Source root
    pub fn source(&self) -> &Path {
        match self {
            Self::Library(library) => &library.source,
            Self::Project(project) => &project.source,
        }
    }

    /// Output file
    pub fn output(&self) -> &Path {
        match self {
            Self::Library(library) => &library.output,
            Self::Project(project) => &project.output,
        }
    }

    /// Source-relative exclude patterns
    pub fn excludes(&self) -> &[String] {
        match self {
            Self::Library(library) => &library.excludes,
            Self::Project(project) => &project.excludes,
        }
    }

    /// Entry module of a project
    pub fn entry(&self) -> Option<&Path> {
        match self {
            Self::Library(_) => None,
            Self::Project(project) => Some(&project.entry),
        }
    }

    /// Whether this is a project that inlines its dependencies
    pub fn inlines_dependencies(&self) -> bool {
        matches!(self, Self::Project(project) if project.inline_dependencies)
    }

    /// `library` or `project`, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Library(_) => "library",
            Self::Project(_) => "project",
        }
    }
}

impl DependencyHolder for Unit {
    fn dependencies(&self) -> &DependencySet {
        match self {
            Self::Library(library) => library.dependencies(),
            Self::Project(project) => project.dependencies(),
        }
    }
}

impl From<Library> for Unit {
    fn from(library: Library) -> Self {
        Self::Library(library)
    }
}

impl From<Project> for Unit {
    fn from(project: Project) -> Self {
        Self::Project(project)
    }
}

/// Units keyed by name, in declaration order
#[derive(Debug, Default)]
pub struct BuildGraph {
    units: Arena<Unit>,
    names: IndexMap<String, UnitId>,
}

impl BuildGraph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Configuration`] if the name is already taken
    pub fn add(&mut self, unit: impl Into<Unit>) -> Result<UnitId, BuildError> {
        let unit = unit.into();
        if self.names.contains_key(unit.name()) {
            return Err(BuildError::configuration(unit.name(), "a unit with this name is already declared"));
        }
        let name = unit.name().to_string();
        let id = self.units.alloc(unit);
        self.names.insert(name, id);
        Ok(id)
    }

    /// Unit with the given id
    pub fn unit(&self, id: UnitId) -> &Unit {
        &self.units[id]
    }

    /// Id of the unit named `name`
    pub fn lookup(&self, name: &str) -> Option<UnitId> {
        self.names.get(name).copied()
    }

    /// Units in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &Unit)> {
        self.names.values().map(|&id| (id, &self.units[id]))
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no units are declared
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Checks that every dependency names a declared unit
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Configuration`] for the first unknown dependency
    pub fn validate(&self) -> Result<(), BuildError> {
        for (_, unit) in self.iter() {
            if let Some(missing) = unit.dependencies().iter().find(|name| !self.names.contains_key(*name)) {
                return Err(BuildError::configuration(
                    unit.name(),
                    format!("depends on unknown unit `{missing}`"),
                ));
            }
        }
        Ok(())
    }

    /// Every unit `id` depends on, directly or not
    pub fn transitive_dependencies(&self, id: UnitId) -> IndexSet<String> {
        let mut seen = IndexSet::new();
        let mut stack: Vec<&str> = self.unit(id).dependencies().iter().collect();
        while let Some(name) = stack.pop() {
            if !seen.insert(name.to_string()) {
                continue;
            }
            if let Some(dependency) = self.lookup(name) {
                stack.extend(self.unit(dependency).dependencies().iter());
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_set_keeps_order_and_dedups() {
        let mut set: DependencySet = ["b", "a"].into_iter().collect();
        assert!(!set.add("b"));
        assert!(set.add("c"));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_duplicate_unit_name() {
        let mut graph = BuildGraph::new();
        graph.add(Library::new("core", "src", "out.php")).unwrap();
        let error = graph.add(Library::new("core", "other", "other.php")).unwrap_err();
        assert!(matches!(error, BuildError::Configuration { ref unit, .. } if unit == "core"));
    }

    #[test]
    fn test_validate_unknown_dependency() {
        let mut graph = BuildGraph::new();
        graph.add(Library::new("app", "src", "out.php").depends_on("missing")).unwrap();
        let error = graph.validate().unwrap_err();
        assert_eq!(error.to_string(), "[app] depends on unknown unit `missing`");
    }

    #[test]
    fn test_iteration_in_declaration_order() {
        let mut graph = BuildGraph::new();
        graph.add(Library::new("zeta", "z", "z.php")).unwrap();
        graph.add(Project::new("alpha", "a", "a.php", "main.php")).unwrap();
        let names: Vec<_> = graph.iter().map(|(_, unit)| (unit.name(), unit.kind())).collect();
        assert_eq!(names, vec![("zeta", "library"), ("alpha", "project")]);
    }

    #[test]
    fn test_transitive_dependencies() {
        let mut graph = BuildGraph::new();
        graph.add(Library::new("d", "d", "d.php")).unwrap();
        graph.add(Library::new("b", "b", "b.php").depends_on("d")).unwrap();
        graph.add(Library::new("c", "c", "c.php").depends_on("d")).unwrap();
        let a = graph
            .add(Project::new("a", "a", "a.php", "main.php").depends_on("b").depends_on("c"))
            .unwrap();

        let mut closure: Vec<String> = graph.transitive_dependencies(a).into_iter().collect();
        closure.sort();
        assert_eq!(closure, vec!["b", "c", "d"]);
    }
}
