//! Manifest parsing for `phpack.toml`

use anyhow::{Context, Result};
use indexmap::IndexMap;
use pk_driver::{BuildError, BuildGraph, CompilerOptions, Library, Project};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Bundling manifest
///
/// Libraries and projects are kept in separate maps, so the unit order of the
/// manifest is libraries before projects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Options applied to every unit
    #[serde(default)]
    pub options: CompilerOptions,

    /// Libraries, in declaration order
    #[serde(default)]
    pub library: IndexMap<String, LibraryEntry>,

    /// Projects, in declaration order
    #[serde(default)]
    pub project: IndexMap<String, ProjectEntry>,
}

/// `[library.<name>]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LibraryEntry {
    /// Source root, relative to the manifest directory
    pub source: PathBuf,

    /// Output file, relative to the manifest directory
    pub output: PathBuf,

    /// Exclude patterns, relative to the source root
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Units built before this one
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// `[project.<name>]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectEntry {
    /// Directory whose `.php` modules are bundled
    pub source: PathBuf,

    /// File the bundle is written to
    pub output: PathBuf,

    /// Entry module, relative to the source root
    pub entry: PathBuf,

    /// Source-relative exclude patterns
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Units built before this one
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Also write the dependencies' bundles into this project's output
    #[serde(default)]
    pub inline_dependencies: bool,
}

impl Manifest {
    /// Default manifest file name
    pub const FILE_NAME: &'static str = "phpack.toml";

    /// Load manifest from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest file: {}", path.display()))?;

        Self::parse(&contents).with_context(|| format!("Failed to parse manifest file: {}", path.display()))
    }

    /// Parse manifest text
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Find manifest in a directory (looks for `phpack.toml`)
    pub fn find_in_dir(dir: &Path) -> Result<Self> {
        Self::from_file(&dir.join(Self::FILE_NAME))
    }

    /// Number of declared units
    pub fn len(&self) -> usize {
        self.library.len() + self.project.len()
    }

    /// Whether no units are declared
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the unit graph, resolving relative paths against `root`.
    ///
    /// Manifest order is every library, then every project, each kind in the
    /// order its tables appear. Tables of the two kinds interleaved in the file
    /// do not interleave in the graph; dependencies still build first.
    ///
    /// # Errors
    ///
    /// Fails when a library and a project share a name.
    pub fn build_graph(&self, root: &Path) -> Result<BuildGraph, BuildError> {
        let mut graph = BuildGraph::new();

        for (name, entry) in &self.library {
            let source = root.join(&entry.source);
            let mut library = Library::new(name, source, root.join(&entry.output));
            library.excludes.clone_from(&entry.exclude);
            library.dependencies = entry.dependencies.iter().cloned().collect();
            graph.add(library)?;
        }

        for (name, entry) in &self.project {
            let source = root.join(&entry.source);
            let mut project = Project::new(name, &source, root.join(&entry.output), source.join(&entry.entry))
                .inline_dependencies(entry.inline_dependencies);
            project.excludes.clone_from(&entry.exclude);
            project.dependencies = entry.dependencies.iter().cloned().collect();
            graph.add(project)?;
        }

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pk_driver::{DependencyHolder, MagicConstantMode};

    const MANIFEST: &str = r#"
        [options]
        strict = false
        file-constant = "reject"

        [library.math]
        source = "vendor/math"
        output = "build/math.php"
        exclude = ["stubs"]

        [project.app]
        source = "src"
        output = "build/app.php"
        entry = "main.php"
        dependencies = ["math"]
        inline-dependencies = true
    "#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert!(!manifest.options.strict);
        assert_eq!(manifest.options.file_constant, MagicConstantMode::Reject);
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.library["math"].exclude, vec!["stubs"]);
        assert!(manifest.project["app"].inline_dependencies);
    }

    #[test]
    fn test_build_graph_resolves_paths() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let graph = manifest.build_graph(Path::new("/work")).unwrap();

        let units: Vec<_> = graph.iter().map(|(_, unit)| unit.name()).collect();
        assert_eq!(units, vec!["math", "app"]);

        let app = graph.unit(graph.lookup("app").unwrap());
        assert_eq!(app.source(), Path::new("/work/src"));
        assert_eq!(app.entry(), Some(Path::new("/work/src/main.php")));
        assert_eq!(app.output(), Path::new("/work/build/app.php"));
        assert!(app.inlines_dependencies());
        assert_eq!(app.dependencies().iter().collect::<Vec<_>>(), vec!["math"]);
    }

    #[test]
    fn test_libraries_precede_projects() {
        let manifest = Manifest::parse(
            r#"
            [project.site]
            source = "site"
            output = "site.php"
            entry = "index.php"

            [library.zeta]
            source = "zeta"
            output = "zeta.php"

            [project.admin]
            source = "admin"
            output = "admin.php"
            entry = "index.php"

            [library.alpha]
            source = "alpha"
            output = "alpha.php"
            "#,
        )
        .unwrap();
        let graph = manifest.build_graph(Path::new(".")).unwrap();

        let units: Vec<_> = graph.iter().map(|(_, unit)| unit.name()).collect();
        assert_eq!(units, vec!["zeta", "alpha", "site", "admin"]);
    }

    #[test]
    fn test_unit_name_clash() {
        let manifest = Manifest::parse(
            r#"
            [library.core]
            source = "a"
            output = "a.php"

            [project.core]
            source = "b"
            output = "b.php"
            entry = "main.php"
            "#,
        )
        .unwrap();
        assert!(manifest.build_graph(Path::new(".")).is_err());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let error = Manifest::parse("[library.x]\nsource = \"a\"\noutput = \"b\"\nminify = true\n").unwrap_err();
        assert!(error.to_string().contains("minify"));
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::parse("").unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.options, CompilerOptions::default());
    }
}
