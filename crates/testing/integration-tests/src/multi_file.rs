//! Multi-file test infrastructure for integration testing.
//!
//! A [`MultiFileProject`] is a set of PHP modules plus a `phpack.toml`
//! written into a temporary directory, built with a fresh
//! [`BuildSession`], and checked against the expected bundles or build
//! error.

use phpack::manifest::Manifest;
use pk_driver::BuildSession;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Result of running a multi-file test
#[derive(Debug)]
pub enum TestResult {
    /// Test passed successfully
    Pass,
    /// Test failed with a reason
    Fail {
        /// Why the test failed
        reason: String,
    },
}

/// Expected result from a multi-file test
#[derive(Debug, Clone)]
pub enum ExpectedResult {
    /// The build succeeds and writes exactly these outputs
    Success {
        /// Expected output paths and their contents
        outputs: Vec<(PathBuf, String)>,
    },
    /// The build fails with an error whose message contains every pattern
    BuildError {
        /// Substrings the error message must contain
        patterns: Vec<String>,
    },
}

/// A multi-file test project
#[derive(Debug)]
pub struct MultiFileProject {
    /// Name of the test project
    pub name: String,
    /// Source files by path relative to the project root
    pub files: BTreeMap<PathBuf, String>,
    /// Contents of `phpack.toml`
    pub manifest: String,
    /// Expected result from running the test
    pub expected: ExpectedResult,
}

/// A project that was written and built
pub struct BuiltProject {
    /// Keeps the project directory alive
    pub dir: TempDir,
    /// Session used for the build
    pub session: BuildSession,
}

impl BuiltProject {
    /// Reads a written output, relative to the project root
    pub fn read(&self, relative: impl AsRef<Path>) -> Option<String> {
        fs::read_to_string(self.dir.path().join(relative)).ok()
    }
}

impl MultiFileProject {
    /// Creates a new multi-file test project with the given name
    ///
    /// # Examples
    ///
    /// ```
    /// # use integration_tests::multi_file::MultiFileProject;
    /// let project = MultiFileProject::new("my-test-project");
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
            manifest: String::new(),
            expected: ExpectedResult::Success { outputs: Vec::new() },
        }
    }

    /// Adds a file to the test project
    ///
    /// # Examples
    ///
    /// ```
    /// # use integration_tests::multi_file::MultiFileProject;
    /// let mut project = MultiFileProject::new("test");
    /// project.add_file("src/Lib/Greeter.php", "<?php\nnamespace Lib;\nclass Greeter {}\n");
    /// ```
    pub fn add_file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    /// Sets the manifest written as `phpack.toml`
    pub fn set_manifest(&mut self, manifest: impl Into<String>) {
        self.manifest = manifest.into();
    }

    /// Expects the build to succeed and write `output` to `path`
    ///
    /// Can be called once per output file.
    pub fn expect_output(&mut self, path: impl Into<PathBuf>, output: impl Into<String>) {
        let entry = (path.into(), output.into());
        match &mut self.expected {
            ExpectedResult::Success { outputs } => outputs.push(entry),
            ExpectedResult::BuildError { .. } => {
                self.expected = ExpectedResult::Success { outputs: vec![entry] };
            }
        }
    }

    /// Sets the expected build error patterns
    ///
    /// # Examples
    ///
    /// ```
    /// # use integration_tests::multi_file::MultiFileProject;
    /// let mut project = MultiFileProject::new("test");
    /// project.expect_errors(vec!["dependency cycle".to_string()]);
    /// ```
    pub fn expect_errors(&mut self, patterns: Vec<String>) {
        self.expected = ExpectedResult::BuildError { patterns };
    }

    /// Writes the project into a temporary directory and builds every unit
    ///
    /// # Errors
    ///
    /// Returns the rendered manifest or build error.
    pub fn build(&self) -> Result<BuiltProject, String> {
        let dir = TempDir::new().map_err(|error| format!("Failed to create temporary directory: {error}"))?;
        let root = dir.path();

        for (path, content) in &self.files {
            let full_path = root.join(path);
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|error| format!("Failed to create directory {}: {error}", parent.display()))?;
            }
            fs::write(&full_path, content)
                .map_err(|error| format!("Failed to write {}: {error}", full_path.display()))?;
        }
        fs::write(root.join(Manifest::FILE_NAME), &self.manifest)
            .map_err(|error| format!("Failed to write manifest: {error}"))?;

        let manifest = Manifest::parse(&self.manifest).map_err(|error| format!("{error:#}"))?;
        let graph = manifest.build_graph(root).map_err(|error| error.to_string())?;
        let mut session = BuildSession::new(manifest.options);
        session.build_all(&graph).map_err(|error| error.to_string())?;

        Ok(BuiltProject { dir, session })
    }

    /// Runs the multi-file test project
    ///
    /// Returns `TestResult::Pass` if the outcome matches the expectation, or
    /// `TestResult::Fail` with a reason if it does not.
    #[must_use]
    pub fn run(&self) -> TestResult {
        match (&self.expected, self.build()) {
            (ExpectedResult::Success { outputs }, Ok(built)) => {
                for (path, expected) in outputs {
                    let Some(actual) = built.read(path) else {
                        return TestResult::Fail {
                            reason: format!("{}: output {} was not written", self.name, path.display()),
                        };
                    };
                    if &actual != expected {
                        return TestResult::Fail {
                            reason: format!(
                                "{}: output {} differs\n--- expected\n{expected}\n--- actual\n{actual}",
                                self.name,
                                path.display()
                            ),
                        };
                    }
                }
                TestResult::Pass
            }
            (ExpectedResult::Success { .. }, Err(error)) => TestResult::Fail {
                reason: format!("{}: build failed: {error}", self.name),
            },
            (ExpectedResult::BuildError { .. }, Ok(_)) => TestResult::Fail {
                reason: format!("{}: build succeeded but an error was expected", self.name),
            },
            (ExpectedResult::BuildError { patterns }, Err(error)) => {
                match patterns.iter().find(|pattern| !error.contains(pattern.as_str())) {
                    Some(missing) => TestResult::Fail {
                        reason: format!("{}: error `{error}` does not mention `{missing}`", self.name),
                    },
                    None => TestResult::Pass,
                }
            }
        }
    }
}

/// Library imports
///
/// A library importing a class from another library under an alias
pub fn library_imports() -> MultiFileProject {
    let mut project = MultiFileProject::new("library_imports");

    project.add_file(
        "support/Support/Math.php",
        "<?php\ndeclare(strict_types=1);\n\nnamespace Support;\n\nclass Math\n{\n    const PI = 3.14159;\n}\n",
    );
    project.add_file(
        "geometry/Geometry/Circle.php",
        "<?php\ndeclare(strict_types=1);\n\nnamespace Geometry;\n\nuse Support\\Math as M;\n\n\
         class Circle extends Shape\n{\n    public function area(float $r): float\n    {\n        return M::PI * $r * $r;\n    }\n}\n",
    );
    project.add_file(
        "geometry/Geometry/Shape.php",
        "<?php\ndeclare(strict_types=1);\n\nnamespace Geometry;\n\nclass Shape {}\n",
    );

    project.set_manifest(
        r#"
[library.support]
source = "support"
output = "build/support.php"

[library.geometry]
source = "geometry"
output = "build/geometry.php"
dependencies = ["support"]
"#,
    );

    project.expect_output(
        "build/support.php",
        "<?php declare(strict_types=1);\nnamespace Support {\nclass Math\n{\n    const PI = 3.14159;\n}\n}\n",
    );
    project.expect_output(
        "build/geometry.php",
        "<?php declare(strict_types=1);\nnamespace Geometry {\n\
         class Circle extends Shape\n{\n    public function area(float $r): float\n    {\n        return \\Support\\Math::PI * $r * $r;\n    }\n}\n\
         class Shape {}\n}\n",
    );

    project
}

/// Diamond dependencies
///
/// `app` reaches `core` through two libraries; `core` is built once and its
/// symbols are inlined once.
pub fn diamond_dependencies() -> MultiFileProject {
    let mut project = MultiFileProject::new("diamond_dependencies");

    project.add_file("core/Core.php", "<?php\nnamespace Core;\nclass Kernel {}\n");
    project.add_file("http/Http.php", "<?php\nnamespace Http;\nclass Request extends \\Core\\Kernel {}\n");
    project.add_file("cli/Cli.php", "<?php\nnamespace Cli;\nclass Command extends \\Core\\Kernel {}\n");
    project.add_file("app/main.php", "<?php\necho 'ready';\n");

    project.set_manifest(
        r#"
[library.core]
source = "core"
output = "build/core.php"

[library.http]
source = "http"
output = "build/http.php"
dependencies = ["core"]

[library.cli]
source = "cli"
output = "build/cli.php"
dependencies = ["core"]

[project.app]
source = "app"
output = "build/app.php"
entry = "main.php"
dependencies = ["http", "cli"]
inline-dependencies = true
"#,
    );

    project.expect_output(
        "build/app.php",
        "<?php declare(strict_types=1);\n\
         namespace Core {\nclass Kernel {}\n}\n\
         namespace Http {\nclass Request extends \\Core\\Kernel {}\n}\n\
         namespace Cli {\nclass Command extends \\Core\\Kernel {}\n}\n\
         namespace {\necho 'ready';\n}\n",
    );

    project
}

/// Project with inlined dependencies
///
/// Function and constant imports, a non-strict header and an entry module
/// wrapped in the global namespace.
pub fn inline_project() -> MultiFileProject {
    let mut project = MultiFileProject::new("inline_project");

    project.add_file(
        "lib/greetings.php",
        "<?php\nnamespace Greetings;\n\nconst DEFAULT_NAME = 'world';\n\n\
         function greet(string $name = DEFAULT_NAME): string\n{\n    return \"Hello, $name!\";\n}\n",
    );
    project.add_file(
        "app/App.php",
        "<?php\nnamespace App;\n\nuse function Greetings\\greet;\nuse const Greetings\\DEFAULT_NAME;\n\n\
         function run(): string\n{\n    return greet('phpack') . DEFAULT_NAME;\n}\n",
    );
    project.add_file("app/bootstrap.php", "<?php\necho App\\run();\n");

    project.set_manifest(
        r#"
[options]
strict = false

[library.greetings]
source = "lib"
output = "build/greetings.php"

[project.app]
source = "app"
output = "build/app.php"
entry = "bootstrap.php"
dependencies = ["greetings"]
inline-dependencies = true
"#,
    );

    let greetings = "namespace Greetings {\nconst DEFAULT_NAME = 'world';\n\
                     function greet(string $name = DEFAULT_NAME): string\n{\n    return \"Hello, $name!\";\n}\n}\n";
    project.expect_output("build/greetings.php", format!("<?php\n{greetings}"));
    project.expect_output(
        "build/app.php",
        format!(
            "<?php\n{greetings}\
             namespace App {{\nfunction run(): string\n{{\n    return \\Greetings\\greet('phpack') . \\Greetings\\DEFAULT_NAME;\n}}\n}}\n\
             namespace {{\necho App\\run();\n}}\n"
        ),
    );

    project
}

/// Dependency cycle
///
/// Two libraries depending on each other fail the build.
pub fn dependency_cycle() -> MultiFileProject {
    let mut project = MultiFileProject::new("dependency_cycle");

    project.add_file("a/A.php", "<?php\nclass A {}\n");
    project.add_file("b/B.php", "<?php\nclass B {}\n");

    project.set_manifest(
        r#"
[library.a]
source = "a"
output = "build/a.php"
dependencies = ["b"]

[library.b]
source = "b"
output = "build/b.php"
dependencies = ["a"]
"#,
    );

    project.expect_errors(vec!["dependency cycle".to_string(), "a -> b -> a".to_string()]);
    project
}

/// Duplicate declarations
///
/// The module visited last wins and the symbol is emitted once.
pub fn last_write_wins() -> MultiFileProject {
    let mut project = MultiFileProject::new("last_write_wins");

    project.add_file("lib/a/Config.php", "<?php\nnamespace App;\nclass Config { const SOURCE = 'a'; }\n");
    project.add_file("lib/b/Config.php", "<?php\nnamespace App;\nclass Config { const SOURCE = 'b'; }\n");
    project.add_file("lib/c/Loader.php", "<?php\nnamespace App;\nclass Loader {}\n");

    project.set_manifest(
        r#"
[library.config]
source = "lib"
output = "build/config.php"
"#,
    );

    project.expect_output(
        "build/config.php",
        "<?php declare(strict_types=1);\nnamespace App {\nclass Config { const SOURCE = 'b'; }\nclass Loader {}\n}\n",
    );

    project
}

/// Namespace case folding
///
/// `App` and `app` share one block named as first seen.
pub fn namespace_case_folding() -> MultiFileProject {
    let mut project = MultiFileProject::new("namespace_case_folding");

    project.add_file("lib/A.php", "<?php\nnamespace App\\Models;\nclass User {}\n");
    project.add_file("lib/B.php", "<?php\nnamespace app\\models;\nclass Post {}\n");

    project.set_manifest(
        r#"
[library.models]
source = "lib"
output = "build/models.php"
"#,
    );

    project.expect_output(
        "build/models.php",
        "<?php declare(strict_types=1);\nnamespace App\\Models {\nclass User {}\nclass Post {}\n}\n",
    );

    project
}

/// Rejected magic constants
///
/// `__DIR__` fails the build when the manifest rejects it.
pub fn rejected_magic_constant() -> MultiFileProject {
    let mut project = MultiFileProject::new("rejected_magic_constant");

    project.add_file("lib/Paths.php", "<?php\nnamespace Paths;\nfunction root() { return __DIR__; }\n");

    project.set_manifest(
        r#"
[options]
dir-constant = "reject"

[library.paths]
source = "lib"
output = "build/paths.php"
"#,
    );

    project.expect_errors(vec!["__DIR__".to_string(), "Paths.php".to_string()]);
    project
}
