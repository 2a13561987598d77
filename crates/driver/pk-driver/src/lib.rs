//! Build driver for phpack
//!
//! Orchestrates the pipeline for every unit of a [`BuildGraph`]: discovery of
//! a unit's modules, parsing, the rewrite passes, import resolution,
//! registration and bundle emission. A [`BuildSession`] builds dependencies
//! first, builds each unit at most once and reports a dependency cycle as an
//! error.
//!
//! # Usage
//!
//! ```no_run
//! use pk_driver::{BuildGraph, BuildSession, CompilerOptions, Library, Project};
//!
//! let mut graph = BuildGraph::new();
//! graph.add(Library::new("math", "vendor/math", "build/math.php"))?;
//! graph.add(
//!     Project::new("app", "src", "build/app.php", "src/main.php")
//!         .depends_on("math")
//!         .inline_dependencies(true),
//! )?;
//!
//! let mut session = BuildSession::new(CompilerOptions::default());
//! session.build_all(&graph)?;
//! # Ok::<(), pk_driver::BuildError>(())
//! ```

pub mod compiler;
pub mod discover;
pub mod error;
pub mod graph;
pub mod options;
pub mod session;

pub use compiler::{CompiledSources, Compiler};
pub use discover::{Discovery, ExcludeSet, discover_modules};
pub use error::BuildError;
pub use graph::{BuildGraph, DependencyHolder, DependencySet, Library, Project, Unit, UnitId};
pub use options::CompilerOptions;
pub use pk_registry::DuplicatePolicy;
pub use pk_rewrite::MagicConstantMode;
pub use session::{BuildSession, UnitReport};
