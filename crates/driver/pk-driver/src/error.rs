//! Build errors

#![allow(unused_assignments, reason = "fields are consumed by the miette derive")]

use miette::Diagnostic;
use pk_parser::ParseError;
use pk_registry::RegistryError;
use pk_rewrite::RewriteError;
use pk_syntax::MagicConst;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors of a build session
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    /// A unit is misconfigured; raised before any of its modules are read
    #[error("[{unit}] {message}")]
    #[diagnostic(code(phpack::configuration))]
    Configuration {
        /// Unit the error belongs to
        unit: String,
        /// What is wrong
        message: String,
    },

    /// A module of the unit failed to parse
    #[error("[{unit}] failed to parse {}", path.display())]
    #[diagnostic(code(phpack::parse))]
    Parse {
        /// Unit the module belongs to
        unit: String,
        /// Module that failed
        path: PathBuf,
        /// Underlying parse failure
        #[source]
        #[diagnostic_source]
        source: ParseError,
    },

    /// A rejected magic constant was used
    #[error("[{unit}] `{constant}` is not supported in {}", path.display())]
    #[diagnostic(
        code(phpack::unsupported_magic_reference),
        help("set `dir-constant` or `file-constant` to \"preserve\" or \"substitute\"")
    )]
    UnsupportedMagicReference {
        /// Unit the module belongs to
        unit: String,
        /// Module containing the constant
        path: PathBuf,
        /// The rejected constant
        constant: MagicConst,
    },

    /// Two declarations share a name under the `error` duplicate policy
    #[error("[{unit}] `{symbol}` is declared in both {} and {}", first.display(), second.display())]
    #[diagnostic(
        code(phpack::duplicate_symbol),
        help("remove one declaration or set `duplicates = \"overwrite\"`")
    )]
    DuplicateSymbol {
        /// Unit being built
        unit: String,
        /// Fully-qualified name of the symbol
        symbol: String,
        /// Module of the earlier declaration
        first: PathBuf,
        /// Module of the later declaration
        second: PathBuf,
    },

    /// Units depend on each other in a loop
    #[error("dependency cycle: {}", cycle.join(" -> "))]
    #[diagnostic(code(phpack::dependency_cycle))]
    DependencyCycle {
        /// Unit names along the cycle, starting and ending with the same unit
        cycle: Vec<String>,
    },

    /// Reading a module or writing an output failed
    #[error("I/O error on {}: {source}", path.display())]
    #[diagnostic(code(phpack::io))]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    /// Configuration error for `unit`
    pub fn configuration(unit: &str, message: impl Into<String>) -> Self {
        Self::Configuration {
            unit: unit.to_string(),
            message: message.into(),
        }
    }

    /// I/O error on `path`
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn rewrite(unit: &str, error: RewriteError) -> Self {
        match error {
            RewriteError::UnsupportedMagicReference { constant, path } => {
                Self::UnsupportedMagicReference {
                    unit: unit.to_string(),
                    path,
                    constant,
                }
            }
        }
    }

    pub(crate) fn registry(unit: &str, error: RegistryError) -> Self {
        match error {
            RegistryError::DuplicateSymbol {
                symbol,
                first,
                second,
            } => Self::DuplicateSymbol {
                unit: unit.to_string(),
                symbol,
                first,
                second,
            },
        }
    }
}
