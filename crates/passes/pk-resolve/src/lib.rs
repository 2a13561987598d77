//! Alias resolution for PHP modules
//!
//! Bundling erases the per-file `use` imports that give short names their
//! meaning, so every reference has to be made explicit first. This crate
//! rewrites references to their fully-qualified form wherever an import
//! applies and records a best-effort fully-qualified name everywhere else.
//!
//! # Architecture
//!
//! - **Alias table**: three independent import tables (type, function,
//!   constant). Type and function keys are case-folded, constant keys are not.
//! - **Resolver**: walks each namespace context twice. The registration pass
//!   records imports and stamps declarations with their namespaced name; the
//!   rewrite pass visits every reference site.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pk_resolve::Resolver;
//!
//! let mut resolver = Resolver::new();
//! let stats = resolver.resolve_module(&mut module);
//! ```

pub mod alias;
pub mod resolver;

pub use alias::{AliasTable, Category};
pub use resolver::{Resolution, ResolveStats, Resolver};
