//! Source rewrites applied before bundling
//!
//! - [`magic`]: substitutes or rejects `__DIR__` / `__FILE__`, whose values
//!   change once a module is merged into another file.
//! - [`strict`]: drops per-module `declare(strict_types=...)` pragmas; the
//!   bundle carries a single shared one.
//! - [`header`]: strips leftover header boilerplate from printed bodies.

pub mod header;
pub mod magic;
pub mod strict;

pub use header::strip_header;
pub use magic::{MagicConstantMode, RewriteError, substitute_magic_constants};
pub use strict::remove_strict_types;
