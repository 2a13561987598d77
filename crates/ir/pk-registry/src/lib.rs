//! Namespace registry for bundled declarations
//!
//! The [`extract`] function walks the top level of a resolved module and moves
//! every declaration into a [`NamespaceRegistry`], which remembers which
//! namespace each symbol belongs to and the order symbols were discovered in.
//! The bundler later emits the registry one namespace block at a time.

pub mod extract;
pub mod registry;
pub mod symbol;

pub use extract::extract;
pub use registry::{DuplicatePolicy, NamespaceEntry, NamespaceRegistry, RegistryError};
pub use symbol::{KindSpace, Symbol, SymbolId, SymbolKey, SymbolKind};
