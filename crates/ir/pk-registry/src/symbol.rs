//! Registered declarations

use pk_arena::Idx;
use pk_span::FileId;
use pk_syntax::{ClassKind, Name, Node};
use std::fmt;
use std::path::PathBuf;

/// Unique identifier for a symbol
pub type SymbolId = Idx<Symbol>;

/// Kind of declaration a symbol was created from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Class, interface, trait or enum
    Class(ClassKind),
    /// Function
    Function,
    /// Top-level constant
    Constant,
}

impl SymbolKind {
    /// Name space the symbol occupies
    pub fn space(self) -> KindSpace {
        match self {
            Self::Class(_) => KindSpace::ClassLike,
            Self::Function => KindSpace::Function,
            Self::Constant => KindSpace::Constant,
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(kind) => write!(formatter, "{kind}"),
            Self::Function => write!(formatter, "function"),
            Self::Constant => write!(formatter, "constant"),
        }
    }
}

/// Independent name spaces a declaration can live in
///
/// A class and a function may share a name; two classes may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindSpace {
    /// Classes, interfaces, traits and enums
    ClassLike,
    /// Functions
    Function,
    /// Constants
    Constant,
}

/// Identity of a declaration within one build
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolKey {
    /// Lowercased namespace, empty for global
    pub namespace: String,
    /// Which name space the symbol lives in
    pub space: KindSpace,
    /// Declared name, lowercased unless the symbol is a constant
    pub name: String,
}

/// A top-level declaration and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Declaring namespace, `None` for global code
    pub namespace: Option<Name>,
    /// Declared short name
    pub name: String,
    /// Kind of declaration
    pub kind: SymbolKind,
    /// Resolved declaration
    pub body: Node,
    /// Module the declaration was read from
    pub origin: FileId,
    /// Path of the origin module
    pub path: PathBuf,
}

impl Symbol {
    /// `namespace\name`, fully qualified
    pub fn qualified_name(&self) -> Name {
        Name::concat(self.namespace.as_ref(), &Name::parse(&self.name))
    }

    /// Identity used to detect duplicates
    pub fn key(&self) -> SymbolKey {
        let space = self.kind.space();
        SymbolKey {
            namespace: self.namespace.as_ref().map(Name::folded).unwrap_or_default(),
            space,
            name: match space {
                KindSpace::Constant => self.name.clone(),
                KindSpace::ClassLike | KindSpace::Function => self.name.to_lowercase(),
            },
        }
    }
}
