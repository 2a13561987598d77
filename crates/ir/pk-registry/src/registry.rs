//! Ordered namespace → symbol storage

use crate::symbol::{KindSpace, Symbol, SymbolId, SymbolKey};
use indexmap::IndexMap;
use pk_arena::Arena;
use pk_syntax::{Name, Node};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// What to do when a declaration is registered twice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The later declaration replaces the earlier one in its original position
    #[default]
    Overwrite,
    /// Registration fails
    Error,
}

/// Errors raised while registering symbols
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// Two declarations share a key
    #[error("`{symbol}` is declared in both {} and {}", first.display(), second.display())]
    DuplicateSymbol {
        /// Fully-qualified name of the symbol
        symbol: String,
        /// Module of the earlier declaration
        first: PathBuf,
        /// Module of the later declaration
        second: PathBuf,
    },
}

/// Symbols and free statements of one namespace
#[derive(Debug, Clone, Default)]
pub struct NamespaceEntry {
    /// Namespace as first written, `None` for the global pseudo-namespace
    pub name: Option<Name>,
    /// Symbols in discovery order
    pub symbols: Vec<SymbolId>,
    /// Non-declaration statements in module order
    pub statements: Vec<Node>,
}

impl NamespaceEntry {
    fn new(name: Option<Name>) -> Self {
        Self {
            name,
            symbols: Vec::new(),
            statements: Vec::new(),
        }
    }

    /// Whether the entry holds nothing
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.statements.is_empty()
    }
}

/// Namespace registry for one bundling run
///
/// Namespaces are kept in the order they were first seen; the global
/// pseudo-namespace is kept apart so it can be emitted last.
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    symbols: Arena<Symbol>,
    namespaces: IndexMap<String, NamespaceEntry>,
    global: NamespaceEntry,
    index: FxHashMap<SymbolKey, SymbolId>,
    policy: DuplicatePolicy,
    overwritten: usize,
}

impl NamespaceRegistry {
    /// Empty registry applying `policy` to duplicates
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Adds a symbol under its namespace.
    ///
    /// A symbol whose key is already registered replaces the earlier one and
    /// keeps its position, unless the policy is [`DuplicatePolicy::Error`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateSymbol`] for a repeated key under
    /// [`DuplicatePolicy::Error`].
    pub fn register(&mut self, symbol: Symbol) -> Result<SymbolId, RegistryError> {
        let key = symbol.key();

        if let Some(&id) = self.index.get(&key) {
            let previous = &self.symbols[id];
            if self.policy == DuplicatePolicy::Error {
                return Err(RegistryError::DuplicateSymbol {
                    symbol: symbol.qualified_name().to_string(),
                    first: previous.path.clone(),
                    second: symbol.path,
                });
            }

            warn!(
                symbol = %symbol.qualified_name(),
                kind = %symbol.kind,
                first = %previous.path.display(),
                second = %symbol.path.display(),
                "symbol declared twice, keeping the later declaration"
            );
            self.symbols[id] = symbol;
            self.overwritten += 1;
            return Ok(id);
        }

        let namespace = symbol.namespace.clone();
        let id = self.symbols.alloc(symbol);
        self.index.insert(key, id);
        self.entry_mut(namespace.as_ref()).symbols.push(id);
        Ok(id)
    }

    /// Appends a free statement to a named namespace, or to the global block
    pub fn add_statement(&mut self, namespace: Option<&Name>, statement: Node) {
        self.entry_mut(namespace).statements.push(statement);
    }

    fn entry_mut(&mut self, namespace: Option<&Name>) -> &mut NamespaceEntry {
        match namespace {
            Some(name) => self
                .namespaces
                .entry(name.folded())
                .or_insert_with(|| NamespaceEntry::new(Some(name.clone()))),
            None => &mut self.global,
        }
    }

    /// Named namespaces in discovery order
    pub fn namespaces(&self) -> impl Iterator<Item = &NamespaceEntry> {
        self.namespaces.values()
    }

    /// The global pseudo-namespace
    pub fn global(&self) -> &NamespaceEntry {
        &self.global
    }

    /// Symbol with the given id
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    /// Looks up a symbol by namespace, kind space and declared name
    pub fn lookup(&self, namespace: Option<&Name>, space: KindSpace, name: &str) -> Option<&Symbol> {
        let key = SymbolKey {
            namespace: namespace.map(Name::folded).unwrap_or_default(),
            space,
            name: match space {
                KindSpace::Constant => name.to_string(),
                KindSpace::ClassLike | KindSpace::Function => name.to_lowercase(),
            },
        };
        self.index.get(&key).map(|&id| &self.symbols[id])
    }

    /// Number of distinct symbols
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no symbols are registered
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// How many registrations replaced an earlier declaration
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }
}
