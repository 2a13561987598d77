//! Per-category import tables

use pk_syntax::{Name, UseKind};
use rustc_hash::FxHashMap;
use std::fmt;

/// Symbol category an alias or reference belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Classes, interfaces, traits, enums and namespace prefixes
    Type,
    /// Functions
    Function,
    /// Constants
    Constant,
}

impl Category {
    /// Lookup key for `alias` in this category.
    ///
    /// Constants are case-sensitive; everything else is case-folded.
    pub fn key(self, alias: &str) -> String {
        match self {
            Self::Constant => alias.to_string(),
            Self::Type | Self::Function => alias.to_lowercase(),
        }
    }
}

impl From<UseKind> for Category {
    fn from(kind: UseKind) -> Self {
        match kind {
            UseKind::Normal => Self::Type,
            UseKind::Function => Self::Function,
            UseKind::Const => Self::Constant,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type => write!(formatter, "type"),
            Self::Function => write!(formatter, "function"),
            Self::Constant => write!(formatter, "constant"),
        }
    }
}

/// Alias to fully-qualified name mappings, one table per category
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    types: FxHashMap<String, Name>,
    functions: FxHashMap<String, Name>,
    constants: FxHashMap<String, Name>,
}

impl AliasTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, category: Category) -> &FxHashMap<String, Name> {
        match category {
            Category::Type => &self.types,
            Category::Function => &self.functions,
            Category::Constant => &self.constants,
        }
    }

    fn table_mut(&mut self, category: Category) -> &mut FxHashMap<String, Name> {
        match category {
            Category::Type => &mut self.types,
            Category::Function => &mut self.functions,
            Category::Constant => &mut self.constants,
        }
    }

    /// Registers `alias` for `target`.
    ///
    /// An existing entry is kept unless `replace` is set. Returns whether the
    /// table changed.
    pub fn add_alias(&mut self, category: Category, alias: &str, target: Name, replace: bool) -> bool {
        let key = category.key(alias);
        let table = self.table_mut(category);
        if !replace && table.contains_key(&key) {
            return false;
        }
        table.insert(key, target);
        true
    }

    /// Looks up the target registered for `alias`
    pub fn lookup(&self, category: Category, alias: &str) -> Option<&Name> {
        self.table(category).get(&category.key(alias))
    }

    /// Drops every entry
    pub fn clear(&mut self) {
        self.types.clear();
        self.functions.clear();
        self.constants.clear();
    }

    /// Number of entries across categories
    pub fn len(&self) -> usize {
        self.types.len() + self.functions.len() + self.constants.len()
    }

    /// Whether every category is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
