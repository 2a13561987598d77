//! PHP language adapter
//!
//! Wraps the tree-sitter PHP grammar and lowers its concrete trees into the
//! phpack AST.

mod lower;

use anyhow::Result;
use pk_syntax::{Language, LowerOptions, Node};
use tree_sitter::{Parser, Tree};

pub use lower::Lowerer;

/// PHP language implementation
pub struct PhpLanguage;

impl PhpLanguage {
    /// Creates a new PHP language adapter
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PhpLanguage {
    fn default() -> Self {
        Self::new()
    }
}

impl Language for PhpLanguage {
    fn name(&self) -> &'static str {
        "php"
    }

    fn extensions(&self) -> &[&'static str] {
        &["php"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_php::LANGUAGE_PHP.into()
    }

    fn parse(&self, source: &str) -> Result<Tree> {
        let mut parser = Parser::new();
        parser.set_language(&self.tree_sitter_language())?;

        parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("tree-sitter parse failed"))
    }

    fn lower(&self, tree: &Tree, source: &str, options: LowerOptions) -> Vec<Node> {
        Lowerer::new(source, options).lower_program(tree.root_node())
    }
}
