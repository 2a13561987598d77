//! Syntax tree for PHP source modules
//!
//! This crate defines the closed AST that every phpack pass works on, the
//! enter/leave traversal used to rewrite it, and the printer that turns it back
//! into PHP. Parsing lives behind the [`Language`] trait so the tree-sitter
//! grammar stays out of the passes.

pub mod ast;
pub mod name;
pub mod print;
pub mod visit;

pub use ast::{
    ClassDecl, ClassKind, ClassRef, Code, ConstDecl, ConstItem, DeclareStmt, FunctionDecl,
    MagicConst, Module, NamespaceDecl, Node, Piece, RefSite, TypeHint, TypePosition, TypeRef,
    UseDecl, UseItem, UseKind,
};
pub use name::{Name, NameKind, NameRef};
pub use print::{print_code, print_node, print_nodes};
pub use visit::{VisitAction, Visitor, traverse, traverse_code};

use anyhow::Result;

/// Options controlling how a concrete tree is lowered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LowerOptions {
    /// Keep comments in lowered code instead of dropping them
    pub keep_comments: bool,
}

/// Trait for language-specific parsers
pub trait Language: Send + Sync + 'static {
    /// Name of the language
    fn name(&self) -> &'static str;

    /// File extensions this language handles
    fn extensions(&self) -> &[&'static str];

    /// tree-sitter language instance
    fn tree_sitter_language(&self) -> tree_sitter::Language;

    /// Parse source code to concrete syntax tree
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails
    fn parse(&self, source: &str) -> Result<tree_sitter::Tree>;

    /// Lower a concrete syntax tree to top-level AST statements
    fn lower(&self, tree: &tree_sitter::Tree, source: &str, options: LowerOptions) -> Vec<Node>;
}
