//! Source extraction: moving top-level declarations into the registry

use crate::registry::{NamespaceRegistry, RegistryError};
use crate::symbol::{Symbol, SymbolKind};
use pk_span::FileId;
use pk_syntax::{ConstDecl, Module, Name, Node};
use std::path::Path;
use tracing::trace;

/// Registers every top-level declaration of `module` and returns its free
/// global statements in module order.
///
/// Only the top level is walked: a namespace block sets the context for the
/// statements it contains and declaration bodies are moved as a whole. A
/// grouped `const` yields one symbol per constant. Imports, standalone
/// comments and the strict-types pragma are dropped. Other statements inside a
/// named namespace are kept with that namespace.
///
/// # Errors
///
/// Fails when the registry rejects a duplicate declaration.
pub fn extract(module: Module, registry: &mut NamespaceRegistry) -> Result<Vec<Node>, RegistryError> {
    let mut extractor = Extractor {
        registry,
        file: module.file,
        path: &module.path,
        free: Vec::new(),
    };

    for item in module.items {
        match item {
            Node::Namespace(namespace) => {
                let name = namespace.name;
                for statement in namespace.body {
                    extractor.statement(name.as_ref(), statement)?;
                }
            }
            other => extractor.statement(None, other)?,
        }
    }

    Ok(extractor.free)
}

struct Extractor<'a> {
    registry: &'a mut NamespaceRegistry,
    file: FileId,
    path: &'a Path,
    free: Vec<Node>,
}

impl Extractor<'_> {
    fn statement(&mut self, namespace: Option<&Name>, node: Node) -> Result<(), RegistryError> {
        match node {
            Node::ClassLike(class) => {
                let name = class.name.clone();
                self.symbol(namespace, name, SymbolKind::Class(class.kind), Node::ClassLike(class))
            }
            Node::Function(function) => {
                let name = function.name.clone();
                self.symbol(namespace, name, SymbolKind::Function, Node::Function(function))
            }
            Node::Const(constant) => {
                for item in constant.items {
                    let name = item.name.clone();
                    let body = Node::Const(ConstDecl { items: vec![item] });
                    self.symbol(namespace, name, SymbolKind::Constant, body)?;
                }
                Ok(())
            }
            Node::Use(_) | Node::Comment(_) => Ok(()),
            Node::Declare(declare) if declare.strict_types => Ok(()),
            other => {
                match namespace {
                    Some(_) => self.registry.add_statement(namespace, other),
                    None => self.free.push(other),
                }
                Ok(())
            }
        }
    }

    fn symbol(
        &mut self,
        namespace: Option<&Name>,
        name: String,
        kind: SymbolKind,
        body: Node,
    ) -> Result<(), RegistryError> {
        trace!(%kind, name, namespace = ?namespace.map(Name::joined), "registering symbol");
        self.registry.register(Symbol {
            namespace: namespace.cloned(),
            name,
            kind,
            body,
            origin: self.file,
            path: self.path.to_path_buf(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NamespaceEntry;
    use crate::symbol::KindSpace;
    use pk_resolve::Resolver;
    use pk_syntax::{LowerOptions, print_node, print_nodes};

    fn module(source: &str) -> Module {
        let mut module = pk_parser::parse_module(
            source,
            FileId::new(0),
            Path::new("src/Module.php"),
            LowerOptions::default(),
        )
        .into_module()
        .unwrap();
        Resolver::new().resolve_module(&mut module);
        module
    }

    fn printed(registry: &NamespaceRegistry, entry: &NamespaceEntry) -> Vec<String> {
        entry
            .symbols
            .iter()
            .map(|&id| print_node(&registry.symbol(id).body))
            .collect()
    }

    #[test]
    fn test_braced_namespaces() {
        let mut registry = NamespaceRegistry::default();
        let free = extract(
            module(
                "<?php\nnamespace App { class A {} function f() {} }\nnamespace Lib { interface I {} }\n",
            ),
            &mut registry,
        )
        .unwrap();

        assert!(free.is_empty());
        let entries: Vec<&NamespaceEntry> = registry.namespaces().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(printed(&registry, entries[0]), vec!["class A {}", "function f() {}"]);
        assert_eq!(printed(&registry, entries[1]), vec!["interface I {}"]);
    }

    #[test]
    fn test_unnamespaced_module_collects_free_statements() {
        let mut registry = NamespaceRegistry::default();
        let free = extract(
            module("<?php\ndeclare(strict_types=1);\nuse Lib\\Thing;\n$x = 1;\nclass A {}\necho $x;\n"),
            &mut registry,
        )
        .unwrap();

        assert_eq!(print_nodes(&free), "$x = 1;\necho $x;");
        assert_eq!(printed(&registry, registry.global()), vec!["class A {}"]);
        assert_eq!(registry.namespaces().count(), 0);
    }

    #[test]
    fn test_grouped_constants_are_split() {
        let mut registry = NamespaceRegistry::default();
        extract(module("<?php\nnamespace Cfg;\nconst A = 1, B = 'two';\n"), &mut registry).unwrap();

        let entry = registry.namespaces().next().unwrap();
        assert_eq!(printed(&registry, entry), vec!["const A = 1;", "const B = 'two';"]);
        let namespace = Name::parse("Cfg");
        assert!(registry.lookup(Some(&namespace), KindSpace::Constant, "B").is_some());
        assert!(registry.lookup(Some(&namespace), KindSpace::Constant, "b").is_none());
    }

    #[test]
    fn test_namespaced_free_statements_stay_in_namespace() {
        let mut registry = NamespaceRegistry::default();
        let free = extract(
            module("<?php\nnamespace Boot;\nclass Kernel {}\ndefine('BOOTED', true);\n"),
            &mut registry,
        )
        .unwrap();

        assert!(free.is_empty());
        let entry = registry.namespaces().next().unwrap();
        assert_eq!(print_nodes(&entry.statements), "define('BOOTED', true);");
        assert_eq!(entry.symbols.len(), 1);
    }

    #[test]
    fn test_symbol_records_origin() {
        let mut registry = NamespaceRegistry::default();
        extract(module("<?php\nfunction helper() {}\n"), &mut registry).unwrap();

        let symbol = registry.lookup(None, KindSpace::Function, "HELPER").unwrap();
        assert_eq!(symbol.path, Path::new("src/Module.php"));
        assert_eq!(symbol.qualified_name().to_string(), "\\helper");
    }
}
