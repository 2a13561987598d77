//! Bundle emission
//!
//! Turns a filled [`NamespaceRegistry`] into PHP text: one braced block per
//! namespace in discovery order, followed by a trailing global block. The
//! shared artifact header is written separately by [`artifact_header`] so that
//! several bundles can be concatenated into one file.

use pk_registry::{NamespaceEntry, NamespaceRegistry};
use pk_rewrite::strip_header;
use pk_syntax::{Module, Node, print_node, print_nodes};
use tracing::debug;

/// Opening tag plus, when `strict` is set, the one strict-types pragma of the file
pub fn artifact_header(strict: bool) -> String {
    if strict {
        "<?php declare(strict_types=1);\n".to_string()
    } else {
        "<?php\n".to_string()
    }
}

/// Emits every namespace of `registry` followed by the global block.
///
/// `free` holds the free global statements of all modules in read order; they
/// are written after the global symbols. The global block is left out when it
/// would be empty.
pub fn bundle(registry: &NamespaceRegistry, free: &[Node]) -> String {
    let mut bundler = Bundler {
        registry,
        out: String::new(),
        blocks: 0,
    };

    for entry in registry.namespaces() {
        bundler.block(entry, &[]);
    }
    if !registry.global().is_empty() || !free.is_empty() {
        bundler.block(registry.global(), free);
    }

    debug!(blocks = bundler.blocks, symbols = registry.len(), "bundled registry");
    bundler.out
}

struct Bundler<'a> {
    registry: &'a NamespaceRegistry,
    out: String,
    blocks: usize,
}

impl Bundler<'_> {
    fn block(&mut self, entry: &NamespaceEntry, free: &[Node]) {
        self.blocks += 1;
        self.out.push_str("namespace ");
        if let Some(name) = &entry.name {
            self.out.push_str(&name.joined());
            self.out.push(' ');
        }
        self.out.push_str("{\n");

        for &id in &entry.symbols {
            self.line(&print_node(&self.registry.symbol(id).body));
        }
        for statement in entry.statements.iter().chain(free) {
            self.line(&print_node(statement));
        }

        self.out.push_str("}\n");
    }

    fn line(&mut self, printed: &str) {
        let body = strip_header(printed);
        let body = body.trim();
        if body.is_empty() {
            return;
        }
        self.out.push_str(body);
        self.out.push('\n');
    }
}

/// Renders a project's entry module for appending after the bundled sources.
///
/// References are left as written. A module with namespaces is printed as
/// braced namespace blocks; any other module is wrapped in one global block.
pub fn render_entry(module: &Module) -> String {
    let mut out = String::new();

    if module.has_namespaces() {
        for item in &module.items {
            if let Node::Namespace(_) = item {
                out.push_str(strip_header(&print_node(item)).trim());
                out.push('\n');
            }
        }
    } else {
        let body = print_nodes(&module.items);
        let body = strip_header(&body);
        out.push_str("namespace {\n");
        if !body.trim().is_empty() {
            out.push_str(body.trim());
            out.push('\n');
        }
        out.push_str("}\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use pk_registry::{DuplicatePolicy, extract};
    use pk_resolve::Resolver;
    use pk_span::FileId;
    use pk_syntax::LowerOptions;
    use std::path::Path;

    fn parse(index: u32, source: &str) -> Module {
        pk_parser::parse_module(
            source,
            FileId::new(index),
            Path::new("src/test.php"),
            LowerOptions::default(),
        )
        .into_module()
        .unwrap()
    }

    fn bundle_sources(sources: &[&str]) -> String {
        let mut registry = NamespaceRegistry::new(DuplicatePolicy::Overwrite);
        let mut free = Vec::new();
        for (index, source) in sources.iter().enumerate() {
            let mut module = parse(index as u32, source);
            Resolver::new().resolve_module(&mut module);
            free.extend(extract(module, &mut registry).unwrap());
        }
        bundle(&registry, &free)
    }

    #[test]
    fn test_artifact_header() {
        assert_eq!(artifact_header(true), "<?php declare(strict_types=1);\n");
        assert_eq!(artifact_header(false), "<?php\n");
    }

    #[test]
    fn test_single_global_symbol_makes_one_global_block() {
        expect![[r#"
            namespace {
            class Solo {}
            }
        "#]]
        .assert_eq(&bundle_sources(&["<?php\nclass Solo {}\n"]));
    }

    #[test]
    fn test_namespaced_symbol_makes_one_named_block() {
        expect![[r#"
            namespace Foo {
            class Solo {}
            }
        "#]]
        .assert_eq(&bundle_sources(&["<?php\nnamespace Foo;\nclass Solo {}\n"]));
    }

    #[test]
    fn test_blocks_in_discovery_order_with_global_last() {
        let output = bundle_sources(&[
            "<?php\n$booted = true;\n",
            "<?php\nnamespace Lib;\nuse Other\\Base;\nclass Child extends Base {}\n",
            "<?php\nnamespace App;\nfunction run() { return new Widget(); }\n",
            "<?php\nfunction helper() {}\n",
        ]);
        expect![[r#"
            namespace Lib {
            class Child extends \Other\Base {}
            }
            namespace App {
            function run() { return new Widget(); }
            }
            namespace {
            function helper() {}
            $booted = true;
            }
        "#]]
        .assert_eq(&output);
    }

    #[test]
    fn test_last_registration_is_emitted_once() {
        let output = bundle_sources(&[
            "<?php\nnamespace N;\nclass X { const V = 1; }\n",
            "<?php\nnamespace N;\nclass X { const V = 2; }\n",
        ]);
        assert_eq!(output.matches("class X").count(), 1);
        assert!(output.contains("const V = 2;"));
    }

    #[test]
    fn test_bundling_is_deterministic() {
        let sources = [
            "<?php\nnamespace A;\nclass One {}\n",
            "<?php\nnamespace B;\nconst LIMIT = 3;\ninit();\n",
        ];
        assert_eq!(bundle_sources(&sources), bundle_sources(&sources));
    }

    #[test]
    fn test_empty_registry_emits_nothing() {
        assert_eq!(bundle_sources(&["<?php\n"]), "");
    }

    #[test]
    fn test_entry_without_namespace_is_wrapped() {
        let module = parse(0, "<?php\nuse App\\Kernel;\n(new Kernel())->run();\n");
        expect![[r#"
            namespace {
            use App\Kernel;
            (new Kernel())->run();
            }
        "#]]
        .assert_eq(&render_entry(&module));
    }

    #[test]
    fn test_entry_namespaces_are_braced() {
        let module = parse(0, "<?php\nnamespace App\\Main;\nrun();\n");
        expect![[r#"
            namespace App\Main {
            run();
            }
        "#]]
        .assert_eq(&render_entry(&module));
    }
}
