//! Import-aware rewriting of name references

use crate::alias::{AliasTable, Category};
use pk_syntax::{Module, Name, NameKind, NameRef, Node, TypeRef, UseDecl, VisitAction, Visitor, traverse};
use std::convert::Infallible;
use tracing::trace;

/// Counters for one resolution run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Imports registered in the alias table
    pub aliases: usize,
    /// References rewritten to a fully-qualified name
    pub resolved: usize,
    /// References left as written with fallback metadata
    pub unresolved: usize,
}

/// How a single reference was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Replace the reference with this name
    Resolved(Name),
    /// Keep the reference; it is believed to denote this name
    Unresolved(Name),
    /// Already fully qualified or refers to the enclosing class
    Untouched,
}

/// Rewrites references in a module using the imports in scope
///
/// One resolver is created per bundling run. Imports are scoped to the
/// namespace context that declared them: entering a namespace (or starting a
/// new module) clears the alias table.
#[derive(Debug, Default)]
pub struct Resolver {
    aliases: AliasTable,
    namespace: Option<Name>,
    stats: ResolveStats,
}

impl Resolver {
    /// Resolver in the global namespace with no imports
    pub fn new() -> Self {
        Self::default()
    }

    /// Imports currently in scope
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Namespace of the current context, `None` for global code
    pub fn namespace(&self) -> Option<&Name> {
        self.namespace.as_ref()
    }

    /// Counters accumulated so far
    pub fn stats(&self) -> ResolveStats {
        self.stats
    }

    /// Enters a namespace context, dropping the imports of the previous one
    pub fn start_namespace(&mut self, namespace: Option<Name>) {
        self.namespace = namespace;
        self.aliases.clear();
    }

    /// Registers an alias in the current context
    pub fn add_alias(&mut self, category: Category, alias: &str, target: Name, replace: bool) -> bool {
        let added = self.aliases.add_alias(category, alias, target, replace);
        if added {
            self.stats.aliases += 1;
        } else {
            trace!(%category, alias, "alias already in use, keeping first import");
        }
        added
    }

    /// Resolves every namespace context of `module` in place
    pub fn resolve_module(&mut self, module: &mut Module) -> ResolveStats {
        let before = self.stats;

        self.start_namespace(None);
        self.resolve_context(&mut module.items);

        for item in &mut module.items {
            if let Node::Namespace(namespace) = item {
                self.start_namespace(namespace.name.clone());
                self.resolve_context(&mut namespace.body);
            }
        }

        ResolveStats {
            aliases: self.stats.aliases - before.aliases,
            resolved: self.stats.resolved - before.resolved,
            unresolved: self.stats.unresolved - before.unresolved,
        }
    }

    /// Runs the registration pass, then the rewrite pass, over one context's statements
    pub fn resolve_context(&mut self, nodes: &mut Vec<Node>) {
        let Ok(()) = traverse(nodes, &mut Registration { resolver: self });
        let Ok(()) = traverse(nodes, &mut Rewrite { resolver: self });
    }

    fn register_use(&mut self, decl: &UseDecl) {
        for item in &decl.items {
            let category = Category::from(item.kind.unwrap_or(decl.kind));
            let parts = decl
                .prefix
                .iter()
                .flat_map(|prefix| prefix.parts.iter())
                .chain(item.name.parts.iter())
                .cloned();
            self.add_alias(category, item.alias_name(), Name::fully_qualified(parts), false);
        }
    }

    fn qualify(&self, name: &Name) -> Name {
        Name::concat(self.namespace.as_ref(), name)
    }

    /// Decides how a reference in `category` resolves in the current context
    pub fn resolve_name(&self, name: &Name, category: Category) -> Resolution {
        match name.kind {
            NameKind::FullyQualified => Resolution::Untouched,
            NameKind::Relative => Resolution::Resolved(self.qualify(name)),
            _ if category == Category::Type && name.is_special_class_name() => Resolution::Untouched,
            NameKind::Qualified => match self.aliases.lookup(Category::Type, name.first()) {
                Some(target) => Resolution::Resolved(Name::fully_qualified(
                    target.parts.iter().chain(name.rest()).cloned(),
                )),
                None => Resolution::Unresolved(self.qualify(name)),
            },
            NameKind::Unqualified => {
                if category == Category::Constant && is_builtin_constant(name.first()) {
                    return Resolution::Untouched;
                }
                match self.aliases.lookup(category, name.first()) {
                    Some(target) => Resolution::Resolved(target.clone()),
                    None => Resolution::Unresolved(self.qualify(name)),
                }
            }
        }
    }

    fn apply(&mut self, reference: &mut NameRef, category: Category) {
        match self.resolve_name(&reference.name, category) {
            Resolution::Resolved(target) => {
                reference.name = target.clone();
                reference.resolved = Some(target);
                self.stats.resolved += 1;
            }
            Resolution::Unresolved(fallback) => {
                reference.resolved = Some(fallback);
                self.stats.unresolved += 1;
            }
            Resolution::Untouched => {}
        }
    }

    fn apply_type(&mut self, ty: &mut TypeRef) {
        match ty {
            TypeRef::Named(reference) => self.apply(reference, Category::Type),
            TypeRef::Nullable(inner) => self.apply_type(inner),
            TypeRef::Union(members) | TypeRef::Intersection(members) => {
                for member in members {
                    self.apply_type(member);
                }
            }
            TypeRef::Keyword(_) | TypeRef::Verbatim(_) => {}
        }
    }
}

fn is_builtin_constant(name: &str) -> bool {
    ["true", "false", "null"]
        .iter()
        .any(|builtin| builtin.eq_ignore_ascii_case(name))
}

/// First pass: imports and declaration names
struct Registration<'a> {
    resolver: &'a mut Resolver,
}

impl Visitor for Registration<'_> {
    type Error = Infallible;

    fn enter(&mut self, node: &mut Node) -> Result<VisitAction, Infallible> {
        match node {
            Node::Use(decl) => self.resolver.register_use(decl),
            Node::ClassLike(class) => {
                class.namespaced_name = Some(self.resolver.qualify(&Name::parse(&class.name)));
            }
            Node::Function(function) => {
                function.namespaced_name = Some(self.resolver.qualify(&Name::parse(&function.name)));
            }
            Node::Const(constant) => {
                for item in &mut constant.items {
                    item.namespaced_name = Some(self.resolver.qualify(&Name::parse(&item.name)));
                }
            }
            _ => {}
        }
        Ok(VisitAction::SkipSubtree)
    }
}

/// Second pass: reference sites
struct Rewrite<'a> {
    resolver: &'a mut Resolver,
}

impl Visitor for Rewrite<'_> {
    type Error = Infallible;

    fn enter(&mut self, node: &mut Node) -> Result<VisitAction, Infallible> {
        match node {
            Node::Namespace(_) | Node::Use(_) | Node::Comment(_) => return Ok(VisitAction::SkipSubtree),
            Node::ClassRef(class_ref) => self.resolver.apply(&mut class_ref.name, Category::Type),
            Node::FunctionRef(reference) => self.resolver.apply(reference, Category::Function),
            Node::ConstRef(reference) => self.resolver.apply(reference, Category::Constant),
            Node::TypeHint(hint) => self.resolver.apply_type(&mut hint.ty),
            _ => {}
        }
        Ok(VisitAction::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pk_span::{FileId, Span};
    use pk_syntax::{ClassRef, Code, RefSite, TypeHint, TypePosition, UseKind, print_nodes};
    use std::path::PathBuf;

    fn module(items: Vec<Node>) -> Module {
        Module {
            file: FileId::new(0),
            path: PathBuf::from("test.php"),
            items,
        }
    }

    fn reference(text: &str) -> NameRef {
        NameRef::new(Name::parse(text), Span::default())
    }

    fn statement(nodes: Vec<Node>) -> Node {
        let mut code = Code::new();
        for (index, node) in nodes.into_iter().enumerate() {
            if index > 0 {
                code.push_text(" ");
            }
            code.push_node(node);
        }
        Node::Statement(code)
    }

    fn namespaced(name: &str, body: Vec<Node>) -> Node {
        Node::Namespace(pk_syntax::NamespaceDecl {
            name: Some(Name::parse(name)),
            body,
            braced: true,
        })
    }

    fn use_decl(text: &str) -> Node {
        Node::Use(UseDecl::parse(text).unwrap())
    }

    fn class_ref(text: &str) -> Node {
        Node::ClassRef(ClassRef {
            name: reference(text),
            site: RefSite::New,
        })
    }

    fn refs_of(node: &Node) -> Vec<&NameRef> {
        let Node::Statement(code) = node else {
            return Vec::new();
        };
        code.nodes()
            .filter_map(|node| match node {
                Node::ClassRef(class_ref) => Some(&class_ref.name),
                Node::FunctionRef(reference) | Node::ConstRef(reference) => Some(reference),
                _ => None,
            })
            .collect()
    }

    fn body(module: &Module) -> &[Node] {
        match &module.items[0] {
            Node::Namespace(namespace) => &namespace.body,
            _ => &module.items,
        }
    }

    #[test]
    fn test_unaliased_reference_gets_namespace_metadata() {
        let mut module = module(vec![namespaced("App", vec![statement(vec![class_ref("Widget")])])]);
        let stats = Resolver::new().resolve_module(&mut module);

        let refs = refs_of(&body(&module)[0]);
        assert_eq!(refs[0].name.to_string(), "Widget");
        assert_eq!(refs[0].resolved.as_ref().unwrap().to_string(), "\\App\\Widget");
        assert_eq!(stats.unresolved, 1);
    }

    #[test]
    fn test_explicit_alias_is_substituted() {
        let mut module = module(vec![namespaced(
            "App",
            vec![
                use_decl("use Lib\\Http\\Client as HttpClient;"),
                statement(vec![class_ref("httpclient"), class_ref("HttpClient\\Pool")]),
            ],
        )]);
        Resolver::new().resolve_module(&mut module);

        let refs = refs_of(&body(&module)[1]);
        assert_eq!(refs[0].name.to_string(), "\\Lib\\Http\\Client");
        assert_eq!(refs[1].name.to_string(), "\\Lib\\Http\\Client\\Pool");
    }

    #[test]
    fn test_constant_alias_is_case_sensitive() {
        let mut module = module(vec![namespaced(
            "App",
            vec![
                use_decl("use const Lib\\foo;"),
                statement(vec![
                    Node::ConstRef(reference("FOO")),
                    Node::ConstRef(reference("foo")),
                ]),
            ],
        )]);
        Resolver::new().resolve_module(&mut module);

        let refs = refs_of(&body(&module)[1]);
        assert_eq!(refs[0].name.to_string(), "FOO");
        assert_eq!(refs[1].name.to_string(), "\\Lib\\foo");
    }

    #[test]
    fn test_group_use_with_mixed_kinds() {
        let mut module = module(vec![namespaced(
            "App",
            vec![
                use_decl("use Lib\\{Model, function helper, const LIMIT};"),
                statement(vec![
                    class_ref("Model"),
                    Node::FunctionRef(reference("Helper")),
                    Node::ConstRef(reference("LIMIT")),
                ]),
            ],
        )]);
        Resolver::new().resolve_module(&mut module);

        let printed: Vec<String> = refs_of(&body(&module)[1])
            .iter()
            .map(|reference| reference.name.to_string())
            .collect();
        assert_eq!(printed, vec!["\\Lib\\Model", "\\Lib\\helper", "\\Lib\\LIMIT"]);
    }

    #[test]
    fn test_special_and_builtin_names_untouched() {
        let mut module = module(vec![namespaced(
            "App",
            vec![statement(vec![
                class_ref("static"),
                Node::ConstRef(reference("null")),
                class_ref("\\Exception"),
            ])],
        )]);
        let stats = Resolver::new().resolve_module(&mut module);

        assert!(refs_of(&body(&module)[0]).iter().all(|reference| reference.resolved.is_none()));
        assert_eq!(stats, ResolveStats::default());
    }

    #[test]
    fn test_nullable_and_union_types() {
        let hint = |ty| {
            Node::TypeHint(TypeHint {
                ty,
                position: TypePosition::Parameter,
            })
        };
        let mut module = module(vec![namespaced(
            "App",
            vec![
                use_decl("use Lib\\A;"),
                use_decl("use Lib\\B;"),
                statement(vec![
                    hint(TypeRef::Nullable(Box::new(TypeRef::Named(reference("A"))))),
                    hint(TypeRef::Union(vec![
                        TypeRef::Named(reference("B")),
                        TypeRef::Keyword("null".to_string()),
                    ])),
                ]),
            ],
        )]);
        Resolver::new().resolve_module(&mut module);

        assert_eq!(print_nodes(&body(&module)[2..]), "?\\Lib\\A \\Lib\\B|null");
    }

    #[test]
    fn test_aliases_do_not_leak_between_namespaces() {
        let mut module = module(vec![
            namespaced("First", vec![use_decl("use Lib\\Thing;")]),
            namespaced("Second", vec![statement(vec![class_ref("Thing")])]),
        ]);
        Resolver::new().resolve_module(&mut module);

        let Node::Namespace(second) = &module.items[1] else {
            panic!("expected namespace");
        };
        let refs = refs_of(&second.body[0]);
        assert_eq!(refs[0].name.to_string(), "Thing");
        assert_eq!(refs[0].resolved.as_ref().unwrap().to_string(), "\\Second\\Thing");
    }

    #[test]
    fn test_same_alias_in_two_modules_resolves_per_module() {
        let mut resolver = Resolver::new();
        let mut first = module(vec![namespaced(
            "App\\A",
            vec![use_decl("use X\\Logger;"), statement(vec![class_ref("Logger")])],
        )]);
        let mut second = module(vec![namespaced(
            "App\\B",
            vec![use_decl("use Y\\Logger;"), statement(vec![class_ref("Logger")])],
        )]);
        resolver.resolve_module(&mut first);
        resolver.resolve_module(&mut second);

        assert_eq!(refs_of(&body(&first)[1])[0].name.to_string(), "\\X\\Logger");
        assert_eq!(refs_of(&body(&second)[1])[0].name.to_string(), "\\Y\\Logger");
    }

    #[test]
    fn test_declarations_are_stamped() {
        let mut module = module(vec![namespaced(
            "App\\Models",
            vec![Node::ClassLike(pk_syntax::ClassDecl {
                kind: pk_syntax::ClassKind::Class,
                name: "User".to_string(),
                namespaced_name: None,
                code: Code::text("class User {}"),
            })],
        )]);
        Resolver::new().resolve_module(&mut module);

        let Node::ClassLike(class) = &body(&module)[0] else {
            panic!("expected class");
        };
        assert_eq!(class.namespaced_name.as_ref().unwrap().to_string(), "\\App\\Models\\User");
        assert_eq!(print_nodes(body(&module)), "class User {}");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut module = module(vec![namespaced(
            "App",
            vec![
                use_decl("use Lib\\Thing;"),
                statement(vec![class_ref("Thing"), class_ref("Other")]),
            ],
        )]);
        let mut resolver = Resolver::new();
        resolver.resolve_module(&mut module);
        let once = module.clone();
        resolver.resolve_module(&mut module);
        assert_eq!(module, once);
    }

    #[test]
    fn test_explicit_replace_overrides_first_import() {
        let mut resolver = Resolver::new();
        resolver.start_namespace(Some(Name::parse("App")));
        resolver.add_alias(Category::Type, "Thing", Name::parse("\\A\\Thing"), false);
        resolver.add_alias(Category::Type, "Thing", Name::parse("\\B\\Thing"), false);
        assert_eq!(
            resolver.resolve_name(&Name::parse("Thing"), Category::Type),
            Resolution::Resolved(Name::parse("\\A\\Thing"))
        );

        resolver.add_alias(Category::Type, "Thing", Name::parse("\\B\\Thing"), true);
        assert_eq!(
            resolver.resolve_name(&Name::parse("thing"), Category::Type),
            Resolution::Resolved(Name::parse("\\B\\Thing"))
        );
        assert_eq!(UseKind::Const.to_string(), "const");
    }
}
