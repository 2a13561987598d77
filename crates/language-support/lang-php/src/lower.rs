//! Lowering from tree-sitter-php trees to the phpack AST
//!
//! Top-level statements become structured nodes. Below that, source text is
//! copied verbatim and only name-carrying constructs are turned into nodes, so
//! printing a lowered module reproduces its source.

use pk_span::Span;
use pk_syntax::name::is_reserved_type_name;
use pk_syntax::{
    ClassDecl, ClassKind, ClassRef, Code, ConstDecl, ConstItem, DeclareStmt, FunctionDecl,
    LowerOptions, MagicConst, Name, NameRef, NamespaceDecl, Node, RefSite, TypeHint,
    TypePosition, TypeRef, UseDecl,
};
use tree_sitter::Node as TsNode;

/// Parents whose bare `name` children are identifiers, never symbol references
const IDENTIFIER_PARENTS: &[&str] = &[
    "variable_name",
    "dynamic_variable_name",
    "member_access_expression",
    "nullsafe_member_access_expression",
    "member_call_expression",
    "nullsafe_member_call_expression",
    "named_label_statement",
    "goto_statement",
    "declare_directive",
    "use_as_clause",
    "namespace_definition",
    "namespace_name",
    "namespace_use_clause",
    "namespace_use_declaration",
    "namespace_use_group",
    "namespace_use_group_clause",
    "class_declaration",
    "interface_declaration",
    "trait_declaration",
    "enum_declaration",
    "function_definition",
    "method_declaration",
];

const TYPE_KINDS: &[&str] = &[
    "named_type",
    "optional_type",
    "union_type",
    "intersection_type",
    "disjunctive_normal_form_type",
    "primitive_type",
    "bottom_type",
];

/// What a name node denotes at its position
enum NameSite {
    Identifier,
    Class(RefSite),
    Function,
    Constant,
}

/// Lowers one module's concrete tree
pub struct Lowerer<'src> {
    source: &'src str,
    options: LowerOptions,
}

impl<'src> Lowerer<'src> {
    /// Lowerer over `source`
    pub fn new(source: &'src str, options: LowerOptions) -> Self {
        Self { source, options }
    }

    /// Lowers the `program` root into top-level statements
    pub fn lower_program(&self, root: TsNode<'_>) -> Vec<Node> {
        fold_unbraced_namespaces(self.lower_statements(root))
    }

    fn text(&self, node: TsNode<'_>) -> &'src str {
        self.slice(node.start_byte(), node.end_byte())
    }

    fn slice(&self, start: usize, end: usize) -> &'src str {
        self.source.get(start..end).unwrap_or_default()
    }

    fn lower_statements(&self, parent: TsNode<'_>) -> Vec<Node> {
        let mut items = Vec::new();
        let mut comments = String::new();
        let mut cursor = parent.walk();

        for child in parent.named_children(&mut cursor) {
            let text = self.text(child);
            let node = match child.kind() {
                "php_tag" | "empty_statement" => continue,
                "comment" => {
                    if self.options.keep_comments {
                        comments.push_str(text);
                        comments.push('\n');
                    }
                    continue;
                }
                "text" => match inline_html(text.strip_prefix("#!").map_or(text, skip_line)) {
                    Some(html) => Node::text_statement(html),
                    None => continue,
                },
                "text_interpolation" => {
                    let inner = text.strip_prefix("?>").unwrap_or(text);
                    let inner = inner
                        .trim_end()
                        .strip_suffix("<?php")
                        .unwrap_or(inner);
                    match inline_html(inner) {
                        Some(html) => Node::text_statement(html),
                        None => continue,
                    }
                }
                _ => self.lower_statement(child),
            };

            if comments.is_empty() {
                items.push(node);
            } else {
                let comments = std::mem::take(&mut comments);
                attach_comments(&mut items, node, comments);
            }
        }

        if !comments.is_empty() {
            items.push(Node::Comment(comments.trim_end().to_string()));
        }
        items
    }

    fn lower_statement(&self, node: TsNode<'_>) -> Node {
        match node.kind() {
            "namespace_definition" => self.lower_namespace(node),
            "namespace_use_declaration" => {
                let text = self.text(node);
                UseDecl::parse(text).map_or_else(|| Node::text_statement(text), Node::Use)
            }
            "declare_statement" => Node::Declare(DeclareStmt {
                strict_types: is_strict_types_pragma(self.text(node)),
                code: self.lower_code(node),
            }),
            "class_declaration" => self.lower_class(node, ClassKind::Class),
            "interface_declaration" => self.lower_class(node, ClassKind::Interface),
            "trait_declaration" => self.lower_class(node, ClassKind::Trait),
            "enum_declaration" => self.lower_class(node, ClassKind::Enum),
            "function_definition" => match self.declared_name(node) {
                Some(name) => Node::Function(FunctionDecl {
                    name,
                    namespaced_name: None,
                    code: self.lower_code(node),
                }),
                None => Node::Statement(self.lower_code(node)),
            },
            "const_declaration" => self.lower_const(node),
            _ => Node::Statement(self.lower_code(node)),
        }
    }

    fn declared_name(&self, node: TsNode<'_>) -> Option<String> {
        node.child_by_field_name("name")
            .map(|name| self.text(name).to_string())
    }

    fn lower_namespace(&self, node: TsNode<'_>) -> Node {
        let name = node
            .child_by_field_name("name")
            .or_else(|| first_named_of(node, &["namespace_name"]))
            .map(|name| Name::parse(self.text(name)));

        match node.child_by_field_name("body") {
            Some(body) => Node::Namespace(NamespaceDecl {
                name,
                body: self.lower_statements(body),
                braced: true,
            }),
            None => Node::Namespace(NamespaceDecl {
                name,
                body: Vec::new(),
                braced: false,
            }),
        }
    }

    fn lower_class(&self, node: TsNode<'_>, kind: ClassKind) -> Node {
        match self.declared_name(node) {
            Some(name) => Node::ClassLike(ClassDecl {
                kind,
                name,
                namespaced_name: None,
                code: self.lower_code(node),
            }),
            None => Node::Statement(self.lower_code(node)),
        }
    }

    fn lower_const(&self, node: TsNode<'_>) -> Node {
        let mut items = Vec::new();
        let mut cursor = node.walk();

        for element in node.named_children(&mut cursor) {
            match element.kind() {
                "const_element" => {}
                "comment" => continue,
                _ => return Node::Statement(self.lower_code(node)),
            }

            let mut element_cursor = element.walk();
            let children: Vec<_> = element.children(&mut element_cursor).collect();
            let name = children.iter().find(|child| child.kind() == "name");
            let equals = children.iter().find(|child| child.kind() == "=");

            let (Some(name), Some(equals)) = (name, equals) else {
                return Node::Statement(self.lower_code(node));
            };

            let mut value = self.lower_range(element, equals.end_byte(), element.end_byte());
            value.trim();
            items.push(ConstItem {
                name: self.text(*name).to_string(),
                namespaced_name: None,
                value,
            });
        }

        if items.is_empty() {
            Node::Statement(self.lower_code(node))
        } else {
            Node::Const(ConstDecl { items })
        }
    }

    fn lower_code(&self, node: TsNode<'_>) -> Code {
        self.lower_range(node, node.start_byte(), node.end_byte())
    }

    /// Lowers the children of `node` lying within `start..end`, keeping the text between them
    fn lower_range(&self, node: TsNode<'_>, start: usize, end: usize) -> Code {
        let mut code = Code::new();
        let mut position = start;
        let mut cursor = node.walk();

        if cursor.goto_first_child() {
            loop {
                let child = cursor.node();
                if child.start_byte() >= position && child.end_byte() <= end {
                    code.push_text(self.slice(position, child.start_byte()));
                    self.lower_child(node, child, cursor.field_name(), &mut code);
                    position = child.end_byte();
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }

        code.push_text(self.slice(position, end));
        code
    }

    fn lower_child(&self, parent: TsNode<'_>, child: TsNode<'_>, field: Option<&str>, code: &mut Code) {
        let text = self.text(child);
        match child.kind() {
            "comment" => {
                if self.options.keep_comments {
                    code.push_text(text);
                } else if text.starts_with("/*") {
                    code.push_text(" ");
                }
            }
            "name" | "qualified_name" | "relative_name" => self.lower_name(parent, child, field, code),
            "named_type" if parent.kind() == "type_list" => {
                let inner = first_named_of(child, &["name", "qualified_name", "relative_name"])
                    .unwrap_or(child);
                code.push_node(Node::ClassRef(ClassRef {
                    name: self.name_ref(inner),
                    site: RefSite::Catch,
                }));
            }
            kind if TYPE_KINDS.contains(&kind) => code.push_node(Node::TypeHint(TypeHint {
                ty: self.lower_type(child),
                position: type_position(parent, field),
            })),
            "magic_constant" => match MagicConst::from_text(text) {
                Some(magic) => code.push_node(Node::MagicConst(magic)),
                None => code.push_text(text),
            },
            _ if child.child_count() == 0 => code.push_text(text),
            _ => code.append(self.lower_code(child)),
        }
    }

    fn name_ref(&self, node: TsNode<'_>) -> NameRef {
        NameRef::new(
            Name::parse(self.text(node)),
            Span::from_range(node.byte_range()),
        )
    }

    fn lower_name(&self, parent: TsNode<'_>, child: TsNode<'_>, field: Option<&str>, code: &mut Code) {
        let text = self.text(child);
        match self.name_site(parent, child, field) {
            NameSite::Identifier => code.push_text(text),
            NameSite::Class(site) => code.push_node(Node::ClassRef(ClassRef {
                name: self.name_ref(child),
                site,
            })),
            NameSite::Function => code.push_node(Node::FunctionRef(self.name_ref(child))),
            NameSite::Constant => match MagicConst::from_text(text) {
                Some(magic) => code.push_node(Node::MagicConst(magic)),
                None => code.push_node(Node::ConstRef(self.name_ref(child))),
            },
        }
    }

    fn name_site(&self, parent: TsNode<'_>, child: TsNode<'_>, field: Option<&str>) -> NameSite {
        let first = is_first_named(parent, child);
        let in_adaptation = parent
            .parent()
            .is_some_and(|grand| matches!(grand.kind(), "use_instead_of_clause" | "use_as_clause"));

        match parent.kind() {
            "function_call_expression" if first => NameSite::Function,
            "object_creation_expression" => NameSite::Class(RefSite::New),
            "scoped_call_expression" | "class_constant_access_expression" if first && in_adaptation => {
                NameSite::Class(RefSite::TraitAdaptation)
            }
            "scoped_call_expression" if first => NameSite::Class(RefSite::StaticCall),
            "scoped_property_access_expression" if first => NameSite::Class(RefSite::StaticProperty),
            "class_constant_access_expression" if first => NameSite::Class(RefSite::ClassConstant),
            "class_constant_access_expression" | "scoped_call_expression" => NameSite::Identifier,
            "binary_expression" | "instanceof_expression"
                if !first && self.is_instanceof(parent) =>
            {
                NameSite::Class(RefSite::Instanceof)
            }
            "base_clause" => NameSite::Class(RefSite::Extends),
            "class_interface_clause" => NameSite::Class(RefSite::Implements),
            "use_declaration" => NameSite::Class(RefSite::TraitUse),
            "use_instead_of_clause" if !first => NameSite::Class(RefSite::TraitAdaptation),
            "attribute" if first => NameSite::Class(RefSite::Attribute),
            "type_list" | "catch_clause" => NameSite::Class(RefSite::Catch),
            "const_element" if first => NameSite::Identifier,
            "use_instead_of_clause" | "attribute" | "function_call_expression" => NameSite::Identifier,
            _ if field == Some("name") || field == Some("label") => NameSite::Identifier,
            kind if IDENTIFIER_PARENTS.contains(&kind) => NameSite::Identifier,
            _ => NameSite::Constant,
        }
    }

    fn is_instanceof(&self, node: TsNode<'_>) -> bool {
        if node.kind() == "instanceof_expression" {
            return true;
        }
        if let Some(operator) = node.child_by_field_name("operator") {
            return self.text(operator).eq_ignore_ascii_case("instanceof");
        }
        let mut cursor = node.walk();
        let found = node
            .children(&mut cursor)
            .any(|child| !child.is_named() && child.kind().eq_ignore_ascii_case("instanceof"));
        found
    }

    fn lower_type(&self, node: TsNode<'_>) -> TypeRef {
        match node.kind() {
            "named_type" => match first_named_of(node, &["name", "qualified_name", "relative_name"]) {
                Some(inner) => self.named_type(inner),
                None => TypeRef::Verbatim(self.text(node).to_string()),
            },
            "name" | "qualified_name" | "relative_name" => self.named_type(node),
            "primitive_type" | "bottom_type" => TypeRef::Keyword(self.text(node).to_string()),
            "optional_type" => match first_type_child(node) {
                Some(inner) => TypeRef::Nullable(Box::new(self.lower_type(inner))),
                None => TypeRef::Verbatim(self.text(node).to_string()),
            },
            "union_type" | "disjunctive_normal_form_type" => TypeRef::Union(self.type_members(node)),
            "intersection_type" => TypeRef::Intersection(self.type_members(node)),
            _ => TypeRef::Verbatim(self.text(node).to_string()),
        }
    }

    fn type_members(&self, node: TsNode<'_>) -> Vec<TypeRef> {
        let mut cursor = node.walk();
        let members: Vec<_> = node
            .named_children(&mut cursor)
            .filter(|child| child.kind() != "comment")
            .map(|child| self.lower_type(child))
            .collect();
        members
    }

    fn named_type(&self, node: TsNode<'_>) -> TypeRef {
        let text = self.text(node);
        if is_reserved_type_name(text) {
            TypeRef::Keyword(text.to_string())
        } else {
            TypeRef::Named(self.name_ref(node))
        }
    }
}

fn first_named_of<'tree>(node: TsNode<'tree>, kinds: &[&str]) -> Option<TsNode<'tree>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| kinds.contains(&child.kind()));
    found
}

fn first_type_child(node: TsNode<'_>) -> Option<TsNode<'_>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment");
    found
}

fn is_first_named(parent: TsNode<'_>, child: TsNode<'_>) -> bool {
    let mut cursor = parent.walk();
    let first = parent
        .named_children(&mut cursor)
        .find(|candidate| !matches!(candidate.kind(), "comment" | "attribute_list"));
    first.is_some_and(|first| first.id() == child.id())
}

fn type_position(parent: TsNode<'_>, field: Option<&str>) -> TypePosition {
    if field == Some("return_type") {
        return TypePosition::Return;
    }
    match parent.kind() {
        "simple_parameter" | "variadic_parameter" | "property_promotion_parameter" => {
            TypePosition::Parameter
        }
        "property_declaration" => TypePosition::Property,
        "const_declaration" => TypePosition::Constant,
        "function_definition"
        | "method_declaration"
        | "anonymous_function"
        | "anonymous_function_creation_expression"
        | "arrow_function" => TypePosition::Return,
        _ => TypePosition::Other,
    }
}

/// `declare(strict_types=...);` with no other directive
fn is_strict_types_pragma(text: &str) -> bool {
    let compact: String = text
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    compact.starts_with("declare(strict_types=") && compact.ends_with(");") && !compact.contains(',')
}

fn skip_line(text: &str) -> &str {
    text.split_once('\n').map_or("", |(_, rest)| rest)
}

/// Wraps inline HTML so it survives inside a PHP block
fn inline_html(html: &str) -> Option<String> {
    (!html.trim().is_empty()).then(|| format!("?>{html}<?php"))
}

fn attach_comments(items: &mut Vec<Node>, mut node: Node, comments: String) {
    let code = match &mut node {
        Node::ClassLike(class) => Some(&mut class.code),
        Node::Function(function) => Some(&mut function.code),
        Node::Statement(code) => Some(code),
        _ => None,
    };
    match code {
        Some(code) => code.prepend_text(&comments),
        None => items.push(Node::Comment(comments.trim_end().to_string())),
    }
    items.push(node);
}

/// Moves the statements following `namespace Foo;` into its body
fn fold_unbraced_namespaces(items: Vec<Node>) -> Vec<Node> {
    let mut folded = Vec::with_capacity(items.len());
    let mut current: Option<NamespaceDecl> = None;

    for item in items {
        match item {
            Node::Namespace(namespace) => {
                if let Some(done) = current.take() {
                    folded.push(Node::Namespace(done));
                }
                if namespace.braced {
                    folded.push(Node::Namespace(namespace));
                } else {
                    current = Some(namespace);
                }
            }
            other => match current.as_mut() {
                Some(namespace) => namespace.body.push(other),
                None => folded.push(other),
            },
        }
    }

    if let Some(done) = current {
        folded.push(Node::Namespace(done));
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PhpLanguage;
    use pk_syntax::{Language, Piece, print_nodes};

    fn lower(source: &str) -> Vec<Node> {
        let language = PhpLanguage::new();
        let tree = language.parse(source).unwrap();
        language.lower(&tree, source, LowerOptions::default())
    }

    fn collect_refs(nodes: &[Node], out: &mut Vec<String>) {
        for node in nodes {
            match node {
                Node::Namespace(namespace) => collect_refs(&namespace.body, out),
                Node::ClassLike(class) => collect_code(&class.code, out),
                Node::Function(function) => collect_code(&function.code, out),
                Node::Statement(code) => collect_code(code, out),
                Node::Const(constant) => {
                    for item in &constant.items {
                        collect_code(&item.value, out);
                    }
                }
                Node::ClassRef(class_ref) => {
                    out.push(format!("{}:{}", class_ref.site, class_ref.name.name));
                }
                Node::FunctionRef(name) => out.push(format!("fn:{}", name.name)),
                Node::ConstRef(name) => out.push(format!("const:{}", name.name)),
                Node::TypeHint(hint) => out.push(format!("type:{}", pk_syntax::print::print_type(&hint.ty))),
                Node::MagicConst(magic) => out.push(format!("magic:{magic}")),
                _ => {}
            }
        }
    }

    fn collect_code(code: &Code, out: &mut Vec<String>) {
        for piece in &code.pieces {
            if let Piece::Node(node) = piece {
                collect_refs(std::slice::from_ref(node), out);
            }
        }
    }

    fn refs(source: &str) -> Vec<String> {
        let mut out = Vec::new();
        collect_refs(&lower(source), &mut out);
        out
    }

    #[test]
    fn test_unbraced_namespace_owns_following_statements() {
        let nodes = lower("<?php\nnamespace App;\nuse Lib\\Foo;\nclass A {}\nfunction f() {}\n");
        assert_eq!(nodes.len(), 1);
        let Node::Namespace(namespace) = &nodes[0] else {
            panic!("expected namespace, got {nodes:?}");
        };
        assert!(!namespace.braced);
        assert_eq!(namespace.name.as_ref().unwrap().joined(), "App");
        assert!(matches!(namespace.body[0], Node::Use(_)));
        assert!(matches!(&namespace.body[1], Node::ClassLike(class) if class.name == "A"));
        assert!(matches!(&namespace.body[2], Node::Function(function) if function.name == "f"));
    }

    #[test]
    fn test_strict_types_declare_is_recognized() {
        let nodes = lower("<?php\ndeclare(strict_types=1);\necho 1;\n");
        assert!(matches!(&nodes[0], Node::Declare(declare) if declare.strict_types));
        assert!(matches!(&nodes[1], Node::Statement(_)));
    }

    #[test]
    fn test_printing_is_lossless_for_declarations() {
        let source = "<?php\nfinal class A extends B implements C, \\D\\E {\n    public function f(?X $x): Y|null { return new Z(FOO, bar()); }\n}\n";
        let printed = print_nodes(&lower(source));
        assert_eq!(printed, source.trim_start_matches("<?php\n").trim_end());
    }

    #[test]
    fn test_reference_sites() {
        let found = refs(concat!(
            "<?php\n",
            "class A extends B implements C {\n",
            "    use T;\n",
            "    public function f(P $p): R {\n",
            "        try { S::call(); } catch (E1|E2 $e) {}\n",
            "        if ($p instanceof I) { return K::C + V::$prop; }\n",
            "        return helper(LIMIT, __DIR__);\n",
            "    }\n",
            "}\n",
        ));
        for expected in [
            "extends:B",
            "implements:C",
            "trait use:T",
            "type:P",
            "type:R",
            "static call:S",
            "catch:E1",
            "catch:E2",
            "instanceof:I",
            "class constant:K",
            "static property:V",
            "fn:helper",
            "const:LIMIT",
            "magic:__DIR__",
        ] {
            assert!(found.contains(&expected.to_string()), "missing {expected} in {found:?}");
        }
    }

    #[test]
    fn test_identifiers_are_not_references() {
        let found = refs("<?php\nclass A { const X = 1; public function run() { $this->go(); return self::X; } }\n");
        assert!(!found.iter().any(|found| found.ends_with(":run") || found.ends_with(":go")));
        assert!(!found.contains(&"const:X".to_string()));
    }

    #[test]
    fn test_const_declaration_items() {
        let nodes = lower("<?php\nconst A = 1, B = A + 1;\n");
        let Node::Const(constant) = &nodes[0] else {
            panic!("expected const, got {nodes:?}");
        };
        let names: Vec<_> = constant.items.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(pk_syntax::print_code(&constant.items[1].value), "A + 1");
    }

    #[test]
    fn test_comments_dropped_by_default() {
        let printed = print_nodes(&lower("<?php\n/** doc */\nclass A { /* inner */ }\n"));
        assert!(!printed.contains("doc"));
        assert!(!printed.contains("inner"));
    }

    #[test]
    fn test_comments_kept_on_request() {
        let source = "<?php\n/** doc */\nclass A {}\n";
        let language = PhpLanguage::new();
        let tree = language.parse(source).unwrap();
        let nodes = language.lower(&tree, source, LowerOptions { keep_comments: true });
        assert!(print_nodes(&nodes).starts_with("/** doc */\nclass A"));
    }
}
