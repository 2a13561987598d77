//! Pretty printer from the AST back to PHP source

use crate::ast::{Code, ConstDecl, Node, Piece, TypeRef};

/// Prints a statement list, one statement per line
pub fn print_nodes(nodes: &[Node]) -> String {
    let mut printer = Printer::default();
    printer.statements(nodes);
    printer.finish()
}

/// Prints a single node
pub fn print_node(node: &Node) -> String {
    let mut printer = Printer::default();
    printer.node(node);
    printer.finish()
}

/// Prints the text and holes of a piece of code
pub fn print_code(code: &Code) -> String {
    let mut printer = Printer::default();
    printer.code(code);
    printer.finish()
}

/// Prints a type declaration
pub fn print_type(ty: &TypeRef) -> String {
    let mut printer = Printer::default();
    printer.ty(ty, false);
    printer.finish()
}

/// Quotes `value` as a single-quoted PHP string literal
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\'' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

#[derive(Default)]
struct Printer {
    out: String,
}

impl Printer {
    fn finish(self) -> String {
        self.out
    }

    fn statements(&mut self, nodes: &[Node]) {
        for (index, node) in nodes.iter().enumerate() {
            if index > 0 {
                self.out.push('\n');
            }
            self.node(node);
        }
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::Namespace(namespace) => {
                self.out.push_str("namespace ");
                if let Some(name) = &namespace.name {
                    self.out.push_str(&name.joined());
                    self.out.push(' ');
                }
                self.out.push_str("{\n");
                self.statements(&namespace.body);
                if !namespace.body.is_empty() {
                    self.out.push('\n');
                }
                self.out.push('}');
            }
            Node::Use(decl) => self.out.push_str(&decl.text),
            Node::Declare(declare) => self.code(&declare.code),
            Node::ClassLike(class) => self.code(&class.code),
            Node::Function(function) => self.code(&function.code),
            Node::Const(constant) => self.constant(constant),
            Node::Statement(code) => self.code(code),
            Node::Comment(text) => self.out.push_str(text),
            Node::ClassRef(class_ref) => self.out.push_str(&class_ref.name.name.to_string()),
            Node::FunctionRef(name) | Node::ConstRef(name) => self.out.push_str(&name.name.to_string()),
            Node::TypeHint(hint) => self.ty(&hint.ty, false),
            Node::MagicConst(magic) => self.out.push_str(&magic.to_string()),
            Node::StringLiteral(value) => self.out.push_str(&quote_string(value)),
        }
    }

    fn code(&mut self, code: &Code) {
        for piece in &code.pieces {
            match piece {
                Piece::Text(text) => self.out.push_str(text),
                Piece::Node(node) => self.node(node),
            }
        }
    }

    fn constant(&mut self, constant: &ConstDecl) {
        self.out.push_str("const ");
        for (index, item) in constant.items.iter().enumerate() {
            if index > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&item.name);
            self.out.push_str(" = ");
            self.code(&item.value);
        }
        self.out.push(';');
    }

    fn ty(&mut self, ty: &TypeRef, nested: bool) {
        match ty {
            TypeRef::Named(name) => self.out.push_str(&name.name.to_string()),
            TypeRef::Nullable(inner) => {
                self.out.push('?');
                self.ty(inner, true);
            }
            TypeRef::Union(members) => self.members(members, '|', false),
            TypeRef::Intersection(members) => self.members(members, '&', nested),
            TypeRef::Keyword(text) | TypeRef::Verbatim(text) => self.out.push_str(text),
        }
    }

    fn members(&mut self, members: &[TypeRef], separator: char, parenthesize: bool) {
        if parenthesize {
            self.out.push('(');
        }
        for (index, member) in members.iter().enumerate() {
            if index > 0 {
                self.out.push(separator);
            }
            self.ty(member, true);
        }
        if parenthesize {
            self.out.push(')');
        }
    }
}
