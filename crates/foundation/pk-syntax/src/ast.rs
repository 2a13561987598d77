//! Closed AST for PHP modules
//!
//! Declarations keep their source as [`Code`]: verbatim text with typed holes
//! for every construct that carries a name reference. Passes rewrite the holes
//! and the printer splices them back into the surrounding text.

use crate::name::{Name, NameRef};
use derive_more::Display;
use pk_span::FileId;
use std::path::PathBuf;

/// One parsed source module
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Module identity
    pub file: FileId,
    /// Path the module was read from
    pub path: PathBuf,
    /// Top-level statements; unbraced namespaces own the statements that follow them
    pub items: Vec<Node>,
}

impl Module {
    /// Whether any top-level statement opens a namespace
    pub fn has_namespaces(&self) -> bool {
        self.items
            .iter()
            .any(|item| matches!(item, Node::Namespace(_)))
    }
}

/// Statement and expression kinds that passes dispatch on
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `namespace Foo { ... }` or `namespace Foo;` followed by statements
    Namespace(NamespaceDecl),
    /// `use` import, single or grouped
    Use(UseDecl),
    /// `declare(...)` statement
    Declare(DeclareStmt),
    /// Class, interface, trait or enum declaration
    ClassLike(ClassDecl),
    /// Function declaration
    Function(FunctionDecl),
    /// Top-level `const` declaration
    Const(ConstDecl),
    /// Any other statement
    Statement(Code),
    /// Comment kept between top-level statements
    Comment(String),
    /// Reference to a class-like symbol
    ClassRef(ClassRef),
    /// Plain function call target
    FunctionRef(NameRef),
    /// Constant fetch
    ConstRef(NameRef),
    /// Type declaration on a parameter, return, property or class constant
    TypeHint(TypeHint),
    /// `__DIR__`, `__FILE__` and friends
    MagicConst(MagicConst),
    /// String literal produced by a pass
    StringLiteral(String),
}

impl Node {
    /// Shorthand for a statement made of plain text
    pub fn text_statement(text: impl Into<String>) -> Self {
        Self::Statement(Code::text(text))
    }
}

/// Source text interleaved with nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Code {
    /// Text and node segments in source order
    pub pieces: Vec<Piece>,
}

/// One segment of [`Code`]
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    /// Verbatim source text
    Text(String),
    /// Hole filled by a node
    Node(Node),
}

impl Code {
    /// Empty code
    pub fn new() -> Self {
        Self::default()
    }

    /// Code consisting of a single text piece
    pub fn text(text: impl Into<String>) -> Self {
        let mut code = Self::new();
        code.push_text(&text.into());
        code
    }

    /// Appends text, merging with a trailing text piece
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Piece::Text(last)) = self.pieces.last_mut() {
            last.push_str(text);
        } else {
            self.pieces.push(Piece::Text(text.to_string()));
        }
    }

    /// Appends a node hole
    pub fn push_node(&mut self, node: Node) {
        self.pieces.push(Piece::Node(node));
    }

    /// Appends all pieces of `other`
    pub fn append(&mut self, other: Self) {
        for piece in other.pieces {
            match piece {
                Piece::Text(text) => self.push_text(&text),
                Piece::Node(node) => self.push_node(node),
            }
        }
    }

    /// Inserts text before everything else
    pub fn prepend_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Piece::Text(first)) = self.pieces.first_mut() {
            first.insert_str(0, text);
        } else {
            self.pieces.insert(0, Piece::Text(text.to_string()));
        }
    }

    /// Strips whitespace from the leading and trailing text pieces
    pub fn trim(&mut self) {
        if let Some(Piece::Text(first)) = self.pieces.first_mut() {
            *first = first.trim_start().to_string();
        }
        if let Some(Piece::Text(last)) = self.pieces.last_mut() {
            *last = last.trim_end().to_string();
        }
        self.pieces
            .retain(|piece| !matches!(piece, Piece::Text(text) if text.is_empty()));
    }

    /// Whether there are no pieces
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Nodes directly embedded in this code
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.pieces.iter().filter_map(|piece| match piece {
            Piece::Node(node) => Some(node),
            Piece::Text(_) => None,
        })
    }
}

/// Namespace declaration
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDecl {
    /// `None` for the global `namespace { ... }` block
    pub name: Option<Name>,
    /// Statements inside the namespace
    pub body: Vec<Node>,
    /// Whether the source used the braced form
    pub braced: bool,
}

/// Import category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UseKind {
    /// Class-like import, `use A\B`
    #[display("class")]
    Normal,
    /// `use function`
    #[display("function")]
    Function,
    /// `use const`
    #[display("const")]
    Const,
}

/// One imported name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseItem {
    /// Imported name, relative to the group prefix if any
    pub name: Name,
    /// Explicit alias from `as`
    pub alias: Option<String>,
    /// Per-item kind inside a mixed group (`use A\{function f, const C}`)
    pub kind: Option<UseKind>,
}

impl UseItem {
    /// The short name this import introduces
    pub fn alias_name(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.name.last())
    }
}

/// `use` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseDecl {
    /// Statement-level import category
    pub kind: UseKind,
    /// Group prefix of `use Prefix\{...}`
    pub prefix: Option<Name>,
    /// Imported names
    pub items: Vec<UseItem>,
    /// Source text of the statement
    pub text: String,
}

impl UseDecl {
    /// Parses the text of a `use` import statement.
    ///
    /// Returns `None` when the text is not an import.
    pub fn parse(text: &str) -> Option<Self> {
        let body = strip_comments(text);
        let body = body.trim().strip_suffix(';').unwrap_or(body.trim()).trim();
        let body = strip_keyword(body, "use")?;

        let (kind, body) = leading_kind(body);
        let kind = kind.unwrap_or(UseKind::Normal);

        let (prefix, list) = match body.split_once('{') {
            Some((prefix, list)) => {
                let prefix = prefix.trim().trim_end_matches('\\');
                let list = list.trim().strip_suffix('}')?;
                (Some(Name::parse(prefix)), list)
            }
            None => (None, body),
        };

        let items = list
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                let (item_kind, item) = leading_kind(item);
                let mut words = item.split_whitespace();
                let name = Name::parse(words.next().unwrap_or_default());
                let alias = match (words.next(), words.next()) {
                    (Some(keyword), Some(alias)) if keyword.eq_ignore_ascii_case("as") => {
                        Some(alias.to_string())
                    }
                    _ => None,
                };
                UseItem {
                    name,
                    alias,
                    kind: item_kind,
                }
            })
            .collect::<Vec<_>>();

        if items.is_empty() {
            return None;
        }

        Some(Self {
            kind,
            prefix,
            items,
            text: text.to_string(),
        })
    }
}

fn strip_keyword<'text>(text: &'text str, keyword: &str) -> Option<&'text str> {
    let head = text.get(..keyword.len())?;
    let rest = &text[keyword.len()..];
    let boundary = rest.chars().next().is_none_or(|ch| !ch.is_alphanumeric() && ch != '_');
    (head.eq_ignore_ascii_case(keyword) && boundary).then(|| rest.trim_start())
}

fn leading_kind(text: &str) -> (Option<UseKind>, &str) {
    if let Some(rest) = strip_keyword(text, "function") {
        (Some(UseKind::Function), rest)
    } else if let Some(rest) = strip_keyword(text, "const") {
        (Some(UseKind::Const), rest)
    } else {
        (None, text)
    }
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map_or("", |(_, tail)| tail);
            out.push(' ');
        } else if rest.starts_with("//") || rest.starts_with('#') {
            rest = rest.split_once('\n').map_or("", |(_, tail)| tail);
            out.push('\n');
        } else {
            let mut chars = rest.chars();
            if let Some(ch) = chars.next() {
                out.push(ch);
            }
            rest = chars.as_str();
        }
    }
    out
}

/// `declare(...)` statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeclareStmt {
    /// Whether this is the file-wide `declare(strict_types=1);` pragma
    pub strict_types: bool,
    /// Statement text
    pub code: Code,
}

/// Flavor of a class-like declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ClassKind {
    /// `class`
    #[display("class")]
    Class,
    /// `interface`
    #[display("interface")]
    Interface,
    /// `trait`
    #[display("trait")]
    Trait,
    /// `enum`
    #[display("enum")]
    Enum,
}

/// Class, interface, trait or enum declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    /// Declaration flavor
    pub kind: ClassKind,
    /// Declared short name
    pub name: String,
    /// Fully-qualified name, stamped during alias registration
    pub namespaced_name: Option<Name>,
    /// Declaration text with its references as holes
    pub code: Code,
}

/// Function declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// Declared short name
    pub name: String,
    /// Fully-qualified name, stamped during alias registration
    pub namespaced_name: Option<Name>,
    /// Declaration text with its references as holes
    pub code: Code,
}

/// Top-level `const A = 1, B = 2;`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    /// Constants in declaration order
    pub items: Vec<ConstItem>,
}

/// One constant of a [`ConstDecl`]
#[derive(Debug, Clone, PartialEq)]
pub struct ConstItem {
    /// Declared short name
    pub name: String,
    /// Fully-qualified name, stamped during alias registration
    pub namespaced_name: Option<Name>,
    /// Initializer expression
    pub value: Code,
}

/// Syntactic position of a class reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RefSite {
    /// `extends` clause
    #[display("extends")]
    Extends,
    /// `implements` clause
    #[display("implements")]
    Implements,
    /// `new` expression
    #[display("new")]
    New,
    /// `instanceof` operand
    #[display("instanceof")]
    Instanceof,
    /// `A::f()`
    #[display("static call")]
    StaticCall,
    /// `A::$p`
    #[display("static property")]
    StaticProperty,
    /// `A::C`
    #[display("class constant")]
    ClassConstant,
    /// `catch` clause type
    #[display("catch")]
    Catch,
    /// `use` inside a class body
    #[display("trait use")]
    TraitUse,
    /// `insteadof` and `as` adaptation
    #[display("trait adaptation")]
    TraitAdaptation,
    /// `#[Attr]` name
    #[display("attribute")]
    Attribute,
}

/// Reference to a class-like symbol
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRef {
    /// Referenced name
    pub name: NameRef,
    /// Where the reference appears
    pub site: RefSite,
}

/// Where a type declaration appears
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePosition {
    /// Parameter type
    Parameter,
    /// Return type
    Return,
    /// Property type
    Property,
    /// Typed class constant
    Constant,
    /// Anywhere else
    Other,
}

/// Type declaration
#[derive(Debug, Clone, PartialEq)]
pub struct TypeHint {
    /// Declared type
    pub ty: TypeRef,
    /// Where the type appears
    pub position: TypePosition,
}

/// Structure of a type declaration
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// Class-like type
    Named(NameRef),
    /// `?T`
    Nullable(Box<TypeRef>),
    /// `A|B`
    Union(Vec<TypeRef>),
    /// `A&B`
    Intersection(Vec<TypeRef>),
    /// Built-in type such as `int` or `self`
    Keyword(String),
    /// Type text the lowering did not understand
    Verbatim(String),
}

/// Compile-time magic constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MagicConst {
    /// Directory of the module
    #[display("__DIR__")]
    Dir,
    /// Path of the module
    #[display("__FILE__")]
    File,
    /// Current line
    #[display("__LINE__")]
    Line,
    /// Enclosing class
    #[display("__CLASS__")]
    Class,
    /// Enclosing function
    #[display("__FUNCTION__")]
    Function,
    /// Enclosing method
    #[display("__METHOD__")]
    Method,
    /// Current namespace
    #[display("__NAMESPACE__")]
    Namespace,
    /// Enclosing trait
    #[display("__TRAIT__")]
    Trait,
}

impl MagicConst {
    /// Recognizes a magic constant by its (case-insensitive) spelling
    pub fn from_text(text: &str) -> Option<Self> {
        const ALL: [MagicConst; 8] = [
            MagicConst::Dir,
            MagicConst::File,
            MagicConst::Line,
            MagicConst::Class,
            MagicConst::Function,
            MagicConst::Method,
            MagicConst::Namespace,
            MagicConst::Trait,
        ];
        let text = text.trim();
        ALL.into_iter()
            .find(|magic| magic.to_string().eq_ignore_ascii_case(text))
    }
}
