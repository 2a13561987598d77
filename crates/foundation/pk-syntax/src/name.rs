//! PHP names and name references

use pk_span::Span;
use std::fmt;

/// Namespace separator
pub const SEPARATOR: char = '\\';

/// How a name was written at its use site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    /// `Foo`
    Unqualified,
    /// `Foo\Bar`
    Qualified,
    /// `\Foo\Bar`
    FullyQualified,
    /// `namespace\Foo`
    Relative,
}

/// A possibly qualified PHP name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    /// Name segments without separators
    pub parts: Vec<String>,
    /// How the name was written
    pub kind: NameKind,
}

impl Name {
    /// Parses a name as written in source, e.g. `\Foo\Bar` or `namespace\Baz`
    pub fn parse(text: &str) -> Self {
        let text: String = text.chars().filter(|ch| !ch.is_whitespace()).collect();

        let (kind, rest) = if let Some(rest) = text.strip_prefix(SEPARATOR) {
            (NameKind::FullyQualified, rest)
        } else if let Some(rest) = strip_prefix_ignore_case(&text, "namespace\\") {
            (NameKind::Relative, rest)
        } else {
            (NameKind::Unqualified, text.as_str())
        };

        let parts: Vec<String> = rest
            .split(SEPARATOR)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();

        let kind = if kind == NameKind::Unqualified && parts.len() > 1 {
            NameKind::Qualified
        } else {
            kind
        };

        Self { parts, kind }
    }

    /// A fully-qualified name from its segments
    pub fn fully_qualified<S: Into<String>>(parts: impl IntoIterator<Item = S>) -> Self {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
            kind: NameKind::FullyQualified,
        }
    }

    /// Prefixes `name` with `prefix`, producing a fully-qualified name.
    ///
    /// A missing prefix means the global namespace.
    pub fn concat(prefix: Option<&Self>, name: &Self) -> Self {
        let parts = prefix
            .map(|prefix| prefix.parts.clone())
            .unwrap_or_default()
            .into_iter()
            .chain(name.parts.iter().cloned());
        Self::fully_qualified(parts)
    }

    /// Leading segment
    pub fn first(&self) -> &str {
        self.parts.first().map_or("", String::as_str)
    }

    /// Trailing segment
    pub fn last(&self) -> &str {
        self.parts.last().map_or("", String::as_str)
    }

    /// Segments after the first, if any
    pub fn rest(&self) -> &[String] {
        self.parts.get(1..).unwrap_or_default()
    }

    /// Single segment without separators
    pub fn is_unqualified(&self) -> bool {
        self.kind == NameKind::Unqualified
    }

    /// Written with a leading separator
    pub fn is_fully_qualified(&self) -> bool {
        self.kind == NameKind::FullyQualified
    }

    /// Segments joined by the separator, without a leading separator
    pub fn joined(&self) -> String {
        self.parts.join("\\")
    }

    /// Lowercased joined form, the lookup key for case-insensitive symbols
    pub fn folded(&self) -> String {
        self.joined().to_lowercase()
    }

    /// `self`, `parent` and `static` refer to the enclosing class and are never resolved
    pub fn is_special_class_name(&self) -> bool {
        self.is_unqualified()
            && ["self", "parent", "static"]
                .iter()
                .any(|special| self.first().eq_ignore_ascii_case(special))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NameKind::FullyQualified => write!(formatter, "\\{}", self.joined()),
            NameKind::Relative => write!(formatter, "namespace\\{}", self.joined()),
            NameKind::Unqualified | NameKind::Qualified => write!(formatter, "{}", self.joined()),
        }
    }
}

fn strip_prefix_ignore_case<'text>(text: &'text str, prefix: &str) -> Option<&'text str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

/// Type names that are keywords rather than class references
pub fn is_reserved_type_name(text: &str) -> bool {
    const RESERVED: &[&str] = &[
        "array", "bool", "callable", "false", "float", "int", "iterable", "mixed", "never",
        "null", "object", "string", "true", "void",
    ];
    RESERVED.iter().any(|keyword| keyword.eq_ignore_ascii_case(text))
}

/// A reference to a named symbol at a use site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRef {
    /// The name as it will be printed
    pub name: Name,
    /// Fully-qualified name this reference is believed to denote
    pub resolved: Option<Name>,
    /// Location of the reference in its module
    pub span: Span,
}

impl NameRef {
    /// Unresolved reference to `name`
    pub fn new(name: Name, span: Span) -> Self {
        Self {
            name,
            resolved: None,
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!(Name::parse("Foo").kind, NameKind::Unqualified);
        assert_eq!(Name::parse("Foo\\Bar").kind, NameKind::Qualified);
        assert_eq!(Name::parse("\\Foo\\Bar").kind, NameKind::FullyQualified);

        let relative = Name::parse("namespace\\Baz");
        assert_eq!(relative.kind, NameKind::Relative);
        assert_eq!(relative.parts, vec!["Baz".to_string()]);
    }

    #[test]
    fn test_display_round_trips_written_form() {
        for text in ["Foo", "Foo\\Bar", "\\Foo\\Bar", "namespace\\Baz"] {
            assert_eq!(Name::parse(text).to_string(), text);
        }
    }

    #[test]
    fn test_concat_global_and_namespaced() {
        let name = Name::parse("Bar");
        assert_eq!(Name::concat(None, &name).to_string(), "\\Bar");

        let namespace = Name::parse("App\\Models");
        let qualified = Name::concat(Some(&namespace), &name);
        assert!(qualified.is_fully_qualified());
        assert_eq!(qualified.joined(), "App\\Models\\Bar");
    }

    #[test]
    fn test_special_class_names() {
        assert!(Name::parse("self").is_special_class_name());
        assert!(Name::parse("STATIC").is_special_class_name());
        assert!(!Name::parse("\\self").is_special_class_name());
        assert!(!Name::parse("Parental").is_special_class_name());
    }

    #[test]
    fn test_parse_ignores_whitespace() {
        let name = Name::parse("Foo \\ Bar");
        assert_eq!(name.parts, vec!["Foo".to_string(), "Bar".to_string()]);
    }
}
