//! Parser front end for PHP modules
//!
//! Runs the tree-sitter PHP grammar through the [`PhpLanguage`] adapter and
//! turns grammar errors into miette diagnostics naming the offending module.

pub mod error;

pub use error::ParseError;

use lang_php::PhpLanguage;
use miette::{NamedSource, SourceSpan};
use pk_span::FileId;
use pk_syntax::{Language, LowerOptions, Module};
use std::path::Path;
use tracing::debug;

/// Result of parsing a source module
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Lowered module, absent when the grammar could not run at all
    pub module: Option<Module>,
    /// Parse errors with detailed diagnostics
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// The module if it parsed cleanly, otherwise the first error
    ///
    /// # Errors
    ///
    /// Returns the first collected parse error
    pub fn into_module(self) -> Result<Module, ParseError> {
        match (self.module, self.errors.into_iter().next()) {
            (_, Some(error)) => Err(error),
            (Some(module), None) => Ok(module),
            (None, None) => Err(ParseError::ParseFailed {
                reason: "no syntax tree produced".to_string(),
            }),
        }
    }
}

/// Parse one PHP module
pub fn parse_module(source: &str, file: FileId, path: &Path, options: LowerOptions) -> ParseResult {
    let language = PhpLanguage::new();
    let name = path.display().to_string();

    match language.parse(source) {
        Ok(tree) => {
            let mut errors = Vec::new();
            let context = ErrorContext {
                source,
                name: &name,
            };

            if tree.root_node().has_error() {
                context.collect_errors(&tree.root_node(), &mut errors);
            }

            let items = language.lower(&tree, source, options);
            debug!(module = %name, statements = items.len(), errors = errors.len(), "parsed module");

            ParseResult {
                module: Some(Module {
                    file,
                    path: path.to_path_buf(),
                    items,
                }),
                errors,
            }
        }
        Err(err) => ParseResult {
            module: None,
            errors: vec![ParseError::ParseFailed {
                reason: format!("{err}"),
            }],
        },
    }
}

struct ErrorContext<'src> {
    source: &'src str,
    name: &'src str,
}

impl ErrorContext<'_> {
    fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.name, self.source.to_string())
    }

    /// Recursively collect error nodes from the tree
    fn collect_errors(&self, node: &tree_sitter::Node<'_>, errors: &mut Vec<ParseError>) {
        if node.is_error() {
            let start = node.start_byte();
            let end = node.end_byte();
            let span: SourceSpan = (start, end - start).into();

            let error = match node.parent() {
                Some(parent) => self.analyze_error_context(parent, node, span),
                None => self.unexpected(node, span),
            };
            errors.push(error);
        } else if node.is_missing() {
            errors.push(self.missing(node));
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_errors(&child, errors);
        }
    }

    fn unexpected(&self, node: &tree_sitter::Node<'_>, span: SourceSpan) -> ParseError {
        let text = self.source.get(node.byte_range()).unwrap_or_default();
        let token = text.lines().next().unwrap_or(text).trim().to_string();
        ParseError::UnexpectedToken {
            token,
            span,
            src: self.named_source(),
        }
    }

    fn missing(&self, node: &tree_sitter::Node<'_>) -> ParseError {
        let pos = node.start_byte();
        let expected = node.kind().to_string();

        let closing = match expected.as_str() {
            ")" => Some(('(', ')')),
            "}" => Some(('{', '}')),
            "]" => Some(('[', ']')),
            _ => None,
        };

        if let (Some((opening_char, closing_char)), Some(parent)) = (closing, node.parent()) {
            if let Some(opening_pos) = self.find_opening_delimiter(&parent, opening_char) {
                return ParseError::UnclosedDelimiter {
                    opening_char,
                    closing_char,
                    opening: (opening_pos, 1).into(),
                    expected_close: (pos, 0).into(),
                    src: self.named_source(),
                };
            }
        }

        let found = self
            .source
            .get(pos..)
            .and_then(|rest| rest.split_whitespace().next())
            .map_or_else(|| "end of file".to_string(), |word| word.chars().take(10).collect());

        ParseError::MissingToken {
            expected,
            found,
            span: (pos, 0).into(),
            src: self.named_source(),
        }
    }

    /// Analyze error context to provide more specific error messages
    fn analyze_error_context(
        &self,
        parent: tree_sitter::Node<'_>,
        error_node: &tree_sitter::Node<'_>,
        error_span: SourceSpan,
    ) -> ParseError {
        match parent.kind() {
            "formal_parameters" | "arguments" => match self.find_opening_delimiter(&parent, '(') {
                Some(opening_pos) => ParseError::UnclosedDelimiter {
                    opening_char: '(',
                    closing_char: ')',
                    opening: (opening_pos, 1).into(),
                    expected_close: error_span,
                    src: self.named_source(),
                },
                None => self.unexpected(error_node, error_span),
            },
            "compound_statement" | "declaration_list" => {
                match self.find_opening_delimiter(&parent, '{') {
                    Some(opening_pos) => ParseError::UnclosedDelimiter {
                        opening_char: '{',
                        closing_char: '}',
                        opening: (opening_pos, 1).into(),
                        expected_close: error_span,
                        src: self.named_source(),
                    },
                    None => self.unexpected(error_node, error_span),
                }
            }
            "class_declaration" | "interface_declaration" | "trait_declaration" => {
                ParseError::InvalidSyntax {
                    construct: format!("{} declaration", parent.kind().trim_end_matches("_declaration")),
                    suggestion: Some(
                        "declarations have the form: `class Name extends Base implements Iface { ... }`"
                            .to_string(),
                    ),
                    span: error_span,
                    src: self.named_source(),
                }
            }
            "function_definition" | "method_declaration" => ParseError::InvalidSyntax {
                construct: "function declaration".to_string(),
                suggestion: Some(
                    "function declarations have the form: `function name(params): type { body }`"
                        .to_string(),
                ),
                span: error_span,
                src: self.named_source(),
            },
            _ => self.unexpected(error_node, error_span),
        }
    }

    /// Find the position of an opening delimiter in a node
    fn find_opening_delimiter(&self, node: &tree_sitter::Node<'_>, delimiter: char) -> Option<usize> {
        let start = node.start_byte();
        let text = self.source.get(start..node.end_byte())?;
        text.char_indices()
            .find(|(_, character)| *character == delimiter)
            .map(|(idx, _)| start + idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pk_syntax::Node;

    fn parse(source: &str) -> ParseResult {
        parse_module(source, FileId::new(0), Path::new("src/Test.php"), LowerOptions::default())
    }

    #[test]
    fn test_parse_success() {
        let result = parse("<?php\nnamespace App;\nclass A {}\n");
        assert!(result.errors.is_empty());
        let module = result.into_module().unwrap();
        assert!(module.has_namespaces());
        assert!(matches!(module.items[0], Node::Namespace(_)));
    }

    #[test]
    fn test_parse_with_syntax_error() {
        let result = parse("<?php\nfunction broken( {\n    return 1;\n");
        assert!(!result.errors.is_empty());
        let error_msg = format!("{}", result.errors[0]);
        assert!(
            error_msg.contains("unclosed") || error_msg.contains("expected") || error_msg.contains("unexpected") || error_msg.contains("invalid"),
            "error should describe the problem: {error_msg}"
        );
        assert!(result.into_module().is_err());
    }

    #[test]
    fn test_error_names_module() {
        let result = parse("<?php\nclass {\n");
        let error = result.errors.first().cloned().unwrap();
        let report = miette::Report::new(error);
        let rendered = format!("{report:?}");
        assert!(rendered.contains("src/Test.php") || rendered.contains("parser::"), "{rendered}");
    }
}
