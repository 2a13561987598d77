//! Enter/leave traversal over the AST
//!
//! A [`Visitor`] sees every [`Node`] twice: on the way down ([`Visitor::enter`])
//! and on the way up ([`Visitor::leave`]). The returned [`VisitAction`] steers
//! the walk and can edit the tree in place.

use crate::ast::{Code, Node, Piece};

/// Control signal returned by a visitor callback
#[derive(Debug, Clone, PartialEq)]
pub enum VisitAction {
    /// Keep the node and descend into it
    Continue,
    /// Keep the node, don't descend, still call `leave`
    SkipChildren,
    /// Keep the node, don't descend, don't call `leave`
    SkipSubtree,
    /// Drop the node from its containing list
    Remove,
    /// Substitute the node; on `enter` the replacement's children are walked
    Replace(Node),
}

/// Callbacks invoked for each node of a traversal
pub trait Visitor {
    /// Error that aborts the traversal
    type Error;

    /// Called before the node's children are walked
    fn enter(&mut self, _node: &mut Node) -> Result<VisitAction, Self::Error> {
        Ok(VisitAction::Continue)
    }

    /// Called after the node's children are walked
    fn leave(&mut self, _node: &mut Node) -> Result<VisitAction, Self::Error> {
        Ok(VisitAction::Continue)
    }
}

enum Outcome {
    Keep,
    Remove,
}

/// Walks a statement list depth first
///
/// # Errors
///
/// Returns the first error produced by the visitor
pub fn traverse<V: Visitor + ?Sized>(nodes: &mut Vec<Node>, visitor: &mut V) -> Result<(), V::Error> {
    let mut index = 0;
    while index < nodes.len() {
        match visit_node(&mut nodes[index], visitor)? {
            Outcome::Keep => index += 1,
            Outcome::Remove => {
                nodes.remove(index);
            }
        }
    }
    Ok(())
}

/// Walks the nodes embedded in a piece of code
///
/// # Errors
///
/// Returns the first error produced by the visitor
pub fn traverse_code<V: Visitor + ?Sized>(code: &mut Code, visitor: &mut V) -> Result<(), V::Error> {
    let mut index = 0;
    while index < code.pieces.len() {
        let outcome = match &mut code.pieces[index] {
            Piece::Node(node) => visit_node(node, visitor)?,
            Piece::Text(_) => Outcome::Keep,
        };
        match outcome {
            Outcome::Keep => index += 1,
            Outcome::Remove => {
                code.pieces.remove(index);
            }
        }
    }
    Ok(())
}

/// Walks the children of `node` without visiting `node` itself
///
/// # Errors
///
/// Returns the first error produced by the visitor
pub fn walk_children<V: Visitor + ?Sized>(node: &mut Node, visitor: &mut V) -> Result<(), V::Error> {
    match node {
        Node::Namespace(namespace) => traverse(&mut namespace.body, visitor),
        Node::Declare(declare) => traverse_code(&mut declare.code, visitor),
        Node::ClassLike(class) => traverse_code(&mut class.code, visitor),
        Node::Function(function) => traverse_code(&mut function.code, visitor),
        Node::Const(constant) => constant
            .items
            .iter_mut()
            .try_for_each(|item| traverse_code(&mut item.value, visitor)),
        Node::Statement(code) => traverse_code(code, visitor),
        Node::Use(_)
        | Node::Comment(_)
        | Node::ClassRef(_)
        | Node::FunctionRef(_)
        | Node::ConstRef(_)
        | Node::TypeHint(_)
        | Node::MagicConst(_)
        | Node::StringLiteral(_) => Ok(()),
    }
}

fn visit_node<V: Visitor + ?Sized>(node: &mut Node, visitor: &mut V) -> Result<Outcome, V::Error> {
    match visitor.enter(node)? {
        VisitAction::Continue => {}
        VisitAction::SkipChildren => return finish(node, visitor),
        VisitAction::SkipSubtree => return Ok(Outcome::Keep),
        VisitAction::Remove => return Ok(Outcome::Remove),
        VisitAction::Replace(replacement) => *node = replacement,
    }
    walk_children(node, visitor)?;
    finish(node, visitor)
}

fn finish<V: Visitor + ?Sized>(node: &mut Node, visitor: &mut V) -> Result<Outcome, V::Error> {
    match visitor.leave(node)? {
        VisitAction::Continue | VisitAction::SkipChildren | VisitAction::SkipSubtree => {
            Ok(Outcome::Keep)
        }
        VisitAction::Remove => Ok(Outcome::Remove),
        VisitAction::Replace(replacement) => {
            *node = replacement;
            Ok(Outcome::Keep)
        }
    }
}
