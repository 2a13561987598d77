//! Removal of per-module strict-types pragmas

use pk_syntax::{Module, Node, VisitAction, Visitor, traverse};
use std::convert::Infallible;

#[derive(Default)]
struct StrictTypesPass {
    removed: usize,
}

impl Visitor for StrictTypesPass {
    type Error = Infallible;

    fn enter(&mut self, node: &mut Node) -> Result<VisitAction, Infallible> {
        Ok(match node {
            Node::Declare(declare) if declare.strict_types => {
                self.removed += 1;
                VisitAction::Remove
            }
            Node::Namespace(_) => VisitAction::Continue,
            _ => VisitAction::SkipSubtree,
        })
    }
}

/// Drops top-level `declare(strict_types=...);` statements, returning how many were removed
pub fn remove_strict_types(module: &mut Module) -> usize {
    let mut pass = StrictTypesPass::default();
    let Ok(()) = traverse(&mut module.items, &mut pass);
    pass.removed
}
