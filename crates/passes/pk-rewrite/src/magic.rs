//! `__DIR__` and `__FILE__` handling

use pk_syntax::{MagicConst, Module, Node, VisitAction, Visitor, traverse};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::trace;

/// What to do with a path-relative magic constant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MagicConstantMode {
    /// Leave the constant in place; it will evaluate relative to the bundle
    #[default]
    Preserve,
    /// Replace it with the module's original directory or path
    Substitute,
    /// Fail the build when the constant is used
    Reject,
}

/// Errors raised by source rewrites
#[derive(Debug, Clone, Error)]
pub enum RewriteError {
    /// A rejected magic constant was found
    #[error("`{constant}` is not supported in {}", path.display())]
    UnsupportedMagicReference {
        /// Constant that was found
        constant: MagicConst,
        /// Module that uses it
        path: PathBuf,
    },
}

struct MagicConstantPass<'a> {
    path: &'a Path,
    dir: MagicConstantMode,
    file: MagicConstantMode,
    replaced: usize,
}

impl MagicConstantPass<'_> {
    fn value(&self, constant: MagicConst) -> String {
        match constant {
            MagicConst::Dir => self
                .path
                .parent()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
            _ => self.path.display().to_string(),
        }
    }
}

impl Visitor for MagicConstantPass<'_> {
    type Error = RewriteError;

    fn enter(&mut self, node: &mut Node) -> Result<VisitAction, RewriteError> {
        let Node::MagicConst(constant) = node else {
            return Ok(VisitAction::Continue);
        };
        let mode = match constant {
            MagicConst::Dir => self.dir,
            MagicConst::File => self.file,
            _ => return Ok(VisitAction::Continue),
        };

        match mode {
            MagicConstantMode::Preserve => Ok(VisitAction::Continue),
            MagicConstantMode::Substitute => {
                self.replaced += 1;
                trace!(%constant, module = %self.path.display(), "substituted magic constant");
                Ok(VisitAction::Replace(Node::StringLiteral(self.value(*constant))))
            }
            MagicConstantMode::Reject => Err(RewriteError::UnsupportedMagicReference {
                constant: *constant,
                path: self.path.to_path_buf(),
            }),
        }
    }
}

/// Applies the `__DIR__` and `__FILE__` modes to every occurrence in `module`.
///
/// Returns the number of substituted constants.
///
/// # Errors
///
/// Returns [`RewriteError::UnsupportedMagicReference`] for the first constant
/// whose mode is [`MagicConstantMode::Reject`].
pub fn substitute_magic_constants(
    module: &mut Module,
    dir: MagicConstantMode,
    file: MagicConstantMode,
) -> Result<usize, RewriteError> {
    if dir == MagicConstantMode::Preserve && file == MagicConstantMode::Preserve {
        return Ok(0);
    }

    let mut pass = MagicConstantPass {
        path: &module.path,
        dir,
        file,
        replaced: 0,
    };
    traverse(&mut module.items, &mut pass)?;
    Ok(pass.replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pk_span::FileId;
    use pk_syntax::{LowerOptions, print_nodes};

    fn module(source: &str) -> Module {
        pk_parser::parse_module(
            source,
            FileId::new(0),
            Path::new("/srv/lib/src/Loader.php"),
            LowerOptions::default(),
        )
        .into_module()
        .unwrap()
    }

    #[test]
    fn test_preserve_leaves_constants() {
        let mut module = module("<?php\n$a = __DIR__ . __FILE__;\n");
        let replaced = substitute_magic_constants(
            &mut module,
            MagicConstantMode::Preserve,
            MagicConstantMode::Preserve,
        )
        .unwrap();
        assert_eq!(replaced, 0);
        assert_eq!(print_nodes(&module.items), "$a = __DIR__ . __FILE__;");
    }

    #[test]
    fn test_substitute_dir_and_file() {
        let mut module = module("<?php\n$a = __DIR__ . __FILE__;\n");
        let replaced = substitute_magic_constants(
            &mut module,
            MagicConstantMode::Substitute,
            MagicConstantMode::Substitute,
        )
        .unwrap();
        assert_eq!(replaced, 2);
        assert_eq!(
            print_nodes(&module.items),
            "$a = '/srv/lib/src' . '/srv/lib/src/Loader.php';"
        );
    }

    #[test]
    fn test_reject_names_module() {
        let mut module = module("<?php\nrequire __DIR__ . '/x.php';\n");
        let error = substitute_magic_constants(
            &mut module,
            MagicConstantMode::Reject,
            MagicConstantMode::Preserve,
        )
        .unwrap_err();
        let RewriteError::UnsupportedMagicReference { constant, path } = &error;
        assert_eq!(*constant, MagicConst::Dir);
        assert_eq!(path, Path::new("/srv/lib/src/Loader.php"));
        assert!(error.to_string().contains("__DIR__"));
    }

    #[test]
    fn test_reject_file_only() {
        let mut module = module("<?php\n$a = __DIR__;\n");
        let replaced = substitute_magic_constants(
            &mut module,
            MagicConstantMode::Preserve,
            MagicConstantMode::Reject,
        )
        .unwrap();
        assert_eq!(replaced, 0);
    }
}
