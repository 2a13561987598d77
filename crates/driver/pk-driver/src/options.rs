//! Bundling options shared by every unit of a build

use pk_registry::DuplicatePolicy;
use pk_rewrite::MagicConstantMode;
use pk_syntax::LowerOptions;
use serde::{Deserialize, Serialize};

/// Options applied to every unit compiled in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CompilerOptions {
    /// Write `declare(strict_types=1);` into the artifact header
    pub strict: bool,
    /// Keep comments in emitted code
    #[serde(rename = "comments")]
    pub keep_comments: bool,
    /// Handling of `__DIR__`
    pub dir_constant: MagicConstantMode,
    /// Handling of `__FILE__`
    pub file_constant: MagicConstantMode,
    /// Handling of symbols declared more than once in a unit
    pub duplicates: DuplicatePolicy,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            strict: true,
            keep_comments: false,
            dir_constant: MagicConstantMode::Preserve,
            file_constant: MagicConstantMode::Preserve,
            duplicates: DuplicatePolicy::Overwrite,
        }
    }
}

impl CompilerOptions {
    /// Lowering options derived from these settings
    pub fn lower_options(&self) -> LowerOptions {
        LowerOptions {
            keep_comments: self.keep_comments,
        }
    }
}
