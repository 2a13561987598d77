//! Per-unit compilation: read, rewrite, resolve, register, emit

use crate::error::BuildError;
use crate::options::CompilerOptions;
use pk_bundle::{bundle, render_entry};
use pk_registry::{NamespaceRegistry, extract};
use pk_resolve::{ResolveStats, Resolver};
use pk_rewrite::{remove_strict_types, substitute_magic_constants};
use pk_syntax::Module;
use pk_vfs::VirtualFileSystem;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Bundled text of one unit's sources, without the artifact header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledSources {
    /// Rendered namespace blocks
    pub text: String,
    /// Modules read
    pub modules: usize,
    /// Distinct symbols emitted
    pub symbols: usize,
    /// Reference resolution counters
    pub stats: ResolveStats,
}

/// Reads modules and runs the rewrite, resolve and bundle stages
pub struct Compiler {
    options: CompilerOptions,
    vfs: VirtualFileSystem,
}

impl Compiler {
    /// Compiler with an empty module cache
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            vfs: VirtualFileSystem::new(),
        }
    }

    /// Options this compiler was created with
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Module sources read so far
    pub fn vfs(&self) -> &VirtualFileSystem {
        &self.vfs
    }

    /// Parses one module and applies the strict-types and magic-constant passes
    ///
    /// # Errors
    ///
    /// Fails when the module cannot be read or parsed, or uses a rejected magic
    /// constant.
    pub fn read_module(&self, unit: &str, path: &Path) -> Result<Module, BuildError> {
        let file = self.vfs.register_file(path).map_err(|err| vfs_error(path, err))?;
        let source = self.vfs.load_file(file).map_err(|err| vfs_error(path, err))?;

        let mut module = pk_parser::parse_module(&source, file, path, self.options.lower_options())
            .into_module()
            .map_err(|source| BuildError::Parse {
                unit: unit.to_string(),
                path: path.to_path_buf(),
                source,
            })?;

        remove_strict_types(&mut module);
        substitute_magic_constants(&mut module, self.options.dir_constant, self.options.file_constant)
            .map_err(|err| BuildError::rewrite(unit, err))?;

        debug!(unit, module = %path.display(), statements = module.items.len(), "read module");
        Ok(module)
    }

    /// Resolves and bundles `modules` in order.
    ///
    /// Nothing is emitted until every module has been read, so a later module
    /// can still replace a declaration of an earlier one.
    ///
    /// # Errors
    ///
    /// Fails on the first module that cannot be read, or on a duplicate symbol
    /// under the `error` policy.
    pub fn compile_sources(&self, unit: &str, modules: &[PathBuf]) -> Result<CompiledSources, BuildError> {
        let mut registry = NamespaceRegistry::new(self.options.duplicates);
        let mut resolver = Resolver::new();
        let mut free = Vec::new();

        for path in modules {
            let mut module = self.read_module(unit, path)?;
            resolver.resolve_module(&mut module);
            free.extend(extract(module, &mut registry).map_err(|err| BuildError::registry(unit, err))?);
        }

        Ok(CompiledSources {
            text: bundle(&registry, &free),
            modules: modules.len(),
            symbols: registry.len(),
            stats: resolver.stats(),
        })
    }

    /// Renders a project's entry module, with references left as written
    ///
    /// # Errors
    ///
    /// Fails when the entry cannot be read or parsed.
    pub fn compile_entry(&self, unit: &str, path: &Path) -> Result<String, BuildError> {
        let module = self.read_module(unit, path)?;
        Ok(render_entry(&module))
    }
}

fn vfs_error(path: &Path, err: anyhow::Error) -> BuildError {
    let source = err.downcast::<io::Error>().unwrap_or_else(io::Error::other);
    BuildError::io(path, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pk_rewrite::MagicConstantMode;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, source: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn test_compile_sources_resolves_across_modules() {
        let dir = TempDir::new().unwrap();
        let modules = vec![
            write(&dir, "a.php", "<?php\ndeclare(strict_types=1);\nnamespace Lib;\nclass Base {}\n"),
            write(
                &dir,
                "b.php",
                "<?php\nnamespace App;\nuse Lib\\Base;\nclass Child extends Base {}\n",
            ),
        ];

        let compiled = Compiler::new(CompilerOptions::default())
            .compile_sources("app", &modules)
            .unwrap();

        assert_eq!(compiled.modules, 2);
        assert_eq!(compiled.symbols, 2);
        assert_eq!(
            compiled.text,
            "namespace Lib {\nclass Base {}\n}\nnamespace App {\nclass Child extends \\Lib\\Base {}\n}\n"
        );
        assert!(!compiled.text.contains("strict_types"));
    }

    #[test]
    fn test_conflicting_imports_across_modules() {
        let dir = TempDir::new().unwrap();
        let modules = vec![
            write(&dir, "a.php", "<?php\nnamespace App\\A;\nuse X\\Logger;\nclass A extends Logger {}\n"),
            write(&dir, "b.php", "<?php\nnamespace App\\B;\nuse Y\\Logger;\nclass B extends Logger {}\n"),
        ];

        let compiled = Compiler::new(CompilerOptions::default())
            .compile_sources("app", &modules)
            .unwrap();

        assert!(compiled.text.contains("class A extends \\X\\Logger {}"));
        assert!(compiled.text.contains("class B extends \\Y\\Logger {}"));
    }

    #[test]
    fn test_parse_error_names_module() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.php", "<?php\nclass {\n");
        let error = Compiler::new(CompilerOptions::default())
            .compile_sources("lib", &[path.clone()])
            .unwrap_err();

        let BuildError::Parse { unit, path: failed, .. } = error else {
            panic!("expected parse error, got {error:?}");
        };
        assert_eq!(unit, "lib");
        assert_eq!(failed, path);
    }

    #[test]
    fn test_rejected_magic_constant() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "paths.php", "<?php\n$root = __DIR__;\n");
        let options = CompilerOptions {
            dir_constant: MagicConstantMode::Reject,
            ..CompilerOptions::default()
        };

        let error = Compiler::new(options).read_module("lib", &path).unwrap_err();
        assert!(matches!(error, BuildError::UnsupportedMagicReference { .. }));
    }

    #[test]
    fn test_missing_module_is_io_error() {
        let dir = TempDir::new().unwrap();
        let error = Compiler::new(CompilerOptions::default())
            .read_module("lib", &dir.path().join("absent.php"))
            .unwrap_err();
        let BuildError::Io { source, .. } = error else {
            panic!("expected io error, got {error:?}");
        };
        assert_eq!(source.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_entry_is_not_resolved() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "main.php", "<?php\nuse App\\Kernel;\nKernel::boot();\n");
        let entry = Compiler::new(CompilerOptions::default())
            .compile_entry("app", &path)
            .unwrap();
        assert_eq!(entry, "namespace {\nuse App\\Kernel;\nKernel::boot();\n}\n");
    }
}
