//! Source registry for the modules of one build
//!
//! Hands out a stable [`FileId`] per module path and caches module contents,
//! so a module that several units read (an entry that is also discovered, or a
//! source root shared by two units) is loaded from disk only once per session.

use anyhow::{Result, anyhow};
use pk_span::FileId;
use rustc_hash::FxHashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Registry of source modules, shared by reference across a session
#[derive(Default)]
pub struct VirtualFileSystem {
    inner: RwLock<VfsInner>,
}

#[derive(Default)]
struct VfsInner {
    modules: Vec<ModuleData>,
    paths: FxHashMap<PathBuf, FileId>,
}

/// Data associated with a module
#[derive(Clone, Debug)]
pub struct ModuleData {
    /// Path the module was registered under, lexically normalized
    pub path: PathBuf,
    /// Module contents, once loaded
    pub contents: Option<Arc<str>>,
}

/// Drops `.` components and folds `..` into the preceding component.
///
/// Symlinks are not resolved; two spellings of the same file through a link
/// get different ids.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                _ => normalized.push(component),
            },
            _ => normalized.push(component),
        }
    }
    normalized
}

impl VirtualFileSystem {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module path and returns its id.
    ///
    /// Registering the same path twice returns the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned
    pub fn register_file(&self, path: impl AsRef<Path>) -> Result<FileId> {
        let path = normalize(path.as_ref());
        let mut inner = self.inner.write().map_err(|_| anyhow!("Lock poisoned"))?;

        if let Some(&file_id) = inner.paths.get(&path) {
            return Ok(file_id);
        }

        let index = u32::try_from(inner.modules.len())?;
        let file_id = FileId::new(index);
        inner.modules.push(ModuleData {
            path: path.clone(),
            contents: None,
        });
        inner.paths.insert(path, file_id);

        Ok(file_id)
    }

    /// Loads module contents from disk, caching them.
    ///
    /// A leading byte order mark is dropped so the `<?php` tag stays first.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`std::io::Error`] if the module cannot be read
    /// or is not UTF-8, and an error for unknown ids or a poisoned lock.
    pub fn load_file(&self, file_id: FileId) -> Result<Arc<str>> {
        let path = {
            let inner = self.inner.read().map_err(|_| anyhow!("Lock poisoned"))?;
            let data = inner.module(file_id)?;
            if let Some(contents) = &data.contents {
                return Ok(Arc::clone(contents));
            }
            data.path.clone()
        };

        let text = std::fs::read_to_string(&path)?;
        let contents: Arc<str> = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(&text).into();

        let mut inner = self.inner.write().map_err(|_| anyhow!("Lock poisoned"))?;
        inner.module_mut(file_id)?.contents = Some(Arc::clone(&contents));
        Ok(contents)
    }

    /// Sets module contents without touching the disk
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned or the module doesn't exist
    pub fn set_file_contents(&self, file_id: FileId, contents: impl Into<Arc<str>>) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| anyhow!("Lock poisoned"))?;
        inner.module_mut(file_id)?.contents = Some(contents.into());
        Ok(())
    }

    /// Registered path of a module
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned or the module doesn't exist
    pub fn file_path(&self, file_id: FileId) -> Result<PathBuf> {
        let inner = self.inner.read().map_err(|_| anyhow!("Lock poisoned"))?;
        Ok(inner.module(file_id)?.path.clone())
    }

    /// Id of a registered path
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned
    pub fn file_id(&self, path: impl AsRef<Path>) -> Result<Option<FileId>> {
        let inner = self.inner.read().map_err(|_| anyhow!("Lock poisoned"))?;
        Ok(inner.paths.get(&normalize(path.as_ref())).copied())
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.inner.read().map_or(0, |inner| inner.modules.len())
    }

    /// Whether no modules are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VfsInner {
    fn module(&self, file_id: FileId) -> Result<&ModuleData> {
        self.modules
            .get(file_id.index() as usize)
            .ok_or_else(|| anyhow!("Unknown module: {file_id:?}"))
    }

    fn module_mut(&mut self, file_id: FileId) -> Result<&mut ModuleData> {
        self.modules
            .get_mut(file_id.index() as usize)
            .ok_or_else(|| anyhow!("Unknown module: {file_id:?}"))
    }
}
