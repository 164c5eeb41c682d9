//! Filesystem access.
//!
//! Loaders only need to list directories and read whole files. Putting
//! that behind [`BudgetFs`] lets tests feed an in-memory tree
//! ([`MemoryFs`]) through the same discovery and merge code that runs
//! against a real budget ([`OsFs`]). Writes always go to the real
//! filesystem through [`write_json_atomic`].

use crate::error::{BudgetError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// One child of a listed directory.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

impl DirEntry {
    /// Final path component as UTF-8, if it has one.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

/// Directory listing and file reads.
///
/// Listing order is unspecified; callers sort where order matters.
pub trait BudgetFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;
}

impl<T: BudgetFs + ?Sized> BudgetFs for &T {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        (**self).list_dir(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        (**self).is_dir(path)
    }
}

/// The real filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsFs;

impl BudgetFs for OsFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            entries.push(DirEntry {
                path: entry.path(),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// In-memory file tree. Directories are implied by file paths and can
/// also be added empty.
#[derive(Clone, Debug, Default)]
pub struct MemoryFs {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file, creating its parent directories.
    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.files.insert(path, content.into());
    }

    /// Add an empty directory and its ancestors.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        for ancestor in path.as_ref().ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }

    pub fn remove(&mut self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.remove(path.as_ref())
    }
}

impl BudgetFs for MemoryFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        if !self.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                path.display().to_string(),
            ));
        }

        let dirs = self
            .dirs
            .iter()
            .filter(|d| d.parent() == Some(path))
            .map(|d| DirEntry {
                path: d.clone(),
                is_dir: true,
            });
        let files = self
            .files
            .keys()
            .filter(|f| f.parent() == Some(path))
            .map(|f| DirEntry {
                path: f.clone(),
                is_dir: false,
            });

        Ok(dirs.chain(files).collect())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }
}

/// Read a file, mapping a missing path to `NotFound`.
pub(crate) fn read_file(fs: &dyn BudgetFs, path: &Path) -> Result<Vec<u8>> {
    fs.read(path).map_err(|e| BudgetError::from_io(path, e))
}

/// List a directory, mapping a missing path to `NotFound`.
pub(crate) fn list_dir(fs: &dyn BudgetFs, path: &Path) -> Result<Vec<DirEntry>> {
    fs.list_dir(path).map_err(|e| BudgetError::from_io(path, e))
}

/// Files directly in `dir` whose extension is `extension`, sorted by path.
pub(crate) fn files_with_extension(
    fs: &dyn BudgetFs,
    dir: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = list_dir(fs, dir)?
        .into_iter()
        .filter(|e| !e.is_dir)
        .map(|e| e.path)
        .filter(|p| p.extension().and_then(|x| x.to_str()) == Some(extension))
        .collect();
    paths.sort();
    Ok(paths)
}

/// How [`write_json_atomic`] treats an existing target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Overwrite {
    Replace,
    Refuse,
}

/// Write `value` as pretty JSON to `path`.
///
/// The document is written to a temp file in the target directory and then
/// renamed into place. The temp file is removed on every failure path, so
/// the target is either untouched or complete.
pub(crate) fn write_json_atomic<T: Serialize>(
    path: &Path,
    value: &T,
    overwrite: Overwrite,
) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| BudgetError::structure("a parent directory", path.display().to_string()))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| BudgetError::from_io(dir, e))?;
    serde_json::to_writer_pretty(&mut temp, value)?;
    temp.write_all(b"\n")?;
    temp.as_file().sync_all()?;

    match overwrite {
        Overwrite::Replace => {
            temp.persist(path).map_err(|e| BudgetError::Io(e.error))?;
        }
        Overwrite::Refuse => {
            temp.persist_noclobber(path).map_err(|e| {
                if e.error.kind() == io::ErrorKind::AlreadyExists {
                    BudgetError::structure(
                        "no existing file",
                        path.display().to_string(),
                    )
                } else {
                    BudgetError::Io(e.error)
                }
            })?;
        }
    }
    Ok(())
}
