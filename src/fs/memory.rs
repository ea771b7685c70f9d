//! In-memory [`FileSystem`] used to exercise runs without touching disk.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{Error, ErrorKind};
use std::path::{Component, Path, PathBuf};

use super::glob::expand_patterns;
use super::{FileSystem, to_slash};
use crate::error::{CacheBustError, Result};

/// File tree held in a map keyed by lexically normalised paths.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
  files: RefCell<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryFileSystem {
  /// Empty file tree.
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style insertion used when seeding fixtures.
  pub fn with_file(self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
    self.insert(path, contents);
    self
  }

  /// Create or replace a file.
  pub fn insert(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
    self
      .files
      .borrow_mut()
      .insert(normalize(path.as_ref()), contents.into());
  }

  /// Contents of a file, if present.
  pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
    self.files.borrow().get(&normalize(path.as_ref())).cloned()
  }

  /// Contents of a file decoded as UTF-8, if present.
  pub fn get_string(&self, path: impl AsRef<Path>) -> Option<String> {
    self
      .get(path)
      .and_then(|bytes| String::from_utf8(bytes).ok())
  }

  /// Whether a file exists at `path`.
  pub fn contains(&self, path: impl AsRef<Path>) -> bool {
    self.files.borrow().contains_key(&normalize(path.as_ref()))
  }

  /// Every stored path in sorted order.
  pub fn paths(&self) -> Vec<PathBuf> {
    self.files.borrow().keys().cloned().collect()
  }
}

impl FileSystem for MemoryFileSystem {
  fn read(&self, path: &Path) -> Result<Vec<u8>> {
    self.get(path).ok_or_else(|| CacheBustError::Read {
      path: path.to_path_buf(),
      source: not_found(),
    })
  }

  fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
    self.insert(path, contents);
    Ok(())
  }

  fn copy(&self, from: &Path, to: &Path) -> Result<()> {
    let contents = self.get(from).ok_or_else(|| CacheBustError::Copy {
      from: from.to_path_buf(),
      to: to.to_path_buf(),
      source: not_found(),
    })?;
    self.insert(to, contents);
    Ok(())
  }

  fn delete(&self, path: &Path) -> Result<()> {
    match self.files.borrow_mut().remove(&normalize(path)) {
      Some(_) => Ok(()),
      None => Err(CacheBustError::Delete {
        path: path.to_path_buf(),
        source: not_found(),
      }),
    }
  }

  fn expand(&self, cwd: &Path, patterns: &[String]) -> Result<Vec<String>> {
    let root = normalize(cwd);
    let candidates: Vec<String> = self
      .files
      .borrow()
      .keys()
      .filter_map(|path| path.strip_prefix(&root).ok())
      .map(to_slash)
      .filter(|relative| !relative.is_empty())
      .collect();

    expand_patterns(patterns, candidates)
  }
}

fn not_found() -> Error {
  Error::new(ErrorKind::NotFound, "no such file in memory filesystem")
}

/// Resolve `.` and `..` components without consulting the real filesystem.
fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        normalized.pop();
      }
      other => normalized.push(other.as_os_str()),
    }
  }
  normalized
}
