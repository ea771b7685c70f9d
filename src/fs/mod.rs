//! Filesystem capabilities consumed by the cache-busting pipeline.
//!
//! The pipeline never touches `std::fs` directly. Everything it needs (read,
//! write, copy, delete, glob expansion) goes through [`FileSystem`] so runs can
//! be exercised against [`MemoryFileSystem`] as well as the real disk.

mod disk;
pub mod glob;
mod memory;

use std::path::{Component, Path};

pub use disk::DiskFileSystem;
pub use memory::MemoryFileSystem;

use crate::error::Result;

/// Capability set required by a cache-busting run.
pub trait FileSystem {
  /// Read the full contents of a file.
  fn read(&self, path: &Path) -> Result<Vec<u8>>;

  /// Replace the contents of a file, creating parent directories as needed.
  fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

  /// Copy a file's bytes to a new path, creating parent directories as needed.
  fn copy(&self, from: &Path, to: &Path) -> Result<()>;

  /// Remove a file.
  fn delete(&self, path: &Path) -> Result<()>;

  /// Expand glob patterns against the files below `cwd`.
  ///
  /// Returned paths are relative to `cwd` and use forward slashes. They never
  /// name directories, and name hidden entries only when a pattern spells out
  /// the leading dot.
  fn expand(&self, cwd: &Path, patterns: &[String]) -> Result<Vec<String>>;
}

/// Render a relative path with forward slashes regardless of platform.
pub(crate) fn to_slash(path: &Path) -> String {
  path
    .components()
    .filter_map(|component| match component {
      Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
      _ => None,
    })
    .collect::<Vec<_>>()
    .join("/")
}
