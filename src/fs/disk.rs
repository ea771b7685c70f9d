//! [`FileSystem`] backed by `std::fs`.

use std::fs;
use std::path::{Path, PathBuf};

use same_file::is_same_file;
use tracing::trace;

use super::glob::{expand_patterns, names_hidden_entries};
use super::{FileSystem, to_slash};
use crate::error::{CacheBustError, Result};

/// Real filesystem access relative to the process working directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSystem;

impl FileSystem for DiskFileSystem {
  fn read(&self, path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| CacheBustError::Read {
      path: path.to_path_buf(),
      source,
    })
  }

  fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
    let wrap = |source| CacheBustError::Write {
      path: path.to_path_buf(),
      source,
    };
    ensure_parent(path).map_err(wrap)?;
    fs::write(path, contents).map_err(wrap)
  }

  fn copy(&self, from: &Path, to: &Path) -> Result<()> {
    let wrap = |source| CacheBustError::Copy {
      from: from.to_path_buf(),
      to: to.to_path_buf(),
      source,
    };

    // Copying a file onto itself would truncate it.
    if to.exists() && is_same_file(from, to).map_err(wrap)? {
      trace!(from = %from.display(), "destination is the source file, skipping copy");
      return Ok(());
    }

    ensure_parent(to).map_err(wrap)?;
    fs::copy(from, to).map(|_| ()).map_err(wrap)
  }

  fn delete(&self, path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|source| CacheBustError::Delete {
      path: path.to_path_buf(),
      source,
    })
  }

  fn expand(&self, cwd: &Path, patterns: &[String]) -> Result<Vec<String>> {
    let walk_hidden = names_hidden_entries(patterns);
    let mut files = Vec::new();
    collect_files(cwd, Path::new(""), walk_hidden, &mut files)?;
    expand_patterns(patterns, files)
  }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
  match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
    _ => Ok(()),
  }
}

/// Walk `dir` collecting regular files as forward-slash paths relative to the walk root.
///
/// Hidden entries are only entered when some pattern could match them.
fn collect_files(
  dir: &Path,
  relative_root: &Path,
  walk_hidden: bool,
  files: &mut Vec<String>,
) -> Result<()> {
  let wrap = |source| CacheBustError::Expand {
    dir: dir.to_path_buf(),
    source,
  };

  for entry in fs::read_dir(dir).map_err(wrap)? {
    let entry = entry.map_err(wrap)?;
    let file_name = entry.file_name();
    if !walk_hidden && file_name.to_string_lossy().starts_with('.') {
      continue;
    }

    let next_relative: PathBuf = relative_root.join(&file_name);
    let file_type = entry.file_type().map_err(wrap)?;
    if file_type.is_dir() {
      collect_files(&entry.path(), &next_relative, walk_hidden, files)?;
    } else if entry.path().is_file() {
      files.push(to_slash(&next_relative));
    }
  }

  Ok(())
}
