//! Cache-busting orchestrator running discovery, rewriting and materialisation in order.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use tracing::{debug, info, warn};

use crate::asset_map::{AssetMap, build_asset_map};
use crate::config::Settings;
use crate::error::{CacheBustError, Result};
use crate::fs::FileSystem;
use crate::fs::glob::split_base;
use crate::materialize::{Materialized, materialize};
use crate::rewrite::rewrite_references;

/// Everything a completed run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheBustReport {
  /// Referenced assets and their busted names, in map order.
  pub assets: AssetMap,
  /// Target files whose references were rewritten.
  pub rewritten: Vec<PathBuf>,
  /// Manifest written for the run, if requested.
  pub manifest: Option<PathBuf>,
  /// Busted copies created.
  pub copied: Vec<PathBuf>,
  /// Originals removed after copying.
  pub deleted: Vec<PathBuf>,
}

/// High-level helper running a full cache-busting pass over a [`FileSystem`].
pub struct CacheBuster<'a, F: FileSystem + ?Sized> {
  fs: &'a F,
  settings: Settings,
  working_dir: PathBuf,
}

impl<'a, F: FileSystem + ?Sized> CacheBuster<'a, F> {
  /// Create a runner; target patterns resolve against the current directory.
  pub fn new(fs: &'a F, settings: Settings) -> Self {
    Self {
      fs,
      settings,
      working_dir: PathBuf::from("."),
    }
  }

  /// Resolve target patterns against `dir` instead of the current directory.
  pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.working_dir = dir.into();
    self
  }

  /// Validated settings driving the run.
  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  /// Expand the target patterns into file paths.
  ///
  /// Each pattern is walked from its own literal base directory, resolved
  /// against the working directory, so absolute and `../` patterns work. A
  /// `!pattern` drops files that earlier patterns selected. Positive patterns
  /// that select nothing are reported but do not fail the run.
  pub fn resolve_targets(&self) -> Result<Vec<PathBuf>> {
    let mut selected: IndexSet<PathBuf> = IndexSet::new();

    for pattern in &self.settings.targets {
      let (negated, body) = match pattern.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, pattern.as_str()),
      };
      let (base, glob) = split_base(body);
      let root = resolve_base(&self.working_dir, base);

      let matched: Vec<PathBuf> = self
        .expand_under(&root, glob)?
        .iter()
        .map(|relative| join_relative(&root, relative))
        .collect();

      if negated {
        selected.retain(|path| !matched.contains(path));
      } else {
        if matched.is_empty() {
          warn!(%pattern, "target pattern matched no files");
        }
        selected.extend(matched);
      }
    }

    Ok(selected.into_iter().collect())
  }

  fn expand_under(&self, root: &Path, glob: &str) -> Result<Vec<String>> {
    match self.fs.expand(root, &[glob.to_string()]) {
      Err(CacheBustError::Expand { source, .. }) if source.kind() == ErrorKind::NotFound => {
        debug!(root = %root.display(), "target base directory does not exist");
        Ok(Vec::new())
      }
      other => other,
    }
  }

  /// Run every stage. The first failure aborts the run; target files rewritten
  /// before it keep their new content.
  pub fn run(&self) -> Result<CacheBustReport> {
    let mut assets = build_asset_map(self.fs, &self.settings)?;
    let targets = self.resolve_targets()?;

    let outcome = rewrite_references(self.fs, &assets, &targets, self.settings.encoding)?;

    let discovered = assets.len();
    assets.retain_found(|original| outcome.found.contains(original));
    debug!(
      dropped = discovered - assets.len(),
      "pruned unreferenced assets"
    );

    let Materialized {
      manifest,
      copied,
      deleted,
    } = materialize(self.fs, &assets, &self.settings)?;

    info!(
      referenced = assets.len(),
      rewritten = outcome.rewritten.len(),
      "cache busting complete"
    );

    Ok(CacheBustReport {
      assets,
      rewritten: outcome.rewritten,
      manifest,
      copied,
      deleted,
    })
  }
}

fn resolve_base(working_dir: &Path, base: &str) -> PathBuf {
  if base.is_empty() {
    working_dir.to_path_buf()
  } else {
    join_relative(working_dir, base)
  }
}

fn join_relative(root: &Path, relative: &str) -> PathBuf {
  if root == Path::new(".") {
    PathBuf::from(relative)
  } else {
    root.join(relative)
  }
}
