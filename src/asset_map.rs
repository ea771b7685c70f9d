//! Discover assets and map each original path to its fingerprinted name.

use std::fmt;

use indexmap::IndexMap;
use indexmap::map::Iter;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::Result;
use crate::fs::FileSystem;
use crate::hashing::content_digest;
use crate::naming::busted_name;

/// Ordered mapping from original asset path to busted name.
///
/// Iteration follows insertion order, which the rewriter depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AssetMap {
  entries: IndexMap<String, String>,
}

impl AssetMap {
  /// Empty map.
  pub fn new() -> Self {
    Self::default()
  }

  /// Append an entry, keeping the position of an existing key.
  pub fn insert(&mut self, original: impl Into<String>, busted: impl Into<String>) {
    self.entries.insert(original.into(), busted.into());
  }

  /// Busted name for `original`.
  pub fn get(&self, original: &str) -> Option<&str> {
    self.entries.get(original).map(String::as_str)
  }

  /// Whether `original` has an entry.
  pub fn contains(&self, original: &str) -> bool {
    self.entries.contains_key(original)
  }

  /// Number of entries.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Whether the map has no entries.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Entries in insertion order.
  pub fn iter(&self) -> Iter<'_, String, String> {
    self.entries.iter()
  }

  /// Original paths in insertion order.
  pub fn originals(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  /// Drop every entry whose original path fails `keep`, preserving order.
  pub fn retain_found<F>(&mut self, mut keep: F)
  where
    F: FnMut(&str) -> bool,
  {
    self.entries.retain(|original, _| keep(original));
  }
}

impl<'a> IntoIterator for &'a AssetMap {
  type Item = (&'a String, &'a String);
  type IntoIter = Iter<'a, String, String>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

impl FromIterator<(String, String)> for AssetMap {
  fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
    Self {
      entries: iter.into_iter().collect(),
    }
  }
}

impl fmt::Display for AssetMap {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{{")?;
    for (original, busted) in &self.entries {
      writeln!(f, "  {original:?}: {busted:?},")?;
    }
    write!(f, "}}")
  }
}

/// Sort discovered paths in descending lexicographic order.
///
/// A path that extends another (`bundle.js.map` after `bundle.js`) sorts first,
/// so its references are rewritten before the shorter name can match inside it.
pub fn discovery_order(mut paths: Vec<String>) -> Vec<String> {
  paths.sort_unstable_by(|a, b| b.cmp(a));
  paths.dedup();
  paths
}

/// Discover, order and fingerprint every asset selected by `settings.assets`.
///
/// Any unreadable asset aborts the build; no partial map is returned.
pub fn build_asset_map<F: FileSystem + ?Sized>(fs: &F, settings: &Settings) -> Result<AssetMap> {
  let discovered = fs.expand(&settings.base_dir, &settings.assets)?;
  info!(
    count = discovered.len(),
    base_dir = %settings.base_dir.display(),
    "discovered assets"
  );

  let mut map = AssetMap::new();
  for original in discovery_order(discovered) {
    let bytes = fs.read(&settings.resolve(&original))?;
    let digest = content_digest(
      &bytes,
      settings.algorithm,
      settings.length,
      settings.override_hash.as_deref(),
    );
    let busted = busted_name(&original, &digest, &settings.separator);
    debug!(%original, %busted, "fingerprinted asset");
    map.insert(original, busted);
  }

  Ok(map)
}
