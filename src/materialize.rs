//! Persist the outcome of a run: manifest, busted copies, optional deletions.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::asset_map::AssetMap;
use crate::config::Settings;
use crate::error::Result;
use crate::fs::FileSystem;

/// Files produced or removed while materialising a pruned map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Materialized {
  /// Manifest path, when one was written.
  pub manifest: Option<PathBuf>,
  /// Busted copies created for referenced assets.
  pub copied: Vec<PathBuf>,
  /// Originals removed after their copy succeeded.
  pub deleted: Vec<PathBuf>,
}

/// Serialise the map to the configured manifest, if any.
pub fn write_manifest<F: FileSystem + ?Sized>(
  fs: &F,
  map: &AssetMap,
  settings: &Settings,
) -> Result<Option<PathBuf>> {
  let Some(name) = &settings.manifest else {
    return Ok(None);
  };

  let path = settings.resolve(name);
  let json = serde_json::to_string(map)?;
  fs.write(&path, json.as_bytes())?;
  info!(manifest = %path.display(), entries = map.len(), "wrote manifest");
  Ok(Some(path))
}

/// Write the manifest, then copy every referenced asset to its busted path.
///
/// With `delete_originals` an original is removed only once its own copy has
/// been created, so a failure part-way never loses an asset.
pub fn materialize<F: FileSystem + ?Sized>(
  fs: &F,
  map: &AssetMap,
  settings: &Settings,
) -> Result<Materialized> {
  let mut result = Materialized {
    manifest: write_manifest(fs, map, settings)?,
    ..Materialized::default()
  };

  for (original, busted) in map {
    let from = settings.resolve(original);
    let to = settings.resolve(busted);
    fs.copy(&from, &to)?;
    debug!(from = %from.display(), to = %to.display(), "copied busted asset");
    result.copied.push(to);

    if settings.delete_originals {
      fs.delete(&from)?;
      debug!(path = %from.display(), "deleted original asset");
      result.deleted.push(from);
    }
  }

  info!(
    copied = result.copied.len(),
    deleted = result.deleted.len(),
    "materialised busted assets"
  );

  Ok(result)
}
