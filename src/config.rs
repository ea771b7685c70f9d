//! Options accepted by a cache-busting run and their validated form.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CacheBustError, Result};
use crate::hashing::Algorithm;

/// Config file looked up by [`CacheBustOptions::discover`].
pub const DEFAULT_CONFIG_FILE: &str = "cachebust.json";

/// Manifest file name used when `jsonOutput` is `true`.
pub const DEFAULT_MANIFEST_FILE: &str = "grunt-cache-bust.json";

/// Raw options as written in a config file or assembled by a host.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheBustOptions {
  /// Hash algorithm used to fingerprint assets.
  pub algorithm: Algorithm,
  /// Root that asset patterns, busted copies and the manifest resolve against.
  pub base_dir: PathBuf,
  /// Remove each referenced original once its busted copy exists.
  pub delete_originals: bool,
  /// Text encoding of target files.
  pub encoding: Encoding,
  /// `false`, `true`, or a manifest path resolved against `base_dir`.
  pub json_output: JsonOutput,
  /// Manifest file name used when `json_output` is `true`.
  pub json_output_filename: String,
  /// Number of hex characters kept from each digest.
  pub length: usize,
  /// Text inserted between the file stem and the digest.
  pub separator: String,
  /// Fixed digest applied to every asset instead of hashing content.
  pub hash: Option<String>,
  /// Glob patterns, relative to `base_dir`, selecting candidate assets.
  pub assets: Vec<String>,
  /// Groups of target files whose references are rewritten.
  pub files: Vec<FileGroup>,
}

impl Default for CacheBustOptions {
  fn default() -> Self {
    Self {
      algorithm: Algorithm::Md5,
      base_dir: PathBuf::from("./"),
      delete_originals: false,
      encoding: Encoding::Utf8,
      json_output: JsonOutput::Enabled(false),
      json_output_filename: DEFAULT_MANIFEST_FILE.into(),
      length: 16,
      separator: ".".into(),
      hash: None,
      assets: Vec::new(),
      files: Vec::new(),
    }
  }
}

/// Target file patterns, expanded relative to the working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileGroup {
  /// Glob patterns naming target files.
  #[serde(default)]
  pub src: Vec<String>,
}

/// The `jsonOutput` option: a flag or an explicit manifest file name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum JsonOutput {
  /// `true` writes the default manifest file name, `false` writes nothing.
  Enabled(bool),
  /// Manifest path, resolved against the base directory.
  File(String),
}

/// Text encodings supported for target files.
///
/// Asset paths are encoded into the target's encoding before matching, so
/// target content itself is never decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Encoding {
  /// UTF-8. Bytes that are not valid UTF-8 are carried through untouched.
  #[default]
  #[serde(rename = "utf8", alias = "utf-8", alias = "UTF-8")]
  Utf8,
  /// ISO-8859-1, where every byte maps to the code point of the same value.
  #[serde(rename = "latin1", alias = "binary", alias = "iso-8859-1")]
  Latin1,
}

impl Encoding {
  /// Encode text back into bytes, returning `None` for unrepresentable characters.
  pub fn encode(self, text: &str) -> Option<Vec<u8>> {
    match self {
      Self::Utf8 => Some(text.as_bytes().to_vec()),
      Self::Latin1 => text
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect(),
    }
  }
}

impl CacheBustOptions {
  /// Load options from `cachebust.json` in `dir`, or defaults when it does not exist.
  pub fn discover(dir: &Path) -> Result<Self> {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    match Self::from_path(&candidate) {
      Err(CacheBustError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
        Ok(Self::default())
      }
      other => other,
    }
  }

  /// Read options from a specific JSON file.
  pub fn from_path(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path).map_err(|source| CacheBustError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| CacheBustError::Config {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Check the options once and resolve them into [`Settings`].
  pub fn validate(self) -> Result<Settings> {
    if self.length == 0 {
      return Err(CacheBustError::Invalid(
        "`length` must be at least 1".into(),
      ));
    }

    if self.assets.iter().all(|pattern| pattern.trim().is_empty()) {
      return Err(CacheBustError::Invalid(
        "`assets` must name at least one pattern".into(),
      ));
    }

    let manifest = match &self.json_output {
      JsonOutput::Enabled(false) => None,
      JsonOutput::Enabled(true) => Some(self.json_output_filename.clone()),
      JsonOutput::File(name) => Some(name.clone()),
    };
    let manifest = manifest.map(|name| check_manifest_name(&name)).transpose()?;

    let override_hash = self.hash.filter(|value| !value.is_empty());

    let targets = self
      .files
      .into_iter()
      .flat_map(|group| group.src)
      .filter(|pattern| !pattern.trim().is_empty())
      .collect();

    Ok(Settings {
      algorithm: self.algorithm,
      base_dir: self.base_dir,
      delete_originals: self.delete_originals,
      encoding: self.encoding,
      manifest,
      length: self.length,
      separator: self.separator,
      override_hash,
      assets: self.assets,
      targets,
    })
  }
}

fn check_manifest_name(name: &str) -> Result<PathBuf> {
  if name.trim().is_empty() {
    return Err(CacheBustError::Invalid(
      "manifest file name must not be empty".into(),
    ));
  }
  Ok(PathBuf::from(name))
}

/// Options after validation, ready to drive a run.
#[derive(Debug, Clone)]
pub struct Settings {
  /// Hash algorithm used to fingerprint assets.
  pub algorithm: Algorithm,
  /// Root for asset discovery, copies and the manifest.
  pub base_dir: PathBuf,
  /// Remove referenced originals after copying.
  pub delete_originals: bool,
  /// Text encoding of target files.
  pub encoding: Encoding,
  /// Manifest path, joined onto `base_dir`, when one should be written.
  pub manifest: Option<PathBuf>,
  /// Number of hex characters kept from each digest.
  pub length: usize,
  /// Text inserted between the file stem and the digest.
  pub separator: String,
  /// Fixed digest for every asset.
  pub override_hash: Option<String>,
  /// Asset glob patterns relative to `base_dir`.
  pub assets: Vec<String>,
  /// Target glob patterns relative to the working directory.
  pub targets: Vec<String>,
}

impl Settings {
  /// Join `relative` onto the base directory. Absolute paths are kept as is.
  pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
    self.base_dir.join(relative)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn with_assets() -> CacheBustOptions {
    CacheBustOptions {
      assets: vec!["**/*.css".into()],
      ..CacheBustOptions::default()
    }
  }

  #[test]
  fn defaults_match_documented_values() {
    let options = CacheBustOptions::default();
    assert_eq!(options.algorithm, Algorithm::Md5);
    assert_eq!(options.base_dir, PathBuf::from("./"));
    assert!(!options.delete_originals);
    assert_eq!(options.encoding, Encoding::Utf8);
    assert_eq!(options.json_output, JsonOutput::Enabled(false));
    assert_eq!(options.json_output_filename, "grunt-cache-bust.json");
    assert_eq!(options.length, 16);
    assert_eq!(options.separator, ".");
    assert!(options.hash.is_none());
  }

  #[test]
  fn parses_camel_case_json() {
    let options: CacheBustOptions = serde_json::from_str(
      r#"{
        "algorithm": "sha1",
        "baseDir": "dist",
        "deleteOriginals": true,
        "encoding": "latin1",
        "jsonOutput": "map.json",
        "length": 8,
        "separator": "-",
        "hash": "123",
        "assets": ["**/*.js"],
        "files": [{ "src": ["dist/index.html"] }]
      }"#,
    )
    .unwrap();

    assert_eq!(options.algorithm, Algorithm::Sha1);
    assert_eq!(options.base_dir, PathBuf::from("dist"));
    assert!(options.delete_originals);
    assert_eq!(options.encoding, Encoding::Latin1);
    assert_eq!(options.json_output, JsonOutput::File("map.json".into()));
    assert_eq!(options.json_output_filename, DEFAULT_MANIFEST_FILE);
    assert_eq!(options.files, vec![FileGroup {
      src: vec!["dist/index.html".into()]
    }]);
  }

  #[test]
  fn json_output_true_uses_default_filename() {
    let options = CacheBustOptions {
      json_output: JsonOutput::Enabled(true),
      ..with_assets()
    };
    let settings = options.validate().unwrap();
    assert_eq!(settings.manifest, Some(PathBuf::from(DEFAULT_MANIFEST_FILE)));

    let settings = with_assets().validate().unwrap();
    assert!(settings.manifest.is_none());
  }

  #[test]
  fn rejects_invalid_options() {
    let zero_length = CacheBustOptions {
      length: 0,
      ..with_assets()
    };
    assert!(matches!(
      zero_length.validate(),
      Err(CacheBustError::Invalid(_))
    ));

    assert!(matches!(
      CacheBustOptions::default().validate(),
      Err(CacheBustError::Invalid(_))
    ));

    let unnamed_manifest = CacheBustOptions {
      json_output: JsonOutput::File(" ".into()),
      ..with_assets()
    };
    assert!(matches!(
      unnamed_manifest.validate(),
      Err(CacheBustError::Invalid(_))
    ));
  }

  #[test]
  fn manifest_may_live_outside_base_dir() {
    let parent = CacheBustOptions {
      base_dir: "dist".into(),
      json_output: JsonOutput::File("../manifest.json".into()),
      ..with_assets()
    }
    .validate()
    .unwrap();
    let manifest = parent.manifest.clone().unwrap();
    assert_eq!(parent.resolve(manifest), PathBuf::from("dist/../manifest.json"));

    let dir = tempdir().unwrap();
    let absolute_path = dir.path().join("assets.json");
    let absolute = CacheBustOptions {
      base_dir: "dist".into(),
      json_output: JsonOutput::File(absolute_path.to_string_lossy().into_owned()),
      ..with_assets()
    }
    .validate()
    .unwrap();
    let manifest = absolute.manifest.clone().unwrap();
    assert_eq!(absolute.resolve(manifest), absolute_path);
  }

  #[test]
  fn empty_override_hash_is_ignored() {
    let options = CacheBustOptions {
      hash: Some(String::new()),
      ..with_assets()
    };
    assert!(options.validate().unwrap().override_hash.is_none());
  }

  #[test]
  fn flattens_target_groups() {
    let options = CacheBustOptions {
      files: vec![
        FileGroup {
          src: vec!["a.html".into(), " ".into()],
        },
        FileGroup {
          src: vec!["b/*.html".into()],
        },
      ],
      ..with_assets()
    };
    let settings = options.validate().unwrap();
    assert_eq!(settings.targets, vec![
      "a.html".to_string(),
      "b/*.html".to_string()
    ]);
  }

  #[test]
  fn encodes_asset_paths_per_encoding() {
    assert_eq!(Encoding::Latin1.encode("aéz"), Some(vec![b'a', 0xe9, b'z']));
    assert_eq!(Encoding::Latin1.encode("€"), None);
    assert_eq!(Encoding::Utf8.encode("aé"), Some(vec![b'a', 0xc3, 0xa9]));
  }

  #[test]
  fn encoding_accepts_node_aliases() {
    let encodings: Vec<Encoding> =
      serde_json::from_str(r#"["utf8", "utf-8", "latin1", "binary"]"#).unwrap();
    assert_eq!(encodings, vec![
      Encoding::Utf8,
      Encoding::Utf8,
      Encoding::Latin1,
      Encoding::Latin1
    ]);
  }

  #[test]
  fn discover_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let options = CacheBustOptions::discover(dir.path()).unwrap();
    assert_eq!(options.length, 16);
  }

  #[test]
  fn discover_reports_broken_config() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "{ not json").unwrap();
    let err = CacheBustOptions::discover(dir.path()).unwrap_err();
    assert!(matches!(err, CacheBustError::Config { .. }));
  }
}
