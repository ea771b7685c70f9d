//! Content digests used to fingerprint assets.

use std::fmt;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

/// Hash algorithms selectable through the `algorithm` option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
  /// 128-bit MD5, matching the digests produced by Node's `crypto` module.
  #[default]
  Md5,
  /// 160-bit SHA-1.
  Sha1,
  /// 256-bit SHA-2.
  Sha256,
  /// 512-bit SHA-2.
  Sha512,
  /// 256-bit BLAKE3.
  Blake3,
}

impl Algorithm {
  /// Full hex digest of `data`.
  pub fn hex_digest(self, data: &[u8]) -> String {
    match self {
      Self::Md5 => hex::encode(Md5::digest(data)),
      Self::Sha1 => hex::encode(Sha1::digest(data)),
      Self::Sha256 => hex::encode(Sha256::digest(data)),
      Self::Sha512 => hex::encode(Sha512::digest(data)),
      Self::Blake3 => blake3::hash(data).to_hex().to_string(),
    }
  }
}

impl fmt::Display for Algorithm {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Md5 => "md5",
      Self::Sha1 => "sha1",
      Self::Sha256 => "sha256",
      Self::Sha512 => "sha512",
      Self::Blake3 => "blake3",
    };
    f.write_str(name)
  }
}

impl std::str::FromStr for Algorithm {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim().to_ascii_lowercase().as_str() {
      "md5" => Ok(Self::Md5),
      "sha1" => Ok(Self::Sha1),
      "sha256" => Ok(Self::Sha256),
      "sha512" => Ok(Self::Sha512),
      "blake3" => Ok(Self::Blake3),
      other => Err(format!("unsupported hash algorithm `{other}`")),
    }
  }
}

/// Compute the fingerprint for an asset's bytes.
///
/// The digest is truncated to `length` hex characters, or left whole when the
/// algorithm produces fewer. When `override_hash` is set it is returned verbatim
/// for every asset and the bytes are not hashed at all.
pub fn content_digest(
  data: &[u8],
  algorithm: Algorithm,
  length: usize,
  override_hash: Option<&str>,
) -> String {
  if let Some(fixed) = override_hash {
    return fixed.to_string();
  }

  let mut digest = algorithm.hex_digest(data);
  digest.truncate(length.min(digest.len()));
  digest
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn md5_matches_known_digest() {
    assert_eq!(
      Algorithm::Md5.hex_digest(b"hello world"),
      "5eb63bbbe01eeed093cb22bb8f5acdc3"
    );
  }

  #[test]
  fn digest_is_deterministic_and_truncated() {
    let first = content_digest(b"body { color: red }", Algorithm::Md5, 16, None);
    let second = content_digest(b"body { color: red }", Algorithm::Md5, 16, None);
    assert_eq!(first, second);
    assert_eq!(first.len(), 16);
    assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(
      content_digest(b"hello world", Algorithm::Md5, 8, None),
      "5eb63bbb"
    );
  }

  #[test]
  fn single_byte_change_changes_digest() {
    let first = content_digest(b"console.log(1)", Algorithm::Sha256, 16, None);
    let second = content_digest(b"console.log(2)", Algorithm::Sha256, 16, None);
    assert_ne!(first, second);
  }

  #[test]
  fn length_beyond_digest_returns_full_digest() {
    let digest = content_digest(b"abc", Algorithm::Md5, 64, None);
    assert_eq!(digest.len(), 32);
    let digest = content_digest(b"abc", Algorithm::Sha512, 500, None);
    assert_eq!(digest.len(), 128);
  }

  #[test]
  fn override_replaces_digest_for_any_content() {
    let one = content_digest(b"one", Algorithm::Md5, 4, Some("fixedhash"));
    let two = content_digest(b"two", Algorithm::Sha1, 4, Some("fixedhash"));
    assert_eq!(one, "fixedhash");
    assert_eq!(two, "fixedhash");
  }

  #[test]
  fn parses_algorithm_names() {
    assert_eq!("MD5".parse::<Algorithm>().unwrap(), Algorithm::Md5);
    assert_eq!("blake3".parse::<Algorithm>().unwrap(), Algorithm::Blake3);
    assert!("crc32".parse::<Algorithm>().is_err());
  }

  #[test]
  fn deserialises_lowercase_names() {
    let algorithm: Algorithm = serde_json::from_str("\"sha256\"").unwrap();
    assert_eq!(algorithm, Algorithm::Sha256);
    assert_eq!(algorithm.to_string(), "sha256");
  }
}
