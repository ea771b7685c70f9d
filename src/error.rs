//! Error type shared by every stage of a cache-busting run.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CacheBustError>;

/// Failures that abort a cache-busting run.
///
/// Every I/O failure is fatal: nothing is retried and files rewritten before the
/// failure keep their new content.
#[derive(Debug, Error)]
pub enum CacheBustError {
  /// An asset, target file or config file could not be read.
  #[error("failed to read {}: {source}", .path.display())]
  Read {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// A target file or the manifest could not be written.
  #[error("failed to write {}: {source}", .path.display())]
  Write {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// A referenced asset could not be copied to its busted path.
  #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
  Copy {
    /// Original asset path.
    from: PathBuf,
    /// Busted destination path.
    to: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// An original asset could not be removed after copying.
  #[error("failed to delete {}: {source}", .path.display())]
  Delete {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// A directory could not be walked while expanding glob patterns.
  #[error("failed to expand patterns under {}: {source}", .dir.display())]
  Expand {
    /// Directory being walked.
    dir: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// A glob pattern could not be translated into a matcher.
  #[error("invalid glob pattern `{pattern}`: {reason}")]
  Pattern {
    /// Offending pattern.
    pattern: String,
    /// Human readable reason.
    reason: String,
  },
  /// A config file could not be parsed.
  #[error("failed to parse config {}: {source}", .path.display())]
  Config {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    source: serde_json::Error,
  },
  /// Options failed validation.
  #[error("invalid options: {0}")]
  Invalid(String),
  /// The asset map could not be serialised.
  #[error("failed to serialise manifest: {0}")]
  Manifest(#[from] serde_json::Error),
}
