//! Replace references to original asset paths inside target files.
//!
//! Matching is plain substring replacement over the raw bytes of each target.
//! Text that merely contains an asset path (inside a longer word, a comment,
//! another URL) is rewritten as well. Bytes outside a match are written back
//! untouched, so targets that are not valid in the configured encoding still
//! have their references rewritten.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use regex::bytes::{Captures, Regex, RegexBuilder};
use tracing::{debug, info};

use crate::asset_map::AssetMap;
use crate::config::Encoding;
use crate::error::{CacheBustError, Result};
use crate::fs::FileSystem;

const MATCHER_SIZE_LIMIT: usize = 64 * 1024 * 1024;

/// What a rewrite pass changed and which assets it saw referenced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
  /// Original asset paths found in at least one target file.
  pub found: BTreeSet<String>,
  /// Target files whose content changed and was written back.
  pub rewritten: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
struct Reference<'m> {
  original: &'m str,
  replacement: Vec<u8>,
}

/// Single-pass matcher over every original path in an [`AssetMap`].
///
/// Originals and busted names are encoded with the target [`Encoding`] up
/// front. Alternatives are tried in map order at each position, so when several
/// originals match at the same offset the one inserted first wins. Replaced
/// text is never scanned again, which keeps a busted name from being matched by
/// a shorter original it happens to contain.
#[derive(Debug, Clone)]
pub struct ReferenceMatcher<'m> {
  references: Vec<Reference<'m>>,
  by_needle: HashMap<Vec<u8>, usize>,
  pattern: Option<Regex>,
}

impl<'m> ReferenceMatcher<'m> {
  /// Compile a matcher for `map` against targets stored in `encoding`.
  ///
  /// Originals that cannot be represented in `encoding` can never appear in a
  /// target and are left out. A busted name that cannot be represented while
  /// its original can is rejected.
  pub fn new(map: &'m AssetMap, encoding: Encoding) -> Result<Self> {
    let mut references = Vec::with_capacity(map.len());
    let mut by_needle = HashMap::with_capacity(map.len());
    let mut alternatives = Vec::with_capacity(map.len());

    for (original, busted) in map {
      let Some(needle) = encoding.encode(original) else {
        debug!(%original, "asset path cannot occur in target encoding");
        continue;
      };
      let replacement = encoding.encode(busted).ok_or_else(|| {
        CacheBustError::Invalid(format!(
          "busted name `{busted}` cannot be written in the target encoding"
        ))
      })?;

      alternatives.push(escape_bytes(&needle));
      by_needle.insert(needle, references.len());
      references.push(Reference {
        original: original.as_str(),
        replacement,
      });
    }

    if alternatives.is_empty() {
      return Ok(Self {
        references,
        by_needle,
        pattern: None,
      });
    }

    let pattern = RegexBuilder::new(&alternatives.join("|"))
      .unicode(false)
      .size_limit(MATCHER_SIZE_LIMIT)
      .build()
      .map_err(|err| CacheBustError::Pattern {
        pattern: format!("<{} asset paths>", alternatives.len()),
        reason: err.to_string(),
      })?;

    Ok(Self {
      references,
      by_needle,
      pattern: Some(pattern),
    })
  }

  /// Replace every reference in `haystack`, recording the originals that matched.
  ///
  /// The input comes back borrowed when nothing matched.
  pub fn replace_all<'h>(
    &self,
    haystack: &'h [u8],
    found: &mut BTreeSet<String>,
  ) -> Cow<'h, [u8]> {
    let Some(pattern) = &self.pattern else {
      return Cow::Borrowed(haystack);
    };

    pattern.replace_all(haystack, |caps: &Captures<'_>| {
      let needle = &caps[0];
      match self.by_needle.get(needle) {
        Some(&index) => {
          let reference = &self.references[index];
          found.insert(reference.original.to_string());
          reference.replacement.clone()
        }
        None => needle.to_vec(),
      }
    })
  }
}

/// Escape raw bytes as a literal for a byte-oriented, non-Unicode regex.
fn escape_bytes(bytes: &[u8]) -> String {
  bytes
    .iter()
    .map(|&byte| {
      if byte.is_ascii() {
        regex::escape(char::from(byte).encode_utf8(&mut [0; 4]))
      } else {
        format!(r"\x{byte:02X}")
      }
    })
    .collect()
}

/// Rewrite every target against the map.
///
/// Each target is read once and written back once, only if its content changed.
pub fn rewrite_references<F, P>(
  fs: &F,
  map: &AssetMap,
  targets: &[P],
  encoding: Encoding,
) -> Result<RewriteOutcome>
where
  F: FileSystem + ?Sized,
  P: AsRef<Path>,
{
  let matcher = ReferenceMatcher::new(map, encoding)?;
  let mut outcome = RewriteOutcome::default();

  for target in targets {
    let path = target.as_ref();
    let bytes = fs.read(path)?;

    let updated = matcher.replace_all(&bytes, &mut outcome.found);
    if updated.as_ref() == bytes.as_slice() {
      debug!(target = %path.display(), "no asset references");
      continue;
    }

    fs.write(path, &updated)?;
    debug!(target = %path.display(), "rewrote asset references");
    outcome.rewritten.push(path.to_path_buf());
  }

  info!(
    targets = targets.len(),
    rewritten = outcome.rewritten.len(),
    referenced = outcome.found.len(),
    "rewrote references"
  );

  Ok(outcome)
}
