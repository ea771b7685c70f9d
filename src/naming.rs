//! Derive fingerprinted ("busted") file names from original paths or URLs.
//!
//! An input is split into an origin and a path portion. Only absolute URLs with
//! a host have an origin (`scheme://authority`), which is carried over
//! verbatim. Every other input, including relative paths containing `?` or
//! `#`, is kept whole: query strings and fragments are never stripped or
//! reordered. The extension is taken from the text before the first `?` or
//! `#`, so dots inside a query value never count as one.

use url::Url;

/// Insert `separator` and `digest` ahead of the extension of `original`.
///
/// `images/logo.png` with digest `abcd1234` becomes `images/logo.abcd1234.png`;
/// inputs without an extension end in `separator + digest`.
pub fn busted_name(original: &str, digest: &str, separator: &str) -> String {
  let (origin, rest) = split_origin(original);
  let (path, suffix) = rest.split_at(rest.find(['?', '#']).unwrap_or(rest.len()));
  let ext = extension(path);
  let stem = &path[..path.len() - ext.len()];
  format!("{origin}{stem}{separator}{digest}{ext}{suffix}")
}

/// Split an absolute URL into its verbatim `scheme://authority` prefix and the
/// remainder. Inputs that are not absolute URLs with a host have no prefix.
pub fn split_origin(value: &str) -> (&str, &str) {
  let has_host = Url::parse(value).is_ok_and(|parsed| parsed.host().is_some());
  if !has_host {
    return ("", value);
  }

  let Some(scheme_end) = value.find("://") else {
    return ("", value);
  };
  let authority_start = scheme_end + 3;
  let authority_end = value[authority_start..]
    .find(['/', '?', '#'])
    .map_or(value.len(), |offset| authority_start + offset);

  value.split_at(authority_end)
}

/// Extension of the last path segment, including its leading dot.
///
/// Mirrors `path.extname`: dot-files such as `.htaccess` have no extension and a
/// trailing dot yields `"."`.
pub fn extension(path: &str) -> &str {
  let segment_start = path.rfind('/').map_or(0, |index| index + 1);
  let segment = &path[segment_start..];

  match segment.rfind('.') {
    Some(dot) if !segment[..dot].chars().all(|c| c == '.') => &segment[dot..],
    _ => "",
  }
}
