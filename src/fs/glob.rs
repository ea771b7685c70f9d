//! Glob patterns in the style understood by grunt's file expansion.
//!
//! Supported syntax: `*` and `?` within a segment, `**` across segments,
//! `[abc]`/`[!a-z]` classes, `{a,b}` alternation (nestable), `\` escapes and a
//! leading `!` that removes earlier matches instead of adding new ones. Hidden
//! entries only match patterns that spell out their leading dot.

use indexmap::IndexSet;
use regex::Regex;

use crate::error::{CacheBustError, Result};

/// Compiled glob pattern.
///
/// Path segments starting with `.` only match where the pattern names a
/// segment starting with `.` itself: `**/*.json` skips `.well-known/a.json`,
/// `.well-known/*.json` does not.
#[derive(Debug, Clone)]
pub struct Glob {
  negated: bool,
  matcher: Regex,
  dot_segments: Vec<Regex>,
}

impl Glob {
  /// Compile a single pattern. A leading `!` marks an exclusion.
  pub fn new(pattern: &str) -> Result<Self> {
    let (negated, body) = match pattern.strip_prefix('!') {
      Some(rest) => (true, rest),
      None => (false, pattern),
    };
    let body = body.trim_start_matches("./");
    let compile = |source: &str| -> Result<Regex> {
      let translated = translate(source).map_err(|reason| CacheBustError::Pattern {
        pattern: pattern.to_string(),
        reason,
      })?;
      Regex::new(&translated).map_err(|err| CacheBustError::Pattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
      })
    };

    let matcher = compile(body)?;
    let dot_segments = body
      .split('/')
      .filter(|segment| is_hidden_segment(segment))
      .map(compile)
      .collect::<Result<Vec<_>>>()?;

    Ok(Self {
      negated,
      matcher,
      dot_segments,
    })
  }

  /// Whether this pattern removes matches rather than adding them.
  pub fn is_negated(&self) -> bool {
    self.negated
  }

  /// Test a forward-slash relative path against the pattern body.
  pub fn is_match(&self, path: &str) -> bool {
    self.matcher.is_match(path)
      && path
        .split('/')
        .filter(|segment| is_hidden_segment(segment))
        .all(|segment| self.dot_segments.iter().any(|dot| dot.is_match(segment)))
  }
}

/// Whether any pattern names a hidden segment, so hidden entries must be walked.
pub fn names_hidden_entries(patterns: &[String]) -> bool {
  patterns.iter().any(|pattern| {
    pattern
      .trim_start_matches('!')
      .trim_start_matches("./")
      .split('/')
      .any(is_hidden_segment)
  })
}

/// Split a pattern into its literal leading directory and the glob below it.
///
/// The last segment always stays in the glob half, so `dist/index.html` splits
/// into `dist` and `index.html`. Absolute and `../` prefixes end up in the
/// directory half.
pub fn split_base(pattern: &str) -> (&str, &str) {
  let pattern = pattern.trim_start_matches("./");
  let magic = pattern
    .find(['*', '?', '[', '{', '\\'])
    .unwrap_or(pattern.len());

  match pattern[..magic].rfind('/') {
    Some(0) => ("/", &pattern[1..]),
    Some(slash) => (&pattern[..slash], &pattern[slash + 1..]),
    None => ("", pattern),
  }
}

fn is_hidden_segment(segment: &str) -> bool {
  segment.starts_with('.') && segment != "." && segment != ".."
}

/// Apply `patterns` in order to `candidates`, returning the selected paths.
///
/// Positive patterns append matches that are not yet selected; negated patterns
/// drop everything selected so far that they match. The result keeps the order
/// in which paths were first selected.
pub fn expand_patterns<I>(patterns: &[String], candidates: I) -> Result<Vec<String>>
where
  I: IntoIterator<Item = String>,
{
  let globs = patterns
    .iter()
    .map(|pattern| Glob::new(pattern))
    .collect::<Result<Vec<_>>>()?;

  let mut candidates: Vec<String> = candidates.into_iter().collect();
  candidates.sort();

  let mut selected: IndexSet<String> = IndexSet::new();
  for glob in &globs {
    if glob.is_negated() {
      selected.retain(|path| !glob.is_match(path));
    } else {
      for candidate in &candidates {
        if glob.is_match(candidate) {
          selected.insert(candidate.clone());
        }
      }
    }
  }

  Ok(selected.into_iter().collect())
}

fn translate(pattern: &str) -> std::result::Result<String, String> {
  let mut out = String::from("^");
  let mut chars = pattern.chars().peekable();
  let mut brace_depth = 0usize;
  let mut at_segment_start = true;

  while let Some(c) = chars.next() {
    let segment_start = at_segment_start;
    at_segment_start = false;

    match c {
      '*' if chars.peek() == Some(&'*') => {
        chars.next();
        while chars.peek() == Some(&'*') {
          chars.next();
        }
        match chars.peek() {
          Some(&'/') if segment_start => {
            chars.next();
            out.push_str("(?:[^/]*/)*");
            at_segment_start = true;
          }
          None if segment_start => out.push_str(".*"),
          _ => out.push_str("[^/]*"),
        }
      }
      '*' => out.push_str("[^/]*"),
      '?' => out.push_str("[^/]"),
      '[' => match read_class(&mut chars) {
        Some(class) => out.push_str(&class),
        None => out.push_str(r"\["),
      },
      '{' => {
        brace_depth += 1;
        out.push_str("(?:");
      }
      ',' if brace_depth > 0 => out.push('|'),
      '}' if brace_depth > 0 => {
        brace_depth -= 1;
        out.push(')');
      }
      '\\' => match chars.next() {
        Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
        None => return Err("trailing escape character".into()),
      },
      '/' => {
        out.push('/');
        at_segment_start = true;
      }
      other => out.push_str(&regex::escape(&other.to_string())),
    }
  }

  if brace_depth > 0 {
    return Err("unclosed `{`".into());
  }

  out.push('$');
  Ok(out)
}

/// Consume a `[...]` class body. Returns `None` (consuming nothing) when the
/// class is never closed, so the `[` is matched literally.
fn read_class(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
  let rest: String = chars.clone().collect();
  let mut body = rest.chars();
  let mut class = String::from("[");
  let mut consumed = 0usize;

  let mut first = true;
  loop {
    let c = body.next()?;
    consumed += 1;
    match c {
      '!' | '^' if first => class.push('^'),
      ']' if !first || class.len() > 1 => break,
      '\\' | '[' | ']' | '&' | '~' | '^' => {
        class.push('\\');
        class.push(c);
      }
      _ => class.push(c),
    }
    first = false;
  }
  class.push(']');

  for _ in 0..consumed {
    chars.next();
  }
  Some(class)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn matches(pattern: &str, path: &str) -> bool {
    Glob::new(pattern).unwrap().is_match(path)
  }

  #[test]
  fn star_stays_within_a_segment() {
    assert!(matches("*.css", "main.css"));
    assert!(!matches("*.css", "css/main.css"));
    assert!(matches("css/*.css", "css/main.css"));
  }

  #[test]
  fn globstar_spans_directories() {
    assert!(matches("**/*.js", "app.js"));
    assert!(matches("**/*.js", "js/vendor/jquery.js"));
    assert!(matches("assets/**", "assets/img/logo.png"));
    assert!(!matches("assets/**", "other/logo.png"));
  }

  #[test]
  fn question_mark_and_classes() {
    assert!(matches("img/logo?.png", "img/logo2.png"));
    assert!(!matches("img/logo?.png", "img/logo.png"));
    assert!(matches("v[0-9].js", "v3.js"));
    assert!(!matches("v[!0-9].js", "v3.js"));
    assert!(matches("v[!0-9].js", "vx.js"));
  }

  #[test]
  fn braces_expand_to_alternatives() {
    assert!(matches("**/*.{png,jpg}", "img/a.png"));
    assert!(matches("**/*.{png,jpg}", "img/a.jpg"));
    assert!(!matches("**/*.{png,jpg}", "img/a.gif"));
    assert!(matches("{css,js/{app,vendor}}/*", "js/vendor/x.js"));
  }

  #[test]
  fn literal_characters_are_escaped() {
    assert!(matches("app.min.js", "app.min.js"));
    assert!(!matches("app.min.js", "appXminXjs"));
    assert!(matches("a+b(1).txt", "a+b(1).txt"));
    assert!(matches("[abc", "[abc"));
  }

  #[test]
  fn rejects_unbalanced_braces() {
    let err = Glob::new("*.{png,jpg").unwrap_err();
    assert!(matches!(err, CacheBustError::Pattern { .. }));
  }

  #[test]
  fn leading_dot_slash_is_ignored() {
    assert!(matches("./css/*.css", "css/site.css"));
  }

  #[test]
  fn negation_removes_earlier_matches() {
    let candidates = vec![
      "css/site.css".to_string(),
      "css/vendor.css".to_string(),
      "js/app.js".to_string(),
    ];
    let patterns = vec!["**/*.css".to_string(), "!css/vendor.css".to_string()];
    let result = expand_patterns(&patterns, candidates).unwrap();
    assert_eq!(result, vec!["css/site.css".to_string()]);
  }

  #[test]
  fn expansion_keeps_first_selection_order_without_duplicates() {
    let candidates = vec!["b.js".to_string(), "a.css".to_string(), "a.js".to_string()];
    let patterns = vec!["*.js".to_string(), "*.css".to_string(), "a.*".to_string()];
    let result = expand_patterns(&patterns, candidates).unwrap();
    assert_eq!(result, vec![
      "a.js".to_string(),
      "b.js".to_string(),
      "a.css".to_string()
    ]);
  }

  #[test]
  fn hidden_entries_need_an_explicit_dot() {
    assert!(!matches("**/*.json", ".well-known/assetlinks.json"));
    assert!(matches(".well-known/*.json", ".well-known/assetlinks.json"));
    assert!(!matches(".well-known/*.json", ".well-known/.draft.json"));
    assert!(!matches("*.css", ".css"));
    assert!(!matches("*", ".htaccess"));
    assert!(matches(".*", ".htaccess"));
    assert!(matches("static/.well-known/*", "static/.well-known/security.txt"));
  }

  #[test]
  fn detects_patterns_that_name_hidden_entries() {
    assert!(names_hidden_entries(&[".well-known/*".to_string()]));
    assert!(names_hidden_entries(&["!./.cache/**".to_string()]));
    assert!(!names_hidden_entries(&["../dist/*.html".to_string(), "./a.js".to_string()]));
  }

  #[test]
  fn splits_literal_base_from_glob() {
    assert_eq!(split_base("dist/**/*.html"), ("dist", "**/*.html"));
    assert_eq!(split_base("dist/index.html"), ("dist", "index.html"));
    assert_eq!(split_base("index.html"), ("", "index.html"));
    assert_eq!(split_base("./dist/*.html"), ("dist", "*.html"));
    assert_eq!(split_base("../site/{a,b}/*.html"), ("../site", "{a,b}/*.html"));
    assert_eq!(split_base("/srv/www/index.html"), ("/srv/www", "index.html"));
    assert_eq!(split_base("/index.html"), ("/", "index.html"));
  }
}
