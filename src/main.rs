use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cachebust::{Algorithm, CacheBustOptions, CacheBuster, DiskFileSystem, FileGroup, JsonOutput};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Fingerprint static assets by content hash and rewrite references to them.
#[derive(Debug, Parser)]
#[command(name = "cachebust", version, about)]
struct Cli {
  /// JSON config file (defaults to ./cachebust.json when present)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Directory asset patterns, busted copies and the manifest resolve against
  #[arg(long)]
  base_dir: Option<PathBuf>,

  /// Glob pattern selecting candidate assets (repeatable)
  #[arg(short, long = "assets", value_name = "PATTERN")]
  assets: Vec<String>,

  /// Hash algorithm: md5, sha1, sha256, sha512 or blake3
  #[arg(long)]
  algorithm: Option<Algorithm>,

  /// Number of hex characters kept from each digest
  #[arg(long)]
  length: Option<usize>,

  /// Text inserted between the file stem and the digest
  #[arg(long)]
  separator: Option<String>,

  /// Fixed digest used for every asset instead of hashing content
  #[arg(long)]
  hash: Option<String>,

  /// Remove referenced originals once their busted copy exists
  #[arg(long)]
  delete_originals: bool,

  /// Write a manifest; name the file with `--json-output=FILE` (resolved against the base directory)
  #[arg(
    long,
    value_name = "FILE",
    num_args = 0..=1,
    require_equals = true,
    default_missing_value = ""
  )]
  json_output: Option<String>,

  /// Target file patterns whose references are rewritten
  #[arg(value_name = "TARGET")]
  targets: Vec<String>,
}

impl Cli {
  fn load_options(&self) -> Result<CacheBustOptions> {
    let options = match &self.config {
      Some(path) => CacheBustOptions::from_path(path)
        .with_context(|| format!("failed to load config {}", path.display()))?,
      None => CacheBustOptions::discover(Path::new("."))
        .context("failed to load ./cachebust.json")?,
    };
    Ok(self.apply(options))
  }

  /// Layer command-line flags over options loaded from a config file.
  fn apply(&self, mut options: CacheBustOptions) -> CacheBustOptions {
    if let Some(base_dir) = &self.base_dir {
      options.base_dir = base_dir.clone();
    }
    if !self.assets.is_empty() {
      options.assets = self.assets.clone();
    }
    if let Some(algorithm) = self.algorithm {
      options.algorithm = algorithm;
    }
    if let Some(length) = self.length {
      options.length = length;
    }
    if let Some(separator) = &self.separator {
      options.separator = separator.clone();
    }
    if self.hash.is_some() {
      options.hash = self.hash.clone();
    }
    if self.delete_originals {
      options.delete_originals = true;
    }
    match self.json_output.as_deref() {
      Some("") => options.json_output = JsonOutput::Enabled(true),
      Some(name) => options.json_output = JsonOutput::File(name.to_string()),
      None => {}
    }
    if !self.targets.is_empty() {
      options.files.push(FileGroup {
        src: self.targets.clone(),
      });
    }

    options
  }
}

fn main() -> Result<()> {
  init_tracing();

  let cli = Cli::parse();
  let settings = cli.load_options()?.validate().context("invalid options")?;

  let fs = DiskFileSystem;
  let report = CacheBuster::new(&fs, settings)
    .run()
    .context("cache busting failed")?;

  let dump = serde_json::to_string_pretty(&report.assets).context("failed to render asset map")?;
  println!("{dump}");

  Ok(())
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bare_json_output_leaves_targets_positional() {
    let cli = Cli::parse_from([
      "cachebust",
      "--base-dir",
      "dist",
      "--assets",
      "**/*.css",
      "--assets",
      "**/*.js",
      "--json-output",
      "dist/**/*.html",
    ]);
    assert_eq!(cli.json_output.as_deref(), Some(""));
    assert_eq!(cli.targets, vec!["dist/**/*.html".to_string()]);

    let options = cli.apply(CacheBustOptions::default());
    assert_eq!(options.json_output, JsonOutput::Enabled(true));
    assert_eq!(options.assets, vec!["**/*.css".to_string(), "**/*.js".to_string()]);
    assert_eq!(options.files, vec![FileGroup {
      src: vec!["dist/**/*.html".into()]
    }]);
  }

  #[test]
  fn json_output_names_a_file_with_equals() {
    let cli = Cli::parse_from(["cachebust", "--json-output=assets.json", "index.html"]);
    let options = cli.apply(CacheBustOptions::default());
    assert_eq!(options.json_output, JsonOutput::File("assets.json".into()));
    assert_eq!(options.files[0].src, vec!["index.html".to_string()]);
  }

  #[test]
  fn flags_override_config_values() {
    let config = CacheBustOptions {
      length: 8,
      separator: "-".into(),
      json_output: JsonOutput::File("from-config.json".into()),
      ..CacheBustOptions::default()
    };
    let cli = Cli::parse_from(["cachebust", "--length", "12", "--algorithm", "sha256"]);
    let options = cli.apply(config);

    assert_eq!(options.length, 12);
    assert_eq!(options.algorithm, Algorithm::Sha256);
    assert_eq!(options.separator, "-");
    assert_eq!(options.json_output, JsonOutput::File("from-config.json".into()));
    assert!(options.files.is_empty());
  }
}
