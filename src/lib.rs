#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod asset_map;
pub mod builder;
pub mod config;
pub mod error;
pub mod fs;
pub mod hashing;
pub mod materialize;
pub mod naming;
pub mod rewrite;

pub use asset_map::{AssetMap, build_asset_map, discovery_order};
pub use builder::{CacheBustReport, CacheBuster};
pub use config::{CacheBustOptions, Encoding, FileGroup, JsonOutput, Settings};
pub use error::{CacheBustError, Result};
pub use fs::{DiskFileSystem, FileSystem, MemoryFileSystem};
pub use hashing::{Algorithm, content_digest};
pub use naming::busted_name;
pub use rewrite::{ReferenceMatcher, RewriteOutcome, rewrite_references};
