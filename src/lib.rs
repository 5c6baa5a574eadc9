#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod config;
pub mod filter;
pub mod host;
pub mod rewrite;
pub mod version;

pub use config::CacheBusterConfig;
pub use filter::ResponseTransformFilter;
pub use host::{Attachment, CacheBuster};
pub use version::{PackageVersion, VersionMarker, VersionProvider};
