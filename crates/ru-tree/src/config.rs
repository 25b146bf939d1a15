//! Tree and output configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use ru_core::Result;

/// Compression codec for written Parquet files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// Snappy (fast, moderate ratio).
    #[default]
    Snappy,
    /// Zstandard at the default level.
    Zstd,
    /// No compression.
    Uncompressed,
}

impl Compression {
    pub(crate) fn to_parquet(self) -> parquet::basic::Compression {
        match self {
            Compression::Snappy => parquet::basic::Compression::SNAPPY,
            Compression::Zstd => parquet::basic::Compression::ZSTD(Default::default()),
            Compression::Uncompressed => parquet::basic::Compression::UNCOMPRESSED,
        }
    }
}

/// Configuration for a [`TTreeX`](crate::TTreeX) and its output file.
///
/// ```
/// use ru_tree::{Compression, TreeConfig};
///
/// let cfg = TreeConfig::from_json_str(r#"{"name": "t", "compression": "zstd"}"#).unwrap();
/// assert_eq!(cfg.compression, Compression::Zstd);
/// assert_eq!(cfg.title, "t");
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeConfig {
    /// Tree name (default: `"t"`).
    pub name: String,
    /// Tree title (default: `"t"`).
    pub title: String,
    /// File written by [`TTreeX::write`](crate::TTreeX::write).
    pub output: Option<PathBuf>,
    /// Parquet compression codec.
    pub compression: Compression,
    /// Maximum number of entries per Parquet row group.
    pub max_row_group_size: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            name: "t".to_string(),
            title: "t".to_string(),
            output: None,
            compression: Compression::default(),
            max_row_group_size: 64 * 1024,
        }
    }
}

impl TreeConfig {
    /// Config with the given tree name and title, other fields default.
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self { name: name.into(), title: title.into(), ..Self::default() }
    }

    /// Set the output path.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Set the compression codec.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Parse a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a JSON config file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
