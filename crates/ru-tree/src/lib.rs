//! # ru-tree
//!
//! Typed branch registry ([`TTreeX`]) over an in-memory columnar [`Tree`],
//! with Parquet persistence.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use ru_tree::{TTreeX, TreeConfig};
//!
//! let mut tx = TTreeX::with_config(TreeConfig::new("events", "skim").with_output("skim.parquet"));
//! tx.create_branch::<f32>("met").unwrap();
//! tx.create_branch::<Vec<f32>>("lep_pt").unwrap();
//!
//! tx.set_branch("met", 41.5f32).unwrap();
//! tx.pushback_to_branch("lep_pt", 27.0f32).unwrap();
//! tx.fill().unwrap();
//! tx.clear();
//! tx.write().unwrap();
//!
//! let mut back = TTreeX::open(Path::new("skim.parquet")).unwrap();
//! let met: f32 = *back.get("met", Some(0)).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod group;
pub mod io;
pub mod tree;
pub mod treex;
pub mod value;

pub use config::{Compression, TreeConfig};
pub use group::{VecGroup, pt_order, sort_from_ref};
pub use io::{
    read_tree_parquet, read_tree_parquet_bytes, write_tree_parquet, write_tree_parquet_bytes,
};
pub use tree::{BranchInfo, Column, ColumnData, Tree};
pub use treex::TTreeX;
pub use value::{BranchValue, Slots, UNSET_FLOAT, UNSET_INT};
