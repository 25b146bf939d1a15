//! # ru-core
//!
//! Shared types for rooutil: the error type, the closed set of branch kinds,
//! the `Lv` 4-momentum vector and the `Bits` bit set.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bits;
pub mod error;
pub mod kind;
pub mod lv;

pub use bits::Bits;
pub use error::{Error, Result};
pub use kind::BranchKind;
pub use lv::Lv;
