//! The closed set of branch value types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type tag of a branch.
///
/// Numeric codes follow the `kType` numbering used by RooUtil ntuples, so
/// a vector kind is always its element kind plus 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    /// `i32`
    Int,
    /// `bool`
    Bool,
    /// `f32`
    Float,
    /// `String`
    String,
    /// [`Lv`](crate::Lv) 4-vector.
    Lv,
    /// [`Bits`](crate::Bits) bit set.
    Bits,
    /// `u64`
    ULong,
    /// `Vec<i32>`
    VecInt,
    /// `Vec<bool>`
    VecBool,
    /// `Vec<f32>`
    VecFloat,
    /// `Vec<String>`
    VecString,
    /// `Vec<Lv>`
    VecLv,
}

impl BranchKind {
    /// Every kind, in code order.
    pub const ALL: [BranchKind; 12] = [
        BranchKind::Int,
        BranchKind::Bool,
        BranchKind::Float,
        BranchKind::String,
        BranchKind::Lv,
        BranchKind::Bits,
        BranchKind::ULong,
        BranchKind::VecInt,
        BranchKind::VecBool,
        BranchKind::VecFloat,
        BranchKind::VecString,
        BranchKind::VecLv,
    ];

    /// Numeric type code.
    pub fn code(self) -> u8 {
        match self {
            BranchKind::Int => 1,
            BranchKind::Bool => 2,
            BranchKind::Float => 3,
            BranchKind::String => 4,
            BranchKind::Lv => 5,
            BranchKind::Bits => 6,
            BranchKind::ULong => 7,
            BranchKind::VecInt => 11,
            BranchKind::VecBool => 12,
            BranchKind::VecFloat => 13,
            BranchKind::VecString => 14,
            BranchKind::VecLv => 15,
        }
    }

    /// Inverse of [`BranchKind::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    /// Whether values of this kind are variable-length sequences.
    pub fn is_vector(self) -> bool {
        self.code() > 10
    }

    /// Element kind of a vector kind; scalar kinds map to themselves.
    pub fn element(self) -> BranchKind {
        match self {
            BranchKind::VecInt => BranchKind::Int,
            BranchKind::VecBool => BranchKind::Bool,
            BranchKind::VecFloat => BranchKind::Float,
            BranchKind::VecString => BranchKind::String,
            BranchKind::VecLv => BranchKind::Lv,
            k => k,
        }
    }

    /// Rust spelling of the value type, used in diagnostics.
    pub fn type_name(self) -> &'static str {
        match self {
            BranchKind::Int => "i32",
            BranchKind::Bool => "bool",
            BranchKind::Float => "f32",
            BranchKind::String => "String",
            BranchKind::Lv => "Lv",
            BranchKind::Bits => "Bits",
            BranchKind::ULong => "u64",
            BranchKind::VecInt => "Vec<i32>",
            BranchKind::VecBool => "Vec<bool>",
            BranchKind::VecFloat => "Vec<f32>",
            BranchKind::VecString => "Vec<String>",
            BranchKind::VecLv => "Vec<Lv>",
        }
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}
