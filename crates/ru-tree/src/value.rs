//! Branch value types and the registry's per-type value tables.

use std::collections::BTreeMap;

use ru_core::{Bits, BranchKind, Lv};

use crate::tree::ColumnData;

/// Value written by [`TTreeX::clear`](crate::TTreeX::clear) into `i32` slots.
pub const UNSET_INT: i32 = -999;

/// Value written by [`TTreeX::clear`](crate::TTreeX::clear) into `f32` slots.
pub const UNSET_FLOAT: f32 = -999.0;

/// One of the closed set of types a branch can hold.
///
/// Implemented for `i32`, `bool`, `f32`, `String`, [`Lv`], [`Bits`], `u64`
/// and `Vec<_>` of the first five. Each implementation names the value table
/// and column variant that hold its data, which is how the generic
/// operations of [`TTreeX`](crate::TTreeX) reach the right storage.
pub trait BranchValue: Clone + Default + 'static {
    /// Kind tag of this type.
    const KIND: BranchKind;

    /// Per-row reset value.
    fn unset() -> Self {
        Self::default()
    }

    /// Value table for this type.
    fn table(slots: &Slots) -> &BTreeMap<String, Self>;

    /// Mutable value table for this type.
    fn table_mut(slots: &mut Slots) -> &mut BTreeMap<String, Self>;

    /// Column buffer, if `data` holds this type.
    fn column(data: &ColumnData) -> Option<&Vec<Self>>;

    /// Mutable column buffer, if `data` holds this type.
    fn column_mut(data: &mut ColumnData) -> Option<&mut Vec<Self>>;

    /// Wrap a buffer of this type into a column.
    fn into_column(values: Vec<Self>) -> ColumnData;
}

/// Current-row values of every branch, one table per value type.
///
/// Names may only live in one table at a time; the tree enforces unique
/// branch names.
#[derive(Debug, Default)]
pub struct Slots {
    pub(crate) int: BTreeMap<String, i32>,
    pub(crate) boolean: BTreeMap<String, bool>,
    pub(crate) float: BTreeMap<String, f32>,
    pub(crate) string: BTreeMap<String, String>,
    pub(crate) lv: BTreeMap<String, Lv>,
    pub(crate) bits: BTreeMap<String, Bits>,
    pub(crate) ulong: BTreeMap<String, u64>,
    pub(crate) vec_int: BTreeMap<String, Vec<i32>>,
    pub(crate) vec_bool: BTreeMap<String, Vec<bool>>,
    pub(crate) vec_float: BTreeMap<String, Vec<f32>>,
    pub(crate) vec_string: BTreeMap<String, Vec<String>>,
    pub(crate) vec_lv: BTreeMap<String, Vec<Lv>>,
    /// Whether a vector branch has received its first push of the row.
    pub(crate) is_branch_set: BTreeMap<String, bool>,
}

impl Slots {
    /// Insert a fresh default slot for `name`.
    pub(crate) fn insert<T: BranchValue>(&mut self, name: &str) {
        T::table_mut(self).insert(name.to_string(), T::default());
        if T::KIND.is_vector() {
            self.is_branch_set.insert(name.to_string(), false);
        }
    }

    /// Reset every slot to its unset value and every vector flag to `false`.
    pub(crate) fn reset(&mut self) {
        reset_table(&mut self.int);
        reset_table(&mut self.boolean);
        reset_table(&mut self.float);
        reset_table(&mut self.string);
        reset_table(&mut self.lv);
        reset_table(&mut self.bits);
        reset_table(&mut self.ulong);
        reset_table(&mut self.vec_int);
        reset_table(&mut self.vec_bool);
        reset_table(&mut self.vec_float);
        reset_table(&mut self.vec_string);
        reset_table(&mut self.vec_lv);
        self.reset_flags();
    }

    pub(crate) fn reset_flags(&mut self) {
        self.is_branch_set.values_mut().for_each(|f| *f = false);
    }

    pub(crate) fn len(&self) -> usize {
        self.int.len()
            + self.boolean.len()
            + self.float.len()
            + self.string.len()
            + self.lv.len()
            + self.bits.len()
            + self.ulong.len()
            + self.vec_int.len()
            + self.vec_bool.len()
            + self.vec_float.len()
            + self.vec_string.len()
            + self.vec_lv.len()
    }
}

fn reset_table<T: BranchValue>(table: &mut BTreeMap<String, T>) {
    table.values_mut().for_each(|v| *v = T::unset());
}

macro_rules! impl_branch_value {
    ($ty:ty, $kind:ident, $field:ident, $unset:expr) => {
        impl BranchValue for $ty {
            const KIND: BranchKind = BranchKind::$kind;

            fn unset() -> Self {
                $unset
            }

            fn table(slots: &Slots) -> &BTreeMap<String, Self> {
                &slots.$field
            }

            fn table_mut(slots: &mut Slots) -> &mut BTreeMap<String, Self> {
                &mut slots.$field
            }

            fn column(data: &ColumnData) -> Option<&Vec<Self>> {
                match data {
                    ColumnData::$kind(v) => Some(v),
                    _ => None,
                }
            }

            fn column_mut(data: &mut ColumnData) -> Option<&mut Vec<Self>> {
                match data {
                    ColumnData::$kind(v) => Some(v),
                    _ => None,
                }
            }

            fn into_column(values: Vec<Self>) -> ColumnData {
                ColumnData::$kind(values)
            }
        }
    };
    ($ty:ty, $kind:ident, $field:ident) => {
        impl_branch_value!($ty, $kind, $field, <$ty>::default());
    };
}

impl_branch_value!(i32, Int, int, UNSET_INT);
impl_branch_value!(bool, Bool, boolean);
impl_branch_value!(f32, Float, float, UNSET_FLOAT);
impl_branch_value!(String, String, string);
impl_branch_value!(Lv, Lv, lv);
impl_branch_value!(Bits, Bits, bits);
impl_branch_value!(u64, ULong, ulong);
impl_branch_value!(Vec<i32>, VecInt, vec_int);
impl_branch_value!(Vec<bool>, VecBool, vec_bool);
impl_branch_value!(Vec<f32>, VecFloat, vec_float);
impl_branch_value!(Vec<String>, VecString, vec_string);
impl_branch_value!(Vec<Lv>, VecLv, vec_lv);

/// Evaluate `$body` with `$t` aliased to the value type of `$kind`.
macro_rules! with_value_type {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            ru_core::BranchKind::Int => {
                type $t = i32;
                $body
            }
            ru_core::BranchKind::Bool => {
                type $t = bool;
                $body
            }
            ru_core::BranchKind::Float => {
                type $t = f32;
                $body
            }
            ru_core::BranchKind::String => {
                type $t = String;
                $body
            }
            ru_core::BranchKind::Lv => {
                type $t = ru_core::Lv;
                $body
            }
            ru_core::BranchKind::Bits => {
                type $t = ru_core::Bits;
                $body
            }
            ru_core::BranchKind::ULong => {
                type $t = u64;
                $body
            }
            ru_core::BranchKind::VecInt => {
                type $t = Vec<i32>;
                $body
            }
            ru_core::BranchKind::VecBool => {
                type $t = Vec<bool>;
                $body
            }
            ru_core::BranchKind::VecFloat => {
                type $t = Vec<f32>;
                $body
            }
            ru_core::BranchKind::VecString => {
                type $t = Vec<String>;
                $body
            }
            ru_core::BranchKind::VecLv => {
                type $t = Vec<ru_core::Lv>;
                $body
            }
        }
    };
}

pub(crate) use with_value_type;
