//! In-memory columnar tree: the storage handle behind [`TTreeX`](crate::TTreeX).

use std::collections::HashMap;

use ru_core::{Bits, BranchKind, Error, Lv, Result};

use crate::value::{BranchValue, Slots, with_value_type};

/// Column buffer: one value per entry, typed by branch kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// `i32` values.
    Int(Vec<i32>),
    /// `bool` values.
    Bool(Vec<bool>),
    /// `f32` values.
    Float(Vec<f32>),
    /// String values.
    String(Vec<String>),
    /// 4-vectors.
    Lv(Vec<Lv>),
    /// Bit sets.
    Bits(Vec<Bits>),
    /// `u64` values.
    ULong(Vec<u64>),
    /// Jagged `i32` values.
    VecInt(Vec<Vec<i32>>),
    /// Jagged `bool` values.
    VecBool(Vec<Vec<bool>>),
    /// Jagged `f32` values.
    VecFloat(Vec<Vec<f32>>),
    /// Jagged strings.
    VecString(Vec<Vec<String>>),
    /// Jagged 4-vectors.
    VecLv(Vec<Vec<Lv>>),
}

macro_rules! match_column {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ColumnData::Int($v) => $body,
            ColumnData::Bool($v) => $body,
            ColumnData::Float($v) => $body,
            ColumnData::String($v) => $body,
            ColumnData::Lv($v) => $body,
            ColumnData::Bits($v) => $body,
            ColumnData::ULong($v) => $body,
            ColumnData::VecInt($v) => $body,
            ColumnData::VecBool($v) => $body,
            ColumnData::VecFloat($v) => $body,
            ColumnData::VecString($v) => $body,
            ColumnData::VecLv($v) => $body,
        }
    };
}

impl ColumnData {
    /// Column of `len` default values.
    pub fn with_defaults(kind: BranchKind, len: usize) -> Self {
        with_value_type!(kind, T => T::into_column(vec![T::default(); len]))
    }

    /// Kind of values held.
    pub fn kind(&self) -> BranchKind {
        match self {
            ColumnData::Int(_) => BranchKind::Int,
            ColumnData::Bool(_) => BranchKind::Bool,
            ColumnData::Float(_) => BranchKind::Float,
            ColumnData::String(_) => BranchKind::String,
            ColumnData::Lv(_) => BranchKind::Lv,
            ColumnData::Bits(_) => BranchKind::Bits,
            ColumnData::ULong(_) => BranchKind::ULong,
            ColumnData::VecInt(_) => BranchKind::VecInt,
            ColumnData::VecBool(_) => BranchKind::VecBool,
            ColumnData::VecFloat(_) => BranchKind::VecFloat,
            ColumnData::VecString(_) => BranchKind::VecString,
            ColumnData::VecLv(_) => BranchKind::VecLv,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        match_column!(self, v => v.len())
    }

    /// Whether the column has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named column of a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Branch name.
    pub name: String,
    /// Entry values.
    pub data: ColumnData,
}

impl Column {
    /// Kind of the branch.
    pub fn kind(&self) -> BranchKind {
        self.data.kind()
    }
}

/// Branch metadata, as listed by [`Tree::branches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    /// Branch name.
    pub name: String,
    /// Value type.
    pub kind: BranchKind,
    /// Total number of entries in this branch.
    pub entries: u64,
}

/// A tree of equally long named columns.
#[derive(Debug, Clone)]
pub struct Tree {
    name: String,
    title: String,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    entries: u64,
}

impl Tree {
    /// Empty tree with no branches.
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            columns: Vec::new(),
            index: HashMap::new(),
            entries: 0,
        }
    }

    /// Assemble a tree from existing columns. All columns must have the
    /// same length and distinct names.
    pub fn from_columns(
        name: impl Into<String>,
        title: impl Into<String>,
        columns: Vec<Column>,
    ) -> Result<Self> {
        let mut tree = Self::new(name, title);
        tree.entries = columns.first().map_or(0, |c| c.data.len()) as u64;
        for col in columns {
            if col.data.len() as u64 != tree.entries {
                return Err(Error::Validation(format!(
                    "column '{}' has {} entries, expected {}",
                    col.name,
                    col.data.len(),
                    tree.entries
                )));
            }
            if let Some(existing) = tree.kind_of(&col.name) {
                return Err(Error::DuplicateBranch { name: col.name, kind: existing });
            }
            tree.index.insert(col.name.clone(), tree.columns.len());
            tree.columns.push(col);
        }
        Ok(tree)
    }

    /// Tree name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tree title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Total number of entries.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Declare a new branch. Entries already in the tree get default values.
    pub fn branch(&mut self, name: &str, kind: BranchKind) -> Result<()> {
        if let Some(existing) = self.kind_of(name) {
            return Err(Error::DuplicateBranch { name: name.to_string(), kind: existing });
        }
        self.index.insert(name.to_string(), self.columns.len());
        self.columns.push(Column {
            name: name.to_string(),
            data: ColumnData::with_defaults(kind, self.entries as usize),
        });
        Ok(())
    }

    /// Find a branch by name.
    pub fn find_branch(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Kind of branch `name`, if present.
    pub fn kind_of(&self, name: &str) -> Option<BranchKind> {
        self.find_branch(name).map(Column::kind)
    }

    /// List all branch names, in creation order.
    pub fn branch_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Metadata of every branch, in creation order.
    pub fn branches(&self) -> Vec<BranchInfo> {
        self.columns
            .iter()
            .map(|c| BranchInfo { name: c.name.clone(), kind: c.kind(), entries: self.entries })
            .collect()
    }

    /// All columns, in creation order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Typed view of every entry of branch `name`.
    pub fn column<T: BranchValue>(&self, name: &str) -> Result<&[T]> {
        let col = self
            .find_branch(name)
            .ok_or_else(|| Error::UnknownBranch { name: name.to_string(), kind: T::KIND })?;
        T::column(&col.data).map(Vec::as_slice).ok_or_else(|| Error::TypeMismatch {
            name: name.to_string(),
            expected: T::KIND,
            found: col.kind(),
        })
    }

    /// Append one entry, taking every column's value from `slots`.
    ///
    /// Nothing is appended unless every branch has a slot of its kind.
    pub fn fill_from(&mut self, slots: &Slots) -> Result<()> {
        for col in &self.columns {
            let present =
                with_value_type!(col.kind(), T => T::table(slots).contains_key(&col.name));
            if !present {
                return Err(Error::UnknownBranch { name: col.name.clone(), kind: col.kind() });
            }
        }
        for col in &mut self.columns {
            with_value_type!(col.data.kind(), T => push_slot::<T>(col, slots));
        }
        self.entries += 1;
        Ok(())
    }

    /// Copy entry `entry` of every column into `slots`.
    pub fn load_into(&self, entry: u64, slots: &mut Slots) -> Result<()> {
        if entry >= self.entries {
            return Err(Error::EntryOutOfRange { entry, entries: self.entries });
        }
        for col in &self.columns {
            with_value_type!(col.kind(), T => load_slot::<T>(col, entry as usize, slots));
        }
        Ok(())
    }
}

fn push_slot<T: BranchValue>(col: &mut Column, slots: &Slots) {
    if let (Some(value), Some(buf)) = (T::table(slots).get(&col.name), T::column_mut(&mut col.data))
    {
        buf.push(value.clone());
    }
}

fn load_slot<T: BranchValue>(col: &Column, entry: usize, slots: &mut Slots) {
    if let Some(value) = T::column(&col.data).and_then(|buf| buf.get(entry)) {
        T::table_mut(slots).insert(col.name.clone(), value.clone());
    }
}
