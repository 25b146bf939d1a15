//! `TTreeX`: typed branch registry over a [`Tree`].
//!
//! Each branch has one current-row value slot, held in the table of its
//! value type. Writers set slots and call [`TTreeX::fill`] once per entry;
//! readers load an entry into the slots with [`TTreeX::get_entry`].
//!
//! ```
//! use ru_core::Lv;
//! use ru_tree::TTreeX;
//!
//! let mut tx = TTreeX::new("events", "example");
//! tx.create_branch::<i32>("run").unwrap();
//! tx.create_branch::<Vec<Lv>>("jets").unwrap();
//!
//! for run in 0..2 {
//!     tx.set_branch("run", run).unwrap();
//!     tx.pushback_to_branch("jets", Lv::from_pt_eta_phi_m(30.0, 0.1, 0.2, 5.0)).unwrap();
//!     tx.fill().unwrap();
//!     tx.clear();
//! }
//! assert_eq!(tx.entries(), 2);
//! assert_eq!(tx.tree().column::<i32>("run").unwrap(), &[0, 1]);
//! ```

use std::any::Any;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use ru_core::{BranchKind, Error, Result};

use crate::config::TreeConfig;
use crate::io;
use crate::tree::Tree;
use crate::value::{BranchValue, Slots, with_value_type};

/// Branch registry wrapping one tree.
#[derive(Debug)]
pub struct TTreeX {
    tree: Tree,
    slots: Slots,
    config: TreeConfig,
}

impl Default for TTreeX {
    fn default() -> Self {
        Self::with_config(TreeConfig::default())
    }
}

impl TTreeX {
    /// New registry owning an empty tree.
    pub fn new(name: &str, title: &str) -> Self {
        Self::with_config(TreeConfig::new(name, title))
    }

    /// New registry owning an empty tree named after `config`.
    pub fn with_config(config: TreeConfig) -> Self {
        Self { tree: Tree::new(&config.name, &config.title), slots: Slots::default(), config }
    }

    /// Registry attached to an existing tree. Every branch of `tree` gets a
    /// slot, so entries can be read back and new entries filled.
    pub fn from_tree(tree: Tree) -> Self {
        let config = TreeConfig::new(tree.name(), tree.title());
        let mut tx = Self { tree: Tree::new("", ""), slots: Slots::default(), config };
        tx.set_tree(tree);
        tx
    }

    /// Open a tree previously written with [`TTreeX::save`].
    ///
    /// The output path is set to `path`, so [`TTreeX::write`] updates the
    /// file the tree came from unless redirected with
    /// [`TTreeX::set_output`].
    pub fn open(path: &Path) -> Result<Self> {
        let mut tx = Self::from_tree(io::read_tree_parquet(path)?);
        tx.set_output(path);
        Ok(tx)
    }

    /// Set the file written by [`TTreeX::write`].
    pub fn set_output(&mut self, path: impl Into<PathBuf>) {
        self.config.output = Some(path.into());
    }

    /// Replace the tree, discarding every slot and re-creating one per branch.
    pub fn set_tree(&mut self, tree: Tree) {
        let mut slots = Slots::default();
        for col in tree.columns() {
            with_value_type!(col.kind(), T => slots.insert::<T>(&col.name));
        }
        debug!(
            tree = %tree.name(),
            branches = slots.len(),
            entries = tree.entries(),
            "tree attached"
        );
        self.tree = tree;
        self.slots = slots;
    }

    /// Underlying tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Give up the registry and return the tree.
    pub fn into_tree(self) -> Tree {
        self.tree
    }

    /// Active configuration.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Number of filled entries.
    pub fn entries(&self) -> u64 {
        self.tree.entries()
    }

    /// Kind of branch `name`, if it exists.
    pub fn kind_of(&self, name: &str) -> Option<BranchKind> {
        self.tree.kind_of(name)
    }

    /// Error for a failed `T` lookup of `name`.
    fn lookup_error<T: BranchValue>(&self, name: &str) -> Error {
        match self.tree.kind_of(name) {
            Some(found) if found != T::KIND => {
                Error::TypeMismatch { name: name.to_string(), expected: T::KIND, found }
            }
            _ => Error::UnknownBranch { name: name.to_string(), kind: T::KIND },
        }
    }

    /// Declare branch `name` holding `T`, with a default-valued slot.
    ///
    /// Fails with [`Error::DuplicateBranch`] if the name is taken, whatever
    /// its type.
    pub fn create_branch<T: BranchValue>(&mut self, name: &str) -> Result<()> {
        self.tree.branch(name, T::KIND)?;
        self.slots.insert::<T>(name);
        debug!(branch = name, kind = T::KIND.type_name(), "branch created");
        Ok(())
    }

    /// Overwrite the current-row value of `name`.
    ///
    /// Setting a vector branch counts as its first push of the row, so later
    /// pushes in the same row append.
    pub fn set_branch<T: BranchValue>(&mut self, name: &str, value: T) -> Result<()> {
        match T::table_mut(&mut self.slots).get_mut(name) {
            Some(slot) => *slot = value,
            None => return Err(self.lookup_error::<T>(name)),
        }
        if T::KIND.is_vector() {
            self.slots.is_branch_set.insert(name.to_string(), true);
        }
        Ok(())
    }

    /// Append `value` to vector branch `name`.
    ///
    /// The first push of a row clears whatever the previous row left in the
    /// slot.
    pub fn pushback_to_branch<T>(&mut self, name: &str, value: T) -> Result<()>
    where
        Vec<T>: BranchValue,
    {
        let started = self.slots.is_branch_set.get(name).copied().unwrap_or(false);
        let Some(slot) = <Vec<T>>::table_mut(&mut self.slots).get_mut(name) else {
            return Err(self.lookup_error::<Vec<T>>(name));
        };
        if !started {
            slot.clear();
        }
        slot.push(value);
        self.slots.is_branch_set.insert(name.to_string(), true);
        Ok(())
    }

    /// Current-row value of `name`.
    ///
    /// With `check` a missing slot is diagnosed against the tree, telling a
    /// type mismatch apart from an unknown name. Without it only the `T`
    /// table is consulted.
    pub fn get_branch<T: BranchValue>(&self, name: &str, check: bool) -> Result<&T> {
        match T::table(&self.slots).get(name) {
            Some(value) => Ok(value),
            None if check => Err(self.lookup_error::<T>(name)),
            None => Err(Error::UnknownBranch { name: name.to_string(), kind: T::KIND }),
        }
    }

    /// Type-erased view of the slot of `name`.
    pub fn val_ptr(&self, name: &str) -> Option<&dyn Any> {
        let kind = self.tree.kind_of(name)?;
        with_value_type!(kind, T => T::table(&self.slots).get(name).map(|v| v as &dyn Any))
    }

    /// Slot of `name` as `T`, after loading `entry` when given.
    pub fn get<T: BranchValue>(&mut self, name: &str, entry: Option<u64>) -> Result<&T> {
        if let Some(entry) = entry {
            self.get_entry(entry)?;
        }
        let any = self
            .val_ptr(name)
            .ok_or_else(|| Error::UnknownBranch { name: name.to_string(), kind: T::KIND })?;
        any.downcast_ref::<T>().ok_or_else(|| self.lookup_error::<T>(name))
    }

    /// Load entry `entry` of every branch into the slots.
    pub fn get_entry(&mut self, entry: u64) -> Result<()> {
        self.tree.load_into(entry, &mut self.slots)?;
        self.slots.reset_flags();
        Ok(())
    }

    /// Commit the current slots as a new entry.
    pub fn fill(&mut self) -> Result<()> {
        self.tree.fill_from(&self.slots)
    }

    /// Reset every slot to its unset value ahead of the next entry.
    ///
    /// Integers and floats become `-999`, booleans `false`, strings,
    /// vectors and bit sets empty, 4-vectors zero, `u64` zero.
    pub fn clear(&mut self) {
        self.slots.reset();
    }

    /// Persist the tree to the configured output path.
    pub fn write(&self) -> Result<()> {
        let path = self.config.output.as_deref().ok_or_else(|| {
            Error::Validation(format!("tree '{}' has no output path configured", self.tree.name()))
        })?;
        self.save(path)
    }

    /// Persist the tree to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        io::write_tree_parquet(&self.tree, path, &self.config)?;
        info!(
            tree = %self.tree.name(),
            path = %path.display(),
            entries = self.tree.entries(),
            branches = self.tree.columns().len(),
            "tree saved"
        );
        Ok(())
    }

    /// Create one `Vec<i32>` branch per key of `index_map`.
    pub fn create_index_branches(&mut self, index_map: &BTreeMap<String, Vec<i32>>) -> Result<()> {
        for name in index_map.keys() {
            self.create_branch::<Vec<i32>>(name)?;
        }
        Ok(())
    }

    /// Set every index branch from `index_map`.
    pub fn set_index_branches(&mut self, index_map: &BTreeMap<String, Vec<i32>>) -> Result<()> {
        for (name, indices) in index_map {
            self.set_branch(name, indices.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{UNSET_FLOAT, UNSET_INT};
    use ru_core::{Bits, Lv};

    #[test]
    fn create_set_get_every_kind() {
        let mut tx = TTreeX::new("t", "t");
        tx.create_branch::<i32>("i").unwrap();
        tx.create_branch::<bool>("b").unwrap();
        tx.create_branch::<f32>("f").unwrap();
        tx.create_branch::<String>("s").unwrap();
        tx.create_branch::<Lv>("lv").unwrap();
        tx.create_branch::<Bits>("bits").unwrap();
        tx.create_branch::<u64>("evt").unwrap();
        tx.create_branch::<Vec<i32>>("vi").unwrap();
        tx.create_branch::<Vec<bool>>("vb").unwrap();
        tx.create_branch::<Vec<f32>>("vf").unwrap();
        tx.create_branch::<Vec<String>>("vs").unwrap();
        tx.create_branch::<Vec<Lv>>("vlv").unwrap();

        let p4 = Lv::from_pt_eta_phi_m(25.0, -0.4, 1.0, 0.105);
        let bits: Bits = [2usize, 33].into_iter().collect();
        tx.set_branch("i", -3).unwrap();
        tx.set_branch("b", true).unwrap();
        tx.set_branch("f", 2.5f32).unwrap();
        tx.set_branch("s", "mu".to_string()).unwrap();
        tx.set_branch("lv", p4).unwrap();
        tx.set_branch("bits", bits.clone()).unwrap();
        tx.set_branch("evt", u64::MAX).unwrap();
        tx.set_branch("vi", vec![1, 2]).unwrap();
        tx.set_branch("vb", vec![true, false]).unwrap();
        tx.set_branch("vf", vec![0.5f32]).unwrap();
        tx.set_branch("vs", vec!["a".to_string()]).unwrap();
        tx.set_branch("vlv", vec![p4, p4]).unwrap();

        assert_eq!(*tx.get_branch::<i32>("i", true).unwrap(), -3);
        assert!(*tx.get_branch::<bool>("b", true).unwrap());
        assert_eq!(*tx.get_branch::<f32>("f", true).unwrap(), 2.5);
        assert_eq!(tx.get_branch::<String>("s", true).unwrap(), "mu");
        assert_eq!(*tx.get_branch::<Lv>("lv", true).unwrap(), p4);
        assert_eq!(*tx.get_branch::<Bits>("bits", true).unwrap(), bits);
        assert_eq!(*tx.get_branch::<u64>("evt", false).unwrap(), u64::MAX);
        assert_eq!(tx.get_branch::<Vec<i32>>("vi", true).unwrap(), &vec![1, 2]);
        assert_eq!(tx.get_branch::<Vec<bool>>("vb", true).unwrap(), &vec![true, false]);
        assert_eq!(tx.get_branch::<Vec<f32>>("vf", true).unwrap(), &vec![0.5]);
        assert_eq!(tx.get_branch::<Vec<String>>("vs", true).unwrap(), &vec!["a".to_string()]);
        assert_eq!(tx.get_branch::<Vec<Lv>>("vlv", true).unwrap(), &vec![p4, p4]);
    }

    #[test]
    fn created_slots_start_at_default() {
        let mut tx = TTreeX::default();
        tx.create_branch::<i32>("n").unwrap();
        assert_eq!(*tx.get_branch::<i32>("n", true).unwrap(), 0);
    }

    #[test]
    fn pushback_collects_in_order() {
        let mut tx = TTreeX::default();
        tx.create_branch::<Vec<f32>>("pt").unwrap();
        for v in [3.0f32, 1.0, 2.0] {
            tx.pushback_to_branch("pt", v).unwrap();
        }
        assert_eq!(tx.get_branch::<Vec<f32>>("pt", true).unwrap(), &vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn pushback_clears_once_per_row() {
        let mut tx = TTreeX::default();
        tx.create_branch::<Vec<i32>>("idx").unwrap();

        tx.pushback_to_branch("idx", 1).unwrap();
        tx.pushback_to_branch("idx", 2).unwrap();
        tx.fill().unwrap();
        tx.clear();

        tx.pushback_to_branch("idx", 7).unwrap();
        tx.fill().unwrap();

        assert_eq!(tx.tree().column::<Vec<i32>>("idx").unwrap(), &[vec![1, 2], vec![7]]);
    }

    #[test]
    fn pushback_after_set_appends() {
        let mut tx = TTreeX::default();
        tx.create_branch::<Vec<i32>>("idx").unwrap();
        tx.set_branch("idx", vec![4, 5]).unwrap();
        tx.pushback_to_branch("idx", 6).unwrap();
        assert_eq!(tx.get_branch::<Vec<i32>>("idx", true).unwrap(), &vec![4, 5, 6]);
    }

    #[test]
    fn clear_writes_sentinels() {
        let mut tx = TTreeX::default();
        tx.create_branch::<i32>("n").unwrap();
        tx.create_branch::<f32>("x").unwrap();
        tx.create_branch::<String>("tag").unwrap();
        tx.create_branch::<u64>("evt").unwrap();
        tx.set_branch("n", 3).unwrap();
        tx.set_branch("x", 1.0f32).unwrap();
        tx.set_branch("tag", "sr".to_string()).unwrap();
        tx.set_branch("evt", 12u64).unwrap();

        tx.clear();

        assert_eq!(*tx.get_branch::<i32>("n", true).unwrap(), UNSET_INT);
        assert_eq!(*tx.get_branch::<f32>("x", true).unwrap(), UNSET_FLOAT);
        assert!(tx.get_branch::<String>("tag", true).unwrap().is_empty());
        assert_eq!(*tx.get_branch::<u64>("evt", true).unwrap(), 0);
    }

    #[test]
    fn unknown_branch_is_an_error() {
        let mut tx = TTreeX::default();
        assert!(matches!(tx.set_branch("nope", 1), Err(Error::UnknownBranch { .. })));
        assert!(matches!(
            tx.get_branch::<f32>("nope", true),
            Err(Error::UnknownBranch { kind: BranchKind::Float, .. })
        ));
        assert!(matches!(tx.get_branch::<f32>("nope", false), Err(Error::UnknownBranch { .. })));
        assert!(matches!(tx.pushback_to_branch("nope", 1.0f32), Err(Error::UnknownBranch { .. })));
    }

    #[test]
    fn duplicate_branch_is_an_error() {
        let mut tx = TTreeX::default();
        tx.create_branch::<i32>("n").unwrap();
        assert!(matches!(tx.create_branch::<i32>("n"), Err(Error::DuplicateBranch { .. })));
        assert!(matches!(tx.create_branch::<f32>("n"), Err(Error::DuplicateBranch { .. })));
    }

    #[test]
    fn type_mismatch_is_diagnosed() {
        let mut tx = TTreeX::default();
        tx.create_branch::<i32>("n").unwrap();
        tx.create_branch::<Vec<f32>>("v").unwrap();

        let err = tx.set_branch("n", 1.0f32).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch { expected: BranchKind::Float, found: BranchKind::Int, .. }
        ));
        assert!(matches!(tx.get_branch::<u64>("n", true), Err(Error::TypeMismatch { .. })));
        assert!(matches!(tx.get_branch::<u64>("n", false), Err(Error::UnknownBranch { .. })));
        assert!(matches!(tx.pushback_to_branch("v", 1i32), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn val_ptr_is_type_erased() {
        let mut tx = TTreeX::default();
        tx.create_branch::<f32>("x").unwrap();
        tx.set_branch("x", 4.0f32).unwrap();
        let any = tx.val_ptr("x").unwrap();
        assert_eq!(any.downcast_ref::<f32>(), Some(&4.0));
        assert!(any.downcast_ref::<i32>().is_none());
        assert!(tx.val_ptr("y").is_none());
    }

    #[test]
    fn get_loads_requested_entry() {
        let mut tx = TTreeX::default();
        tx.create_branch::<i32>("n").unwrap();
        tx.create_branch::<Vec<f32>>("v").unwrap();
        for i in 0..4 {
            tx.set_branch("n", i).unwrap();
            tx.pushback_to_branch("v", i as f32).unwrap();
            tx.fill().unwrap();
            tx.clear();
        }

        assert_eq!(*tx.get::<i32>("n", Some(2)).unwrap(), 2);
        assert_eq!(tx.get::<Vec<f32>>("v", None).unwrap(), &vec![2.0]);
        assert!(matches!(tx.get::<f32>("n", None), Err(Error::TypeMismatch { .. })));
        assert!(matches!(tx.get::<i32>("n", Some(4)), Err(Error::EntryOutOfRange { .. })));

        // loaded vector rows are replaced, not extended, by the next push
        tx.pushback_to_branch("v", 9.0f32).unwrap();
        assert_eq!(tx.get_branch::<Vec<f32>>("v", true).unwrap(), &vec![9.0]);
    }

    #[test]
    fn attach_existing_tree() {
        let mut tx = TTreeX::new("events", "");
        tx.create_branch::<u64>("evt").unwrap();
        tx.set_branch("evt", 10u64).unwrap();
        tx.fill().unwrap();

        let mut tx = TTreeX::from_tree(tx.into_tree());
        assert_eq!(tx.config().name, "events");
        tx.set_branch("evt", 11u64).unwrap();
        tx.fill().unwrap();
        assert_eq!(tx.tree().column::<u64>("evt").unwrap(), &[10, 11]);
    }

    #[test]
    fn index_branches() {
        let mut idx = BTreeMap::new();
        idx.insert("good_jets".to_string(), vec![0, 2]);
        idx.insert("good_leps".to_string(), vec![]);

        let mut tx = TTreeX::default();
        tx.create_index_branches(&idx).unwrap();
        tx.set_index_branches(&idx).unwrap();
        assert_eq!(tx.kind_of("good_jets"), Some(BranchKind::VecInt));
        assert_eq!(tx.get_branch::<Vec<i32>>("good_jets", true).unwrap(), &vec![0, 2]);
        assert!(tx.get_branch::<Vec<i32>>("good_leps", true).unwrap().is_empty());
    }

    #[test]
    fn write_needs_output_path() {
        let mut tx = TTreeX::default();
        tx.create_branch::<i32>("n").unwrap();
        assert!(matches!(tx.write(), Err(Error::Validation(_))));
    }

    #[test]
    fn set_output_enables_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n.parquet");

        let mut tx = TTreeX::default();
        tx.create_branch::<i32>("n").unwrap();
        tx.set_branch("n", 3).unwrap();
        tx.fill().unwrap();
        tx.set_output(&path);
        tx.write().unwrap();

        let back = io::read_tree_parquet(&path).unwrap();
        assert_eq!(back.column::<i32>("n").unwrap(), &[3]);
    }

    #[test]
    fn opened_tree_writes_back_to_its_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n.parquet");

        let mut tx = TTreeX::default();
        tx.create_branch::<i32>("n").unwrap();
        tx.set_branch("n", 1).unwrap();
        tx.fill().unwrap();
        tx.save(&path).unwrap();

        let mut tx = TTreeX::open(&path).unwrap();
        assert_eq!(tx.config().output.as_deref(), Some(path.as_path()));
        tx.set_branch("n", 2).unwrap();
        tx.fill().unwrap();
        tx.write().unwrap();

        let back = TTreeX::open(&path).unwrap();
        assert_eq!(back.tree().column::<i32>("n").unwrap(), &[1, 2]);

        let copy = dir.path().join("copy.parquet");
        let mut tx = back;
        tx.set_output(&copy);
        tx.write().unwrap();
        assert_eq!(io::read_tree_parquet(&copy).unwrap().entries(), 2);
    }
}
