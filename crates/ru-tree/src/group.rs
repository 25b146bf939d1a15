//! Batch operations over groups of parallel vector branches.
//!
//! A [`VecGroup`] names one `Vec<Lv>` branch plus sibling vector branches
//! that describe the same objects element by element (e.g. jet 4-vectors,
//! b-tag scores, flavours).

use ru_core::{Error, Lv, Result};

use crate::TTreeX;
use crate::value::{BranchValue, UNSET_FLOAT};

/// A 4-vector branch and its element-aligned sibling branches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VecGroup {
    /// `Vec<Lv>` branch.
    pub p4: String,
    /// `Vec<f32>` siblings.
    pub floats: Vec<String>,
    /// `Vec<i32>` siblings.
    pub ints: Vec<String>,
    /// `Vec<bool>` siblings.
    pub bools: Vec<String>,
    /// `Vec<String>` siblings.
    pub strings: Vec<String>,
}

fn names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

impl VecGroup {
    /// Group around 4-vector branch `p4` with no siblings.
    pub fn new(p4: impl Into<String>) -> Self {
        Self { p4: p4.into(), ..Self::default() }
    }

    /// Add `Vec<f32>` siblings.
    pub fn floats<I: IntoIterator<Item = S>, S: Into<String>>(mut self, n: I) -> Self {
        self.floats.extend(names(n));
        self
    }

    /// Add `Vec<i32>` siblings.
    pub fn ints<I: IntoIterator<Item = S>, S: Into<String>>(mut self, n: I) -> Self {
        self.ints.extend(names(n));
        self
    }

    /// Add `Vec<bool>` siblings.
    pub fn bools<I: IntoIterator<Item = S>, S: Into<String>>(mut self, n: I) -> Self {
        self.bools.extend(names(n));
        self
    }

    /// Add `Vec<String>` siblings.
    pub fn strings<I: IntoIterator<Item = S>, S: Into<String>>(mut self, n: I) -> Self {
        self.strings.extend(names(n));
        self
    }
}

/// Name of flat branch `i` of vector branch `name`.
pub fn flat_name(name: &str, i: usize) -> String {
    format!("{name}_{i}")
}

const P4_COMPONENTS: [(&str, fn(&Lv) -> f32); 4] =
    [("pt", Lv::pt), ("eta", Lv::eta), ("phi", Lv::phi), ("mass", Lv::mass)];

/// Stable order of `p4` by descending transverse momentum.
pub fn pt_order(p4: &[Lv]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..p4.len()).collect();
    order.sort_by(|&a, &b| p4[b].pt().total_cmp(&p4[a].pt()));
    order
}

/// Reorder `values` so that element `i` is `values[order[i]]`.
pub fn sort_from_ref<T: Clone>(values: &[T], order: &[usize]) -> Vec<T> {
    order.iter().map(|&i| values[i].clone()).collect()
}

impl TTreeX {
    fn vec_len<T>(&self, name: &str) -> Result<usize>
    where
        Vec<T>: BranchValue,
    {
        Ok(self.get_branch::<Vec<T>>(name, true)?.len())
    }

    fn check_sibling_len<T>(&self, group: &VecGroup, name: &str, len: usize) -> Result<()>
    where
        Vec<T>: BranchValue,
    {
        let n = self.vec_len::<T>(name)?;
        if n != len {
            return Err(Error::Validation(format!(
                "branch '{name}' has {n} elements, but '{}' has {len}",
                group.p4
            )));
        }
        Ok(())
    }

    fn permute<T: Clone>(&mut self, name: &str, order: &[usize]) -> Result<()>
    where
        Vec<T>: BranchValue,
    {
        let sorted = sort_from_ref(self.get_branch::<Vec<T>>(name, true)?, order);
        self.set_branch(name, sorted)
    }

    /// Sort the group's 4-vectors by descending pt and apply the same
    /// permutation to every sibling. Equal pt keeps the original order.
    ///
    /// Siblings must have as many elements as the 4-vector branch; nothing
    /// is reordered otherwise.
    pub fn sort_vec_branches_by_pt(&mut self, group: &VecGroup) -> Result<()> {
        let order = pt_order(self.get_branch::<Vec<Lv>>(&group.p4, true)?);
        let len = order.len();
        for name in &group.floats {
            self.check_sibling_len::<f32>(group, name, len)?;
        }
        for name in &group.ints {
            self.check_sibling_len::<i32>(group, name, len)?;
        }
        for name in &group.bools {
            self.check_sibling_len::<bool>(group, name, len)?;
        }
        for name in &group.strings {
            self.check_sibling_len::<String>(group, name, len)?;
        }

        self.permute::<Lv>(&group.p4, &order)?;
        for name in &group.floats {
            self.permute::<f32>(name, &order)?;
        }
        for name in &group.ints {
            self.permute::<i32>(name, &order)?;
        }
        for name in &group.bools {
            self.permute::<bool>(name, &order)?;
        }
        for name in &group.strings {
            self.permute::<String>(name, &order)?;
        }
        Ok(())
    }

    /// Create scalar branches for the first `multiplicity` objects of each
    /// group: `<p4>_<i>_{pt,eta,phi,mass}` and `<sibling>_<i>`.
    pub fn create_flat_branch(&mut self, groups: &[VecGroup], multiplicity: usize) -> Result<()> {
        for group in groups {
            for i in 0..multiplicity {
                let base = flat_name(&group.p4, i);
                for (comp, _) in P4_COMPONENTS {
                    self.create_branch::<f32>(&format!("{base}_{comp}"))?;
                }
                for name in &group.floats {
                    self.create_branch::<f32>(&flat_name(name, i))?;
                }
                for name in &group.ints {
                    self.create_branch::<i32>(&flat_name(name, i))?;
                }
                for name in &group.bools {
                    self.create_branch::<bool>(&flat_name(name, i))?;
                }
                for name in &group.strings {
                    self.create_branch::<String>(&flat_name(name, i))?;
                }
            }
        }
        Ok(())
    }

    fn set_flat<T: BranchValue>(&mut self, name: &str, multiplicity: usize) -> Result<()>
    where
        Vec<T>: BranchValue,
    {
        let values = self.get_branch::<Vec<T>>(name, true)?.clone();
        for i in 0..multiplicity {
            let value = values.get(i).cloned().unwrap_or_else(T::unset);
            self.set_branch(&flat_name(name, i), value)?;
        }
        Ok(())
    }

    /// Copy the first `multiplicity` objects of each group into the branches
    /// made by [`TTreeX::create_flat_branch`]. Missing objects get the unset
    /// value.
    pub fn set_flat_branch(&mut self, groups: &[VecGroup], multiplicity: usize) -> Result<()> {
        for group in groups {
            let p4 = self.get_branch::<Vec<Lv>>(&group.p4, true)?.clone();
            for i in 0..multiplicity {
                let base = flat_name(&group.p4, i);
                for (comp, get) in P4_COMPONENTS {
                    let value = p4.get(i).map_or(UNSET_FLOAT, get);
                    self.set_branch(&format!("{base}_{comp}"), value)?;
                }
            }
            for name in &group.floats {
                self.set_flat::<f32>(name, multiplicity)?;
            }
            for name in &group.ints {
                self.set_flat::<i32>(name, multiplicity)?;
            }
            for name in &group.bools {
                self.set_flat::<bool>(name, multiplicity)?;
            }
            for name in &group.strings {
                self.set_flat::<String>(name, multiplicity)?;
            }
        }
        Ok(())
    }
}
