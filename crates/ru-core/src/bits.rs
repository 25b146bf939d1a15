//! Growable bit set, the trigger/flag word type of event ntuples.

use serde::{Deserialize, Serialize};

/// A growable set of bits. Unset bits past the end read as `false`.
///
/// Serialized as the list of 64-bit storage words, least significant first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<u64>", into = "Vec<u64>")]
pub struct Bits {
    words: Vec<u64>,
}

impl Bits {
    /// Empty bit set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bit `index`, growing the storage when needed.
    pub fn set_bit(&mut self, index: usize) {
        let (w, b) = (index / 64, index % 64);
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        self.words[w] |= 1 << b;
    }

    /// Clear bit `index`.
    pub fn reset_bit(&mut self, index: usize) {
        if let Some(word) = self.words.get_mut(index / 64) {
            *word &= !(1 << (index % 64));
        }
        self.trim();
    }

    /// Whether bit `index` is set.
    pub fn test_bit(&self, index: usize) -> bool {
        self.words.get(index / 64).is_some_and(|w| w & (1 << (index % 64)) != 0)
    }

    /// Number of set bits.
    pub fn count_bits(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// One past the highest set bit (0 when empty).
    pub fn nbits(&self) -> usize {
        match self.words.last() {
            Some(&w) => (self.words.len() - 1) * 64 + (64 - w.leading_zeros() as usize),
            None => 0,
        }
    }

    /// Clear every bit.
    pub fn reset_all(&mut self) {
        self.words.clear();
    }

    /// Indices of set bits, ascending.
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nbits()).filter(|&i| self.test_bit(i))
    }

    /// Little-endian packed bytes, without trailing zero bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out: Vec<u8> = self.words.iter().flat_map(|w| w.to_le_bytes()).collect();
        while out.last() == Some(&0) {
            out.pop();
        }
        out
    }

    /// Inverse of [`Bits::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let words: Vec<u64> = bytes
            .chunks(8)
            .map(|c| {
                let mut buf = [0u8; 8];
                buf[..c.len()].copy_from_slice(c);
                u64::from_le_bytes(buf)
            })
            .collect();
        Self::from(words)
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

impl PartialEq for Bits {
    fn eq(&self, other: &Self) -> bool {
        let n = self.words.len().max(other.words.len());
        (0..n).all(|i| {
            self.words.get(i).copied().unwrap_or(0) == other.words.get(i).copied().unwrap_or(0)
        })
    }
}

impl Eq for Bits {}

impl From<Vec<u64>> for Bits {
    fn from(words: Vec<u64>) -> Self {
        let mut bits = Self { words };
        bits.trim();
        bits
    }
}

impl From<Bits> for Vec<u64> {
    fn from(bits: Bits) -> Self {
        bits.words
    }
}

impl FromIterator<usize> for Bits {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut bits = Bits::new();
        for i in iter {
            bits.set_bit(i);
        }
        bits
    }
}
