//! Fixed-capacity bitset over the cluster indices of one station.
//!
//! A station never holds more than [`MAX_CLUSTERS`] clusters for segment
//! finding, so membership fits into a single `u128`. Intersection, union,
//! popcount and hashing are all single machine operations, which keeps the
//! combinatorial seed search and the memoised grower cheap.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Sub};

/// Hard ceiling on clusters per station (one bit each).
pub const MAX_CLUSTERS: usize = 128;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterSet(u128);

impl ClusterSet {
    pub const EMPTY: Self = Self(0);

    #[inline]
    pub fn single(index: usize) -> Self {
        debug_assert!(index < MAX_CLUSTERS);
        Self(1u128 << index)
    }

    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        indices.into_iter().fold(Self::EMPTY, |set, i| set.with(i))
    }

    #[inline]
    pub fn bits(&self) -> u128 {
        self.0
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index < MAX_CLUSTERS && (self.0 >> index) & 1 == 1
    }

    #[inline]
    pub fn insert(&mut self, index: usize) {
        debug_assert!(index < MAX_CLUSTERS);
        self.0 |= 1u128 << index;
    }

    #[inline]
    pub fn remove(&mut self, index: usize) {
        if index < MAX_CLUSTERS {
            self.0 &= !(1u128 << index);
        }
    }

    #[inline]
    pub fn with(mut self, index: usize) -> Self {
        self.insert(index);
        self
    }

    #[inline]
    pub fn without(mut self, index: usize) -> Self {
        self.remove(index);
        self
    }

    /// Number of members (popcount).
    #[inline]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[inline]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.0 & !other.0 == 0
    }

    /// Member indices in ascending order.
    pub fn iter(&self) -> Indices {
        Indices(self.0)
    }

    /// Member indices strictly greater than `index`, ascending.
    pub fn iter_above(&self, index: usize) -> Indices {
        if index + 1 >= MAX_CLUSTERS {
            return Indices(0);
        }
        Indices(self.0 & (!0u128 << (index + 1)))
    }
}

/// Ascending iterator over the set bits of a [`ClusterSet`].
#[derive(Clone, Debug)]
pub struct Indices(u128);

impl Iterator for Indices {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let i = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(i)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Indices {}

impl FromIterator<usize> for ClusterSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::from_indices(iter)
    }
}

impl BitAnd for ClusterSet {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl BitAndAssign for ClusterSet {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitOr for ClusterSet {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for ClusterSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Sub for ClusterSet {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.difference(rhs)
    }
}

impl fmt::Debug for ClusterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
