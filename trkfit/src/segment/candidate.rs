use trkcore::algorithm::linear_fit::{FitSums, LineFit};
use trkcore::data::cluster_set::ClusterSet;

use crate::config::SEED_SIZE;
use crate::segment::record::ClusterRecord;
use crate::segment::seeds::Seed;

/// A set of clusters together with its running sums and current fit.
///
/// The fit is re-solved whenever a member is added, so it always matches
/// the sums.
#[derive(Clone, Debug)]
pub struct FitCandidate {
    pub cluster_mask: ClusterSet,
    /// Clusters compatible with every member, members excluded.
    pub compatible_mask: ClusterSet,
    pub sums: FitSums,
    pub fit: LineFit,
}

impl FitCandidate {
    /// Candidate from explicit members; `compatible_mask` is left empty.
    pub fn from_members(members: &[usize], records: &[ClusterRecord], z_center: f64) -> Self {
        let mut sums = FitSums::new();
        let mut mask = ClusterSet::EMPTY;
        for &m in members {
            accumulate(&mut sums, &records[m], z_center);
            mask.insert(m);
        }
        Self {
            cluster_mask: mask,
            compatible_mask: ClusterSet::EMPTY,
            fit: LineFit::solve(&sums),
            sums,
        }
    }

    pub fn from_seed(seed: &Seed, records: &[ClusterRecord], z_center: f64) -> Self {
        let mut candidate = Self::from_members(&seed.members, records, z_center);
        candidate.compatible_mask = seed.compatible;
        candidate
    }

    /// Copy of this candidate with `record` added and the fit re-solved.
    pub fn extended(&self, record: &ClusterRecord, record_compatible: ClusterSet, z_center: f64) -> Self {
        let mut sums = self.sums;
        accumulate(&mut sums, record, z_center);
        Self {
            cluster_mask: self.cluster_mask.with(record.index),
            compatible_mask: (self.compatible_mask & record_compatible).without(record.index),
            fit: LineFit::solve(&sums),
            sums,
        }
    }

    #[inline]
    pub fn n_clusters(&self) -> usize {
        self.cluster_mask.len()
    }

    #[inline]
    pub fn ndof(&self) -> usize {
        self.n_clusters().saturating_sub(SEED_SIZE)
    }

    /// χ² per degree of freedom; `None` for a minimal candidate.
    pub fn reduced_chi2(&self) -> Option<f64> {
        match self.ndof() {
            0 => None,
            n => Some(self.fit.chi2 / n as f64),
        }
    }

    pub fn members(&self) -> impl Iterator<Item = usize> {
        self.cluster_mask.iter()
    }
}

#[inline]
fn accumulate(sums: &mut FitSums, r: &ClusterRecord, z_center: f64) {
    sums.add(r.sin_alpha, r.cos_alpha, r.z - z_center, r.u, r.sigma_sq);
}
