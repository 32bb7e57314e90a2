//! Greedy best-first selection of the final fits.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use trkcore::geometry::wafer::TrackerGeometry;

use crate::config::SegmentFitConfig;
use crate::segment::candidate::FitCandidate;
use crate::segment::gate::QualityGate;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionPolicy {
    /// Allowed share of a candidate's clusters already used by a selected
    /// fit. Negative means no shared cluster at all.
    pub shared_hit_fraction: f64,
    pub min_clusters_per_fit: usize,
    /// Number of selected fits after which overlap removal starts.
    pub overlap_guard_after: usize,
}

impl From<&SegmentFitConfig> for SelectionPolicy {
    fn from(cfg: &SegmentFitConfig) -> Self {
        Self {
            shared_hit_fraction: cfg.shared_hit_fraction,
            min_clusters_per_fit: cfg.min_clusters_per_fit,
            overlap_guard_after: cfg.overlap_guard_after.max(1),
        }
    }
}

impl SelectionPolicy {
    /// Disjoint fits only, checked from the first selection on.
    pub fn exclusive(min_clusters_per_fit: usize) -> Self {
        Self {
            shared_hit_fraction: -1.0,
            min_clusters_per_fit,
            overlap_guard_after: 1,
        }
    }

    /// True when `candidate` overlaps `selected` more than allowed.
    #[inline]
    pub fn shares_too_much(&self, candidate: &FitCandidate, selected: &FitCandidate) -> bool {
        let shared = candidate.cluster_mask.intersection(selected.cluster_mask).len();
        if self.shared_hit_fraction < 0.0 {
            shared > 0
        } else {
            shared as f64 > self.shared_hit_fraction * candidate.n_clusters() as f64
        }
    }
}

/// Orders candidates by cluster count (desc), then χ² (asc), then mask.
pub fn rank(candidates: &mut [FitCandidate]) {
    candidates.sort_by_key(|c| (Reverse(c.n_clusters()), OrderedFloat(c.fit.chi2), c.cluster_mask));
}

/// Picks fits best-first. Candidates failing the reduced χ² cut never
/// enter the ranking.
pub fn select_fits<G, I>(fits: I, gate: &QualityGate<'_, G>, policy: &SelectionPolicy) -> Vec<FitCandidate>
where
    G: TrackerGeometry + ?Sized,
    I: IntoIterator<Item = FitCandidate>,
{
    let mut remaining: Vec<FitCandidate> = fits.into_iter().filter(|c| gate.passes_quality(c)).collect();
    rank(&mut remaining);
    remaining.reverse();

    let mut selected: Vec<FitCandidate> = Vec::new();
    while let Some(best) = remaining.pop() {
        selected.push(best);
        if selected.len() < policy.overlap_guard_after {
            continue;
        }
        remaining.retain(|c| {
            c.n_clusters() >= policy.min_clusters_per_fit
                && !selected.iter().any(|s| policy.shares_too_much(c, s))
        });
    }

    selected
}
