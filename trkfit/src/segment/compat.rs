//! Pairwise compatibility of clusters within a station.
//!
//! Two clusters are compatible when one straight track could have produced
//! both. Clusters on different layers always are. On the same layer only
//! the two faces of one module, or neighbouring modules whose active areas
//! overlap, qualify.

use itertools::Itertools;
use trkcore::data::cluster_set::ClusterSet;

use crate::config::SegmentFitConfig;
use crate::segment::record::ClusterRecord;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompatibilityRules {
    pub eta_overlap: bool,
    pub phi_overlap: bool,
    pub edge_strips: u32,
    /// Max |Δ y_center| for phi-overlap pairs (mm).
    pub phi_overlap_window: f64,
}

impl From<&SegmentFitConfig> for CompatibilityRules {
    fn from(cfg: &SegmentFitConfig) -> Self {
        Self {
            eta_overlap: cfg.eta_overlap,
            phi_overlap: cfg.phi_overlap,
            edge_strips: cfg.edge_strips,
            phi_overlap_window: cfg.phi_overlap_window,
        }
    }
}

impl CompatibilityRules {
    pub fn compatible(&self, a: &ClusterRecord, b: &ClusterRecord) -> bool {
        if !a.is_active() || !b.is_active() {
            return false;
        }
        if a.layer != b.layer {
            return true;
        }
        if a.module_index == b.module_index {
            return a.side != b.side;
        }
        if a.phi == b.phi {
            // neighbouring columns of one row
            let window = self.edge_strips as f64 * (a.pitch + b.pitch);
            return self.eta_overlap && (a.y_end - b.y_end).abs() <= window;
        }
        self.phi_overlap
            && a.edge
            && b.edge
            && (a.y_center - b.y_center).abs() <= self.phi_overlap_window
            && (a.eta == b.eta || self.eta_overlap)
    }
}

/// Symmetric compatibility relation, one bitset per record.
///
/// Active records are compatible with themselves; inert ones with nothing.
#[derive(Clone, Debug, Default)]
pub struct CompatibilityGraph {
    sets: Vec<ClusterSet>,
}

impl CompatibilityGraph {
    pub fn build(records: &[ClusterRecord], rules: &CompatibilityRules) -> Self {
        let mut sets = vec![ClusterSet::EMPTY; records.len()];
        for (i, r) in records.iter().enumerate() {
            if r.is_active() {
                sets[i].insert(i);
            }
        }
        for ((i, a), (j, b)) in records.iter().enumerate().tuple_combinations() {
            if rules.compatible(a, b) {
                sets[i].insert(j);
                sets[j].insert(i);
            }
        }
        Self { sets }
    }

    #[inline]
    pub fn compatible_with(&self, index: usize) -> ClusterSet {
        self.sets.get(index).copied().unwrap_or_default()
    }

    #[inline]
    pub fn are_compatible(&self, i: usize, j: usize) -> bool {
        self.compatible_with(i).contains(j)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
