//! Exhaustive enumeration of four-cluster seeds.
//!
//! A seed has two clusters in each stereo view, all pairwise compatible,
//! and never three clusters on one layer. The walk over `i < j < k < l`
//! intersects compatibility sets as it goes and checks the running view
//! counts before each member is added, so branches that can no longer
//! balance the views are never expanded.

use trkcore::data::cluster_set::ClusterSet;

use crate::segment::compat::CompatibilityGraph;
use crate::segment::record::ClusterRecord;

/// Clusters a seed takes from each stereo view.
pub const PER_VIEW: u8 = 2;

/// Running member counts per stereo view of a partial seed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewCounts {
    pub plus: u8,
    pub minus: u8,
}

impl ViewCounts {
    /// Counts after adding a member of `view`, or `None` if the result can
    /// no longer end with exactly [`PER_VIEW`] in each view.
    #[inline]
    pub fn with(self, view: i8) -> Option<Self> {
        match view {
            1 if self.plus < PER_VIEW => Some(Self { plus: self.plus + 1, ..self }),
            -1 if self.minus < PER_VIEW => Some(Self { minus: self.minus + 1, ..self }),
            _ => None,
        }
    }

    #[inline]
    pub fn is_balanced(&self) -> bool {
        self.plus == PER_VIEW && self.minus == PER_VIEW
    }
}

/// True when at least three of the labels are equal.
#[inline]
pub fn has_layer_triple(layers: &[u8]) -> bool {
    layers
        .iter()
        .any(|l| layers.iter().filter(|m| *m == l).count() >= 3)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Seed {
    pub members: [usize; 4],
    pub mask: ClusterSet,
    /// Clusters compatible with every member, members excluded.
    pub compatible: ClusterSet,
}

pub fn enumerate_seeds(records: &[ClusterRecord], graph: &CompatibilityGraph) -> Vec<Seed> {
    let mut seeds = Vec::new();

    for (i, ri) in records.iter().enumerate() {
        let Some(c1) = ViewCounts::default().with(ri.view) else { continue };
        let ci = graph.compatible_with(i);

        for j in ci.iter_above(i) {
            let rj = &records[j];
            let Some(c2) = c1.with(rj.view) else { continue };
            let cij = ci & graph.compatible_with(j);

            for k in cij.iter_above(j) {
                let rk = &records[k];
                let Some(c3) = c2.with(rk.view) else { continue };
                // no seed can contain a same-layer triple
                if has_layer_triple(&[ri.layer, rj.layer, rk.layer]) {
                    continue;
                }
                let cijk = cij & graph.compatible_with(k);

                for l in cijk.iter_above(k) {
                    let rl = &records[l];
                    let Some(c4) = c3.with(rl.view) else { continue };
                    debug_assert!(c4.is_balanced());
                    if has_layer_triple(&[ri.layer, rj.layer, rk.layer, rl.layer]) {
                        continue;
                    }
                    let mask = ClusterSet::from_indices([i, j, k, l]);
                    let compatible = (cijk & graph.compatible_with(l)) - mask;
                    seeds.push(Seed { members: [i, j, k, l], mask, compatible });
                }
            }
        }
    }

    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentFitConfig;
    use crate::segment::compat::CompatibilityRules;
    use crate::test_utils::{layout, line_clusters, noise_clusters, records, Line};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn graph_for(recs: &[ClusterRecord]) -> CompatibilityGraph {
        CompatibilityGraph::build(recs, &CompatibilityRules::from(&SegmentFitConfig::default()))
    }

    #[test]
    fn test_view_counts_prune() {
        let c = ViewCounts::default();
        let c = c.with(1).unwrap().with(1).unwrap();
        assert!(c.with(1).is_none());
        assert!(c.with(0).is_none());
        let c = c.with(-1).unwrap();
        assert!(!c.is_balanced());
        let c = c.with(-1).unwrap();
        assert!(c.is_balanced());
        assert!(c.with(-1).is_none());
        assert!(ViewCounts::default().with(0).is_none());
    }

    #[test]
    fn test_layer_triple() {
        assert!(has_layer_triple(&[1, 1, 1]));
        assert!(has_layer_triple(&[0, 2, 2, 2]));
        assert!(!has_layer_triple(&[0, 0, 1, 1]));
        assert!(!has_layer_triple(&[0, 1, 2, 0]));
    }

    #[test]
    fn test_single_track_seeds() {
        let geo = layout();
        let clusters = line_clusters(&geo, 1, &Line::new(10.0, 20.0, 0.001, -0.002), 0);
        assert_eq!(clusters.len(), 6);
        let recs = records(&geo, &clusters);
        let seeds = enumerate_seeds(&recs, &graph_for(&recs));
        // three clusters per view, choose two of each
        assert_eq!(seeds.len(), 9);
        for s in &seeds {
            assert_eq!(s.mask.len(), 4);
            assert_eq!(s.compatible.len(), 2);
            assert!(s.compatible.intersection(s.mask).is_empty());
        }
    }

    #[test]
    fn test_seed_invariants_on_noise() {
        let geo = layout();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..10 {
            let clusters = noise_clusters(&geo, 0, 30, &mut rng, 0);
            let recs = records(&geo, &clusters);
            let graph = graph_for(&recs);
            for s in enumerate_seeds(&recs, &graph) {
                let [i, j, k, l] = s.members;
                assert!(i < j && j < k && k < l);
                let plus = s.members.iter().filter(|&&m| recs[m].view == 1).count();
                let minus = s.members.iter().filter(|&&m| recs[m].view == -1).count();
                assert_eq!((plus, minus), (2, 2));
                let layers: Vec<u8> = s.members.iter().map(|&m| recs[m].layer).collect();
                assert!(!has_layer_triple(&layers));
                for &a in &s.members {
                    for &b in &s.members {
                        assert!(graph.are_compatible(a, b));
                    }
                }
            }
        }
    }

    #[test]
    fn test_inert_records_yield_no_seeds() {
        let geo = layout();
        let clusters = line_clusters(&geo, 1, &Line::new(10.0, 20.0, 0.0, 0.0), 0);
        let mut recs = records(&geo, &clusters);
        for r in &mut recs {
            r.view = 0;
        }
        assert!(enumerate_seeds(&recs, &graph_for(&recs)).is_empty());
    }
}
