//! Breadth-first growth of good seeds into maximal fits.
//!
//! Every round tries to add each compatible cluster to each fit found in
//! the previous round. A cheap y-residual test runs before any refit, and
//! masks that already failed the fit acceptance are remembered so no
//! combination is fitted twice. Fits reached along different paths
//! collapse onto one entry keyed by their cluster mask.

use std::collections::{BTreeMap, HashSet};

use trkcore::data::cluster_set::ClusterSet;
use trkcore::geometry::wafer::TrackerGeometry;

use crate::segment::candidate::FitCandidate;
use crate::segment::gate::QualityGate;
use crate::segment::station::StationContext;

/// Grow `seeds` until a round adds nothing new.
///
/// The result holds the seeds themselves and every accepted extension.
/// `bad_masks` is read and extended with every mask that failed.
pub fn grow_fits<G: TrackerGeometry + ?Sized>(
    ctx: &StationContext,
    seeds: Vec<FitCandidate>,
    bad_masks: &mut HashSet<ClusterSet>,
    gate: &QualityGate<'_, G>,
    residual_cut: f64,
) -> BTreeMap<ClusterSet, FitCandidate> {
    let mut all: BTreeMap<ClusterSet, FitCandidate> = BTreeMap::new();
    for s in seeds {
        all.entry(s.cluster_mask).or_insert(s);
    }
    let mut frontier: Vec<ClusterSet> = all.keys().copied().collect();

    while !frontier.is_empty() {
        let mut next: BTreeMap<ClusterSet, FitCandidate> = BTreeMap::new();

        for mask in &frontier {
            let Some(parent) = all.get(mask) else { continue };
            for idx in parent.compatible_mask.iter() {
                let r = &ctx.records[idx];
                let dz = r.z - ctx.z_center;
                if (parent.fit.y_at(dz) - r.y_center).abs() > residual_cut {
                    continue;
                }
                let grown_mask = parent.cluster_mask.with(idx);
                if all.contains_key(&grown_mask) || next.contains_key(&grown_mask) || bad_masks.contains(&grown_mask) {
                    continue;
                }
                let grown = parent.extended(r, ctx.graph.compatible_with(idx), ctx.z_center);
                if gate.accepts_fit(&grown, &ctx.records, ctx.z_center) {
                    next.insert(grown_mask, grown);
                } else {
                    bad_masks.insert(grown_mask);
                }
            }
        }

        frontier = next.keys().copied().collect();
        all.extend(next);
    }

    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentFitConfig;
    use crate::segment::gate::QualityCuts;
    use crate::segment::seeds::enumerate_seeds;
    use crate::test_utils::{layout, line_clusters, noise_clusters, Line};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn good_seeds<G: TrackerGeometry + ?Sized>(
        ctx: &StationContext,
        gate: &QualityGate<'_, G>,
    ) -> (Vec<FitCandidate>, HashSet<ClusterSet>) {
        let mut good = Vec::new();
        let mut bad = HashSet::new();
        for s in enumerate_seeds(&ctx.records, &ctx.graph) {
            let c = FitCandidate::from_seed(&s, &ctx.records, ctx.z_center);
            if gate.accepts_fit(&c, &ctx.records, ctx.z_center) {
                good.push(c);
            } else {
                bad.insert(s.mask);
            }
        }
        (good, bad)
    }

    #[test]
    fn test_single_track_grows_to_all_clusters() {
        let geo = layout();
        let cfg = SegmentFitConfig::default();
        let clusters = line_clusters(&geo, 1, &Line::new(10.0, 20.0, 0.001, 0.002), 0);
        let ctx = StationContext::build(1, &clusters.iter().collect::<Vec<_>>(), &geo, &cfg).unwrap();
        let gate = QualityGate::new(&geo, QualityCuts::from(&cfg));

        let (good, mut bad) = good_seeds(&ctx, &gate);
        assert_eq!(good.len(), 9);
        let grown = grow_fits(&ctx, good, &mut bad, &gate, cfg.residual_cut);

        // 9 seeds, 6 five-cluster fits, 1 six-cluster fit
        assert_eq!(grown.len(), 16);
        assert_eq!(grown.values().filter(|c| c.n_clusters() == 5).count(), 6);
        let full = ClusterSet::from_indices(0..6);
        assert!(grown.contains_key(&full));
        for (mask, c) in &grown {
            assert_eq!(*mask, c.cluster_mask);
        }
    }

    #[test]
    fn test_growth_is_monotonic_and_view_balanced() {
        let geo = layout();
        let cfg = SegmentFitConfig::default();
        let mut rng = StdRng::seed_from_u64(99);
        for round in 0..5 {
            let mut clusters = line_clusters(&geo, 0, &Line::new(-20.0, -35.0, 0.0, 0.001), 0);
            clusters.extend(line_clusters(&geo, 0, &Line::new(-22.0, -33.0, 0.0005, 0.0), 100));
            clusters.extend(noise_clusters(&geo, 0, 6 + round, &mut rng, 200));
            let refs: Vec<_> = clusters.iter().collect();
            let ctx = StationContext::build(0, &refs, &geo, &cfg).unwrap();
            let gate = QualityGate::new(&geo, QualityCuts::from(&cfg));

            let (good, mut bad) = good_seeds(&ctx, &gate);
            let seed_masks: Vec<ClusterSet> = good.iter().map(|c| c.cluster_mask).collect();
            let grown = grow_fits(&ctx, good, &mut bad, &gate, cfg.residual_cut);

            for c in grown.values() {
                assert!(seed_masks.iter().any(|s| s.is_subset(&c.cluster_mask)));
                assert!(gate.accepts_fit(c, &ctx.records, ctx.z_center));
                assert!(!bad.contains(&c.cluster_mask));
                let plus = c.members().filter(|&m| ctx.records[m].view == 1).count();
                let minus = c.members().filter(|&m| ctx.records[m].view == -1).count();
                assert!(plus >= 2 && minus >= 2);
            }
        }
    }

    #[test]
    fn test_residual_prefilter_blocks_growth() {
        let geo = layout();
        let cfg = SegmentFitConfig::default();
        let clusters = line_clusters(&geo, 1, &Line::new(10.0, 20.0, 0.0, 0.0), 0);
        let ctx = StationContext::build(1, &clusters.iter().collect::<Vec<_>>(), &geo, &cfg).unwrap();
        let gate = QualityGate::new(&geo, QualityCuts::from(&cfg));
        let (good, mut bad) = good_seeds(&ctx, &gate);
        let grown = grow_fits(&ctx, good, &mut bad, &gate, -1.0);
        assert_eq!(grown.len(), 9);
        assert!(grown.values().all(|c| c.n_clusters() == 4));
    }
}
