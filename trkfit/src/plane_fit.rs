//! Single-station plane fit.
//!
//! A lighter alternative to the segment finder: clusters are bucketed by
//! plane (layer, side) and every combination taking at most one cluster per
//! plane is fitted. No compatibility graph and no growth; the combinatorics
//! are bounded by refusing stations with a busy plane.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, warn};
use trkcore::data::cluster::RawCluster;
use trkcore::geometry::wafer::TrackerGeometry;

use crate::config::PlaneFitConfig;
use crate::error::Result;
use crate::finder::{RunStats, TrackFinder};
use crate::segment::candidate::FitCandidate;
use crate::segment::gate::{QualityCuts, QualityGate};
use crate::segment::record::ClusterRecord;
use crate::segment::select::{select_fits, SelectionPolicy};
use crate::segment::station::group_by_station;
use crate::segment::track::SegmentTrack;

/// Active records of one station keyed by (layer, side).
pub fn bucket_by_plane(records: &[ClusterRecord]) -> BTreeMap<(u8, u8), Vec<usize>> {
    let mut planes: BTreeMap<(u8, u8), Vec<usize>> = BTreeMap::new();
    for r in records.iter().filter(|r| r.is_active()) {
        planes.entry((r.layer, r.side)).or_default().push(r.index);
    }
    planes
}

/// Every choice of at most one cluster per plane covering at least
/// `min_planes` planes with two clusters in each view.
pub fn plane_combinations(
    planes: &[Vec<usize>],
    records: &[ClusterRecord],
    min_planes: usize,
) -> Vec<Vec<usize>> {
    fn walk(
        plane: usize,
        planes: &[Vec<usize>],
        records: &[ClusterRecord],
        min_planes: usize,
        current: &mut Vec<usize>,
        out: &mut Vec<Vec<usize>>,
    ) {
        // not enough planes left to reach the minimum
        if current.len() + (planes.len() - plane) < min_planes {
            return;
        }
        if plane == planes.len() {
            let plus = current.iter().filter(|&&i| records[i].view > 0).count();
            let minus = current.len() - plus;
            if plus >= 2 && minus >= 2 {
                out.push(current.clone());
            }
            return;
        }
        for &idx in &planes[plane] {
            current.push(idx);
            walk(plane + 1, planes, records, min_planes, current, out);
            current.pop();
        }
        walk(plane + 1, planes, records, min_planes, current, out);
    }

    let mut out = Vec::new();
    walk(0, planes, records, min_planes, &mut Vec::new(), &mut out);
    out
}

pub struct PlaneFitter<'g, G: TrackerGeometry + ?Sized> {
    geometry: &'g G,
    config: PlaneFitConfig,
    gate: QualityGate<'g, G>,
    stats: RunStats,
}

impl<'g, G: TrackerGeometry + ?Sized> PlaneFitter<'g, G> {
    pub fn new(geometry: &'g G, config: PlaneFitConfig) -> Result<Self> {
        let config = config.validate()?;
        Ok(Self {
            geometry,
            gate: QualityGate::new(geometry, QualityCuts::from(&config)),
            config,
            stats: RunStats::default(),
        })
    }

    pub fn process_station(&self, station: u8, clusters: &[&RawCluster]) -> Vec<SegmentTrack> {
        RunStats::bump(&self.stats.stations, 1);

        let n = clusters.len();
        if n < self.config.min_clusters {
            RunStats::bump(&self.stats.low_occupancy, 1);
            debug!(station, clusters = n, "low occupancy");
            return Vec::new();
        }
        if n > self.config.max_clusters {
            RunStats::bump(&self.stats.excess_occupancy, 1);
            debug!(station, clusters = n, "excess occupancy");
            return Vec::new();
        }
        let Some(z_center) = self.geometry.station_center_z(station) else {
            warn!(station, "no centre z for station, skipping");
            return Vec::new();
        };

        let records: Vec<ClusterRecord> = clusters
            .iter()
            .filter_map(|c| self.geometry.address(c.wafer).map(|a| (*c, a)))
            .enumerate()
            .map(|(i, (c, a))| ClusterRecord::build(i, c, &a, self.geometry.element(c.wafer), 0))
            .collect();

        let planes = bucket_by_plane(&records);
        if let Some(((layer, side), busy)) = planes.iter().find(|(_, v)| v.len() > self.config.max_clusters_per_plane) {
            RunStats::bump(&self.stats.excess_occupancy, 1);
            debug!(station, layer, side, clusters = busy.len(), "busy plane");
            return Vec::new();
        }
        let planes: Vec<Vec<usize>> = planes.into_values().collect();

        let combos = plane_combinations(&planes, &records, self.config.min_planes);
        RunStats::bump(&self.stats.seeds, combos.len());

        let accepted: Vec<FitCandidate> = combos
            .iter()
            .map(|members| FitCandidate::from_members(members, &records, z_center))
            .filter(|c| self.gate.accepts_fit(c, &records, z_center))
            .collect();
        RunStats::bump(&self.stats.good_seeds, accepted.len());
        RunStats::bump(&self.stats.fits, accepted.len());
        if accepted.is_empty() {
            debug!(station, combinations = combos.len(), "no accepted combination");
            return Vec::new();
        }

        let policy = SelectionPolicy::exclusive(self.config.min_planes);
        let tracks: Vec<SegmentTrack> = select_fits(accepted, &self.gate, &policy)
            .iter()
            .map(|c| SegmentTrack::from_candidate(station, c, &records, z_center))
            .collect();
        RunStats::bump(&self.stats.tracks, tracks.len());
        debug!(station, clusters = n, tracks = tracks.len(), "station done");
        tracks
    }
}

impl<G: TrackerGeometry + ?Sized> TrackFinder for PlaneFitter<'_, G> {
    fn name(&self) -> &'static str {
        "plane"
    }

    fn process_event(&self, clusters: &[RawCluster]) -> Vec<SegmentTrack> {
        RunStats::bump(&self.stats.events, 1);
        group_by_station(self.geometry, clusters)
            .par_iter()
            .map(|(s, c)| self.process_station(*s, c))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }

    fn stats(&self) -> &RunStats {
        &self.stats
    }
}
