//! Per-station segment finding.
//!
//! Each station runs a straight pipeline: occupancy gate, records and
//! compatibility graph, seed enumeration and gating, growth, selection.
//! Everything a station pass needs lives in a [`StationContext`] built
//! fresh for that pass, so stations and events never share mutable state.

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::{debug, warn};
use trkcore::data::cluster::RawCluster;
use trkcore::data::cluster_set::ClusterSet;
use trkcore::geometry::layout::MAX_STATIONS;
use trkcore::geometry::wafer::TrackerGeometry;

use crate::config::SegmentFitConfig;
use crate::error::Result;
use crate::finder::{RunStats, TrackFinder};
use crate::segment::candidate::FitCandidate;
use crate::segment::compat::{CompatibilityGraph, CompatibilityRules};
use crate::segment::gate::{QualityCuts, QualityGate};
use crate::segment::grow::grow_fits;
use crate::segment::record::ClusterRecord;
use crate::segment::seeds::enumerate_seeds;
use crate::segment::select::{select_fits, SelectionPolicy};
use crate::segment::track::SegmentTrack;

/// Clusters of one event split by station, in station order.
///
/// Clusters on unknown wafers or stations are dropped with a warning.
/// Stations past the `u8` range cannot be addressed and are not visited.
pub fn group_by_station<'a, G: TrackerGeometry + ?Sized>(
    geometry: &G,
    clusters: &'a [RawCluster],
) -> Vec<(u8, Vec<&'a RawCluster>)> {
    let count = geometry.station_count();
    if count > MAX_STATIONS {
        warn!(stations = count, "geometry reports more than {} stations, ignoring the rest", MAX_STATIONS);
    }
    let mut stations: Vec<(u8, Vec<&RawCluster>)> =
        (0..=u8::MAX).take(count).map(|s| (s, Vec::new())).collect();
    for cluster in clusters {
        let Some(address) = geometry.address(cluster.wafer) else {
            warn!(cluster = cluster.id, wafer = cluster.wafer.0, "unknown wafer, skipping cluster");
            continue;
        };
        match stations.get_mut(address.station as usize) {
            Some((_, bucket)) => bucket.push(cluster),
            None => warn!(cluster = cluster.id, station = address.station, "cluster outside known stations"),
        }
    }
    stations
}

/// Records and compatibility graph of one station pass.
#[derive(Clone, Debug)]
pub struct StationContext {
    pub station: u8,
    pub z_center: f64,
    pub records: Vec<ClusterRecord>,
    pub graph: CompatibilityGraph,
}

impl StationContext {
    /// `None` when the geometry does not know the station.
    pub fn build<G: TrackerGeometry + ?Sized>(
        station: u8,
        clusters: &[&RawCluster],
        geometry: &G,
        config: &SegmentFitConfig,
    ) -> Option<Self> {
        let z_center = geometry.station_center_z(station)?;
        let records: Vec<ClusterRecord> = clusters
            .iter()
            .filter_map(|c| geometry.address(c.wafer).map(|a| (*c, a)))
            .enumerate()
            .map(|(i, (c, a))| ClusterRecord::build(i, c, &a, geometry.element(c.wafer), config.edge_strips))
            .collect();
        let graph = CompatibilityGraph::build(&records, &CompatibilityRules::from(config));
        Some(Self { station, z_center, records, graph })
    }
}

pub struct SegmentFinder<'g, G: TrackerGeometry + ?Sized> {
    geometry: &'g G,
    config: SegmentFitConfig,
    gate: QualityGate<'g, G>,
    policy: SelectionPolicy,
    stats: RunStats,
}

impl<'g, G: TrackerGeometry + ?Sized> SegmentFinder<'g, G> {
    /// Validates the configuration once; later failures are per-station skips.
    pub fn new(geometry: &'g G, config: SegmentFitConfig) -> Result<Self> {
        let config = config.validate()?;
        Ok(Self {
            geometry,
            gate: QualityGate::new(geometry, QualityCuts::from(&config)),
            policy: SelectionPolicy::from(&config),
            config,
            stats: RunStats::default(),
        })
    }

    pub fn config(&self) -> &SegmentFitConfig {
        &self.config
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

        let Some(ctx) = StationContext::build(station, clusters, self.geometry, &self.config) else {
            warn!(station, "no centre z for station, skipping");
            return Vec::new();
        };

        let seeds = enumerate_seeds(&ctx.records, &ctx.graph);
        RunStats::bump(&self.stats.seeds, seeds.len());
        if ctx.records.len() < self.config.min_clusters {
            return Vec::new();
        }

        let mut good: Vec<FitCandidate> = Vec::new();
        let mut bad_masks: HashSet<ClusterSet> = HashSet::new();
        for seed in &seeds {
            let candidate = FitCandidate::from_seed(seed, &ctx.records, ctx.z_center);
            if self.gate.accepts_fit(&candidate, &ctx.records, ctx.z_center) {
                good.push(candidate);
            } else {
                bad_masks.insert(seed.mask);
            }
        }
        RunStats::bump(&self.stats.good_seeds, good.len());
        if good.is_empty() {
            debug!(station, seeds = seeds.len(), "no good seeds");
            return Vec::new();
        }

        let fits = grow_fits(&ctx, good, &mut bad_masks, &self.gate, self.config.residual_cut);
        RunStats::bump(&self.stats.fits, fits.len());

        let selected = select_fits(fits.into_values(), &self.gate, &self.policy);
        let tracks: Vec<SegmentTrack> = selected
            .iter()
            .map(|c| SegmentTrack::from_candidate(station, c, &ctx.records, ctx.z_center))
            .collect();
        RunStats::bump(&self.stats.tracks, tracks.len());
        debug!(station, clusters = n, seeds = seeds.len(), tracks = tracks.len(), "station done");
        tracks
    }
}

impl<G: TrackerGeometry + ?Sized> TrackFinder for SegmentFinder<'_, G> {
    fn name(&self) -> &'static str {
        "segment"
    }

    fn process_event(&self, clusters: &[RawCluster]) -> Vec<SegmentTrack> {
        RunStats::bump(&self.stats.events, 1);
        let stations = group_by_station(self.geometry, clusters);

        let per_station: Vec<Vec<SegmentTrack>> = if self.config.parallel_stations {
            stations
                .par_iter()
                .map(|(s, c)| self.process_station(*s, c))
                .collect()
        } else {
            stations
                .iter()
                .map(|(s, c)| self.process_station(*s, c))
                .collect()
        };
        per_station.into_iter().flatten().collect()
    }

    fn stats(&self) -> &RunStats {
        &self.stats
    }
}
