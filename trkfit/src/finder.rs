//! Common surface of the per-event track finders and their run counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::info;
use trkcore::data::cluster::RawCluster;

use crate::segment::track::SegmentTrack;

/// Per-event reconstruction. Implementations hold no per-event state, so one
/// finder may serve many events concurrently.
pub trait TrackFinder: Sync {
    fn name(&self) -> &'static str;

    /// Tracks of one event, ordered by station.
    fn process_event(&self, clusters: &[RawCluster]) -> Vec<SegmentTrack>;

    fn stats(&self) -> &RunStats;

    /// Snapshot of the run counters, logged once.
    fn finalize(&self) -> RunSummary {
        let summary = self.stats().snapshot();
        info!(
            algorithm = self.name(),
            events = summary.events,
            stations = summary.stations,
            low_occupancy = summary.low_occupancy,
            excess_occupancy = summary.excess_occupancy,
            seeds = summary.seeds,
            good_seeds = summary.good_seeds,
            fits = summary.fits,
            tracks = summary.tracks,
            "run finished"
        );
        summary
    }
}

/// Running counters, safe to bump from concurrent events.
#[derive(Debug, Default)]
pub struct RunStats {
    pub events: AtomicU64,
    pub stations: AtomicU64,
    pub low_occupancy: AtomicU64,
    pub excess_occupancy: AtomicU64,
    pub seeds: AtomicU64,
    pub good_seeds: AtomicU64,
    pub fits: AtomicU64,
    pub tracks: AtomicU64,
}

impl RunStats {
    #[inline]
    pub fn bump(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunSummary {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        RunSummary {
            events: get(&self.events),
            stations: get(&self.stations),
            low_occupancy: get(&self.low_occupancy),
            excess_occupancy: get(&self.excess_occupancy),
            seeds: get(&self.seeds),
            good_seeds: get(&self.good_seeds),
            fits: get(&self.fits),
            tracks: get(&self.tracks),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub events: u64,
    /// Stations visited, skipped ones included.
    pub stations: u64,
    pub low_occupancy: u64,
    pub excess_occupancy: u64,
    pub seeds: u64,
    pub good_seeds: u64,
    /// Fits reaching selection, seeds included.
    pub fits: u64,
    pub tracks: u64,
}
