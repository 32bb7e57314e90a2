//! Run configuration.
//!
//! JSON keys follow the option names used by the reconstruction job
//! options (`MinClusters`, `TanThetaXZCut`, ...). Missing keys fall back to
//! the defaults below.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;
use trkcore::data::cluster_set::MAX_CLUSTERS;
use trkcore::geometry::layout::{LayoutConfig, TrackerLayout, MAX_STATIONS};

use crate::error::{Result, TrackFitError};

/// Smallest cluster count that can form a seed (two per stereo view).
pub const SEED_SIZE: usize = 4;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SegmentFitConfig {
    /// Stations with fewer clusters are skipped.
    pub min_clusters: usize,
    /// Stations with more clusters are skipped (noise guard, at most 128).
    pub max_clusters: usize,
    pub eta_overlap: bool,
    pub phi_overlap: bool,
    /// Strips from the wafer boundary that still count as edge strips.
    pub edge_strips: u32,
    /// Extrapolation tolerance on the wafer bounds (mm).
    pub wafer_tolerance: f64,
    /// y residual pre-filter when growing fits (mm).
    pub residual_cut: f64,
    /// 0 disables.
    pub tan_theta_cut: f64,
    /// 0 disables.
    #[serde(rename = "TanThetaXZCut")]
    pub tan_theta_xz_cut: f64,
    pub reduced_chi2_cut: f64,
    /// Negative means no shared clusters at all.
    pub shared_hit_fraction: f64,
    pub min_clusters_per_fit: usize,
    /// Overlap and size removal in selection starts once this many fits are selected.
    pub overlap_guard_after: usize,
    /// y-centre window for phi-overlap compatibility (mm).
    pub phi_overlap_window: f64,
    pub parallel_stations: bool,
}

impl Default for SegmentFitConfig {
    fn default() -> Self {
        Self {
            min_clusters: 4,
            max_clusters: 36,
            eta_overlap: true,
            phi_overlap: true,
            edge_strips: 32,
            wafer_tolerance: 3.0,
            residual_cut: 3.0,
            tan_theta_cut: 0.0,
            tan_theta_xz_cut: 0.0,
            reduced_chi2_cut: 10.0,
            shared_hit_fraction: -1.0,
            min_clusters_per_fit: 4,
            overlap_guard_after: 4,
            phi_overlap_window: 20.0,
            parallel_stations: false,
        }
    }
}

impl SegmentFitConfig {
    /// Checks run once before processing.
    ///
    /// `MinClusters > MaxClusters` is fatal; an oversized `MaxClusters` is
    /// clamped to the bitset capacity.
    pub fn validate(mut self) -> Result<Self> {
        if self.max_clusters > MAX_CLUSTERS {
            warn!(
                max_clusters = self.max_clusters,
                "MaxClusters exceeds the {} cluster ceiling, clamping", MAX_CLUSTERS
            );
            self.max_clusters = MAX_CLUSTERS;
        }
        if self.min_clusters < SEED_SIZE {
            warn!(min_clusters = self.min_clusters, "MinClusters below seed size, raising to {}", SEED_SIZE);
            self.min_clusters = SEED_SIZE;
        }
        if self.min_clusters > self.max_clusters {
            return Err(TrackFitError::InvalidConfig(format!(
                "MinClusters ({}) > MaxClusters ({})",
                self.min_clusters, self.max_clusters
            )));
        }
        if self.overlap_guard_after == 0 {
            self.overlap_guard_after = 1;
        }
        if !(self.reduced_chi2_cut > 0.0) {
            return Err(TrackFitError::InvalidConfig(format!(
                "ReducedChi2Cut must be positive, got {}",
                self.reduced_chi2_cut
            )));
        }
        Ok(self)
    }
}

/// Options of the single-station plane fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PlaneFitConfig {
    pub min_clusters: usize,
    pub max_clusters: usize,
    /// Minimum number of (layer, side) planes in a fit.
    pub min_planes: usize,
    /// Stations with a busier plane are skipped.
    pub max_clusters_per_plane: usize,
    pub wafer_tolerance: f64,
    pub tan_theta_cut: f64,
    #[serde(rename = "TanThetaXZCut")]
    pub tan_theta_xz_cut: f64,
    pub reduced_chi2_cut: f64,
}

impl Default for PlaneFitConfig {
    fn default() -> Self {
        Self {
            min_clusters: 4,
            max_clusters: 36,
            min_planes: 5,
            max_clusters_per_plane: 4,
            wafer_tolerance: 3.0,
            tan_theta_cut: 0.0,
            tan_theta_xz_cut: 0.0,
            reduced_chi2_cut: 10.0,
        }
    }
}

impl PlaneFitConfig {
    pub fn validate(mut self) -> Result<Self> {
        if self.max_clusters > MAX_CLUSTERS {
            warn!(
                max_clusters = self.max_clusters,
                "MaxClusters exceeds the {} cluster ceiling, clamping", MAX_CLUSTERS
            );
            self.max_clusters = MAX_CLUSTERS;
        }
        if self.min_planes < SEED_SIZE {
            warn!(min_planes = self.min_planes, "MinPlanes below seed size, raising to {}", SEED_SIZE);
            self.min_planes = SEED_SIZE;
        }
        if self.min_clusters > self.max_clusters {
            return Err(TrackFitError::InvalidConfig(format!(
                "MinClusters ({}) > MaxClusters ({})",
                self.min_clusters, self.max_clusters
            )));
        }
        if self.max_clusters_per_plane == 0 {
            return Err(TrackFitError::InvalidConfig("MaxClustersPerPlane must be at least 1".into()));
        }
        Ok(self)
    }
}

/// Everything a run needs, loadable from one JSON file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub segment: SegmentFitConfig,
    pub plane_fit: PlaneFitConfig,
    pub geometry: LayoutConfig,
}

impl RunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(f)?)
    }

    /// Detector layout of this run; stations past the `u8` range are dropped.
    pub fn layout(&self) -> TrackerLayout {
        let requested = self.geometry.station_z.len();
        if requested > MAX_STATIONS {
            warn!(stations = requested, "layout has more than {} stations, ignoring the rest", MAX_STATIONS);
        }
        TrackerLayout::new(self.geometry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trkcore::geometry::wafer::TrackerGeometry;

    #[test]
    fn test_defaults() {
        let cfg = SegmentFitConfig::default();
        assert_eq!(cfg.min_clusters, 4);
        assert_eq!(cfg.max_clusters, 36);
        assert_eq!(cfg.edge_strips, 32);
        assert!(cfg.shared_hit_fraction < 0.0);
        assert!(cfg.clone().validate().is_ok());
    }

    #[test]
    fn test_option_names_in_json() {
        let cfg: SegmentFitConfig = serde_json::from_str(
            r#"{"MinClusters": 5, "TanThetaXZCut": 0.1, "ReducedChi2Cut": 4.0, "EtaOverlap": false}"#,
        )
        .unwrap();
        assert_eq!(cfg.min_clusters, 5);
        assert_eq!(cfg.tan_theta_xz_cut, 0.1);
        assert_eq!(cfg.reduced_chi2_cut, 4.0);
        assert!(!cfg.eta_overlap);
        assert_eq!(cfg.max_clusters, 36);
    }

    #[test]
    fn test_min_above_max_is_fatal() {
        let cfg = SegmentFitConfig { min_clusters: 40, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(TrackFitError::InvalidConfig(_))));
    }

    #[test]
    fn test_max_clusters_clamped() {
        let cfg = SegmentFitConfig { max_clusters: 500, ..Default::default() }.validate().unwrap();
        assert_eq!(cfg.max_clusters, MAX_CLUSTERS);
    }

    #[test]
    fn test_plane_fit_max_clusters_clamped() {
        let cfg = PlaneFitConfig { max_clusters: 200, max_clusters_per_plane: 200, ..Default::default() }
            .validate()
            .unwrap();
        assert_eq!(cfg.max_clusters, MAX_CLUSTERS);
        assert_eq!(cfg.max_clusters_per_plane, 200);
    }

    #[test]
    fn test_plane_fit_min_above_max_is_fatal() {
        let cfg = PlaneFitConfig { min_clusters: 40, max_clusters: 36, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(TrackFitError::InvalidConfig(_))));
        // clamping happens first, so a minimum above the ceiling is fatal too
        let cfg = PlaneFitConfig { min_clusters: 150, max_clusters: 200, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(TrackFitError::InvalidConfig(_))));
    }

    #[test]
    fn test_run_layout_keeps_u8_stations() {
        let mut run = RunConfig::default();
        run.geometry.station_z = (0..260).map(|i| i as f64 * 500.0).collect();
        assert_eq!(run.layout().station_count(), MAX_STATIONS);
        assert_eq!(RunConfig::default().layout().station_count(), 4);
    }

    #[test]
    fn test_run_config_sections() {
        let run: RunConfig =
            serde_json::from_str(r#"{"segment": {"MaxClusters": 64}, "geometry": {"pitch": 0.1}}"#).unwrap();
        assert_eq!(run.segment.max_clusters, 64);
        assert_eq!(run.geometry.pitch, 0.1);
        assert_eq!(run.plane_fit, PlaneFitConfig::default());
    }
}
