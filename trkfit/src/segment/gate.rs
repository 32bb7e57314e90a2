//! Acceptance checks on fitted candidates.
//!
//! Seeds and grown fits must have a regular fit, respect the slope cuts,
//! and pass through every member's wafer. Before selection, fits with
//! degrees of freedom must also pass the reduced χ² cut. Rejected
//! candidates are dropped, never refitted.

use trkcore::geometry::wafer::TrackerGeometry;

use crate::config::{PlaneFitConfig, SegmentFitConfig};
use crate::segment::candidate::FitCandidate;
use crate::segment::record::ClusterRecord;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QualityCuts {
    pub wafer_tolerance: f64,
    /// 0 disables.
    pub tan_theta_cut: f64,
    /// 0 disables.
    pub tan_theta_xz_cut: f64,
    pub reduced_chi2_cut: f64,
}

impl From<&SegmentFitConfig> for QualityCuts {
    fn from(cfg: &SegmentFitConfig) -> Self {
        Self {
            wafer_tolerance: cfg.wafer_tolerance,
            tan_theta_cut: cfg.tan_theta_cut,
            tan_theta_xz_cut: cfg.tan_theta_xz_cut,
            reduced_chi2_cut: cfg.reduced_chi2_cut,
        }
    }
}

impl From<&PlaneFitConfig> for QualityCuts {
    fn from(cfg: &PlaneFitConfig) -> Self {
        Self {
            wafer_tolerance: cfg.wafer_tolerance,
            tan_theta_cut: cfg.tan_theta_cut,
            tan_theta_xz_cut: cfg.tan_theta_xz_cut,
            reduced_chi2_cut: cfg.reduced_chi2_cut,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    Singular,
    TanTheta,
    TanThetaXZ,
    OutOfBounds,
    ReducedChi2,
}

pub struct QualityGate<'g, G: TrackerGeometry + ?Sized> {
    geometry: &'g G,
    cuts: QualityCuts,
}

impl<'g, G: TrackerGeometry + ?Sized> QualityGate<'g, G> {
    pub fn new(geometry: &'g G, cuts: QualityCuts) -> Self {
        Self { geometry, cuts }
    }

    pub fn cuts(&self) -> &QualityCuts {
        &self.cuts
    }

    /// Acceptance of a freshly fitted seed or grown fit.
    pub fn check_fit(
        &self,
        candidate: &FitCandidate,
        records: &[ClusterRecord],
        z_center: f64,
    ) -> Result<(), Rejection> {
        let fit = &candidate.fit;
        if !fit.has_covariance {
            return Err(Rejection::Singular);
        }
        let cut = self.cuts.tan_theta_cut;
        if cut > 0.0 && fit.tan_theta_sq() > cut * cut {
            return Err(Rejection::TanTheta);
        }
        let cut = self.cuts.tan_theta_xz_cut;
        if cut > 0.0 && fit.tan_theta_xz_sq() > cut * cut {
            return Err(Rejection::TanThetaXZ);
        }

        let tol = self.cuts.wafer_tolerance;
        for m in candidate.members() {
            let r = &records[m];
            let dz = r.z - z_center;
            let on_wafer = self
                .geometry
                .element(r.wafer)
                .is_some_and(|e| e.in_bounds(fit.x_at(dz), fit.y_at(dz), tol, tol));
            if !on_wafer {
                return Err(Rejection::OutOfBounds);
            }
        }
        Ok(())
    }

    #[inline]
    pub fn accepts_fit(&self, candidate: &FitCandidate, records: &[ClusterRecord], z_center: f64) -> bool {
        self.check_fit(candidate, records, z_center).is_ok()
    }

    /// Reduced χ² cut; minimal candidates have no degrees of freedom and pass.
    pub fn check_quality(&self, candidate: &FitCandidate) -> Result<(), Rejection> {
        match candidate.reduced_chi2() {
            Some(r) if !(r <= self.cuts.reduced_chi2_cut) => Err(Rejection::ReducedChi2),
            _ => Ok(()),
        }
    }

    #[inline]
    pub fn passes_quality(&self, candidate: &FitCandidate) -> bool {
        self.check_quality(candidate).is_ok()
    }
}
