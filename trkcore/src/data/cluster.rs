use serde::{Deserialize, Serialize};

use crate::geometry::wafer::WaferId;

/// A reconstructed strip cluster as delivered by the cluster source.
///
/// Only the (0,0) entry of the local covariance (the variance across the
/// strips) is used by the fitters; the full matrix is carried through to
/// the emitted track states.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawCluster {
    /// Identifier of the cluster in the source collection.
    pub id: u64,
    /// Owning wafer (one side of one module).
    pub wafer: WaferId,
    /// Global (x, y, z) position in mm.
    pub global_position: [f64; 3],
    /// Local position on the wafer: measurement axis, strip axis.
    pub local_position: [f64; 2],
    pub local_covariance: [[f64; 2]; 2],
    /// Strip numbers contributing to the cluster.
    #[serde(default)]
    pub strips: Vec<u32>,
}

impl RawCluster {
    #[inline]
    pub fn u_variance(&self) -> f64 {
        self.local_covariance[0][0]
    }
}
