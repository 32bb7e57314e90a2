use tracing::warn;
use trkcore::data::cluster::RawCluster;
use trkcore::geometry::wafer::{module_index, stereo_signs, WaferAddress, WaferElement, WaferId};

/// Tabulated view of one strip cluster within a station.
///
/// Built once per station pass and never mutated. `index` is the bit
/// position of the cluster in every [`ClusterSet`](trkcore::data::cluster_set::ClusterSet)
/// of that pass.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterRecord {
    pub index: usize,
    pub cluster_id: u64,
    pub wafer: WaferId,
    pub layer: u8,
    pub eta: i8,
    pub phi: u8,
    pub module_index: u8,
    pub side: u8,
    pub sin_alpha: f64,
    pub cos_alpha: f64,
    /// Position along the strip normal.
    pub u: f64,
    pub z: f64,
    pub sigma_sq: f64,
    /// -1, +1, or 0 for a cluster that cannot take part in any fit.
    pub view: i8,
    pub edge: bool,
    pub y_center: f64,
    /// y of the strip end nearest the module column boundary.
    pub y_end: f64,
    pub pitch: f64,
    pub local_position: [f64; 2],
    pub local_covariance: [[f64; 2]; 2],
}

#[inline]
pub fn view_of(sin_alpha: f64, cos_alpha: f64) -> i8 {
    let p = sin_alpha * cos_alpha;
    if p > 0.0 {
        1
    } else if p < 0.0 {
        -1
    } else {
        0
    }
}

impl ClusterRecord {
    /// Tabulate a cluster. Without a detector element the record is inert
    /// (`view == 0`) and no geometry query is made.
    pub fn build(
        index: usize,
        cluster: &RawCluster,
        address: &WaferAddress,
        element: Option<&WaferElement>,
        edge_strips: u32,
    ) -> Self {
        let [x, y, z] = cluster.global_position;
        let mut record = Self {
            index,
            cluster_id: cluster.id,
            wafer: cluster.wafer,
            layer: address.layer,
            eta: address.eta,
            phi: address.phi,
            module_index: module_index(address.eta, address.phi),
            side: address.side,
            sin_alpha: 0.0,
            cos_alpha: 0.0,
            u: 0.0,
            z,
            sigma_sq: cluster.u_variance(),
            view: 0,
            edge: false,
            y_center: y,
            y_end: y,
            pitch: 0.0,
            local_position: cluster.local_position,
            local_covariance: cluster.local_covariance,
        };

        let Some(element) = element else {
            warn!(cluster = cluster.id, wafer = cluster.wafer.0, "cluster without detector element");
            return record;
        };

        let (sign_sin, sign_cos) = stereo_signs(record.module_index);
        let sin_stereo = element.sin_stereo();
        let mut sin_alpha = sign_sin * sin_stereo;
        let cos_alpha = sign_cos * (1.0 - sin_stereo * sin_stereo).max(0.0).sqrt();
        if address.side > 0 {
            sin_alpha = -sin_alpha;
        }

        record.sin_alpha = sin_alpha;
        record.cos_alpha = cos_alpha;
        record.u = x * sin_alpha + y * cos_alpha;
        record.view = view_of(sin_alpha, cos_alpha);
        record.pitch = element.phi_pitch();

        if !(record.sigma_sq.is_finite() && record.sigma_sq > 0.0) {
            warn!(cluster = cluster.id, sigma_sq = record.sigma_sq, "bad cluster variance, using pitch");
            record.sigma_sq = record.pitch * record.pitch / 12.0;
        }

        let strip_max = element.strip_max();
        record.edge = cluster
            .strips
            .iter()
            .any(|&s| s < edge_strips || s > strip_max.saturating_sub(edge_strips));

        let (a, b) = element.ends_of_strip(cluster.local_position);
        record.y_end = if a[0].abs() <= b[0].abs() { a[1] } else { b[1] };

        record
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.view != 0
    }
}
