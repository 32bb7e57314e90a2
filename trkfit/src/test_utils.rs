//! Synthetic stations for unit tests.

use rand::rngs::StdRng;
use rand::Rng;
use trkcore::data::cluster::RawCluster;
use trkcore::geometry::layout::{TrackerLayout, ETA_VALUES, LAYERS_PER_STATION, PHI_ROWS, SIDES};
use trkcore::geometry::wafer::{TrackerGeometry, WaferAddress};

use crate::segment::record::ClusterRecord;

pub const SIGMA: f64 = 0.023;

pub fn layout() -> TrackerLayout {
    TrackerLayout::default()
}

/// Straight line relative to the station centre: x = x0 + tx·dz, y = y0 + ty·dz.
#[derive(Clone, Copy, Debug)]
pub struct Line {
    pub x0: f64,
    pub y0: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Line {
    pub fn new(x0: f64, y0: f64, tx: f64, ty: f64) -> Self {
        Self { x0, y0, tx, ty }
    }
}

/// A cluster at a local position on the given wafer.
pub fn cluster_at(layout: &TrackerLayout, address: &WaferAddress, local: [f64; 2], id: u64) -> RawCluster {
    let wafer = layout.wafer_id(address).expect("address in layout");
    let element = layout.element(wafer).expect("element in layout");
    let strip = element.strip_at(local[0]).unwrap_or(0);
    RawCluster {
        id,
        wafer,
        global_position: element.local_to_global(local),
        local_position: local,
        local_covariance: [[SIGMA * SIGMA, 0.0], [0.0, 36.0 * 36.0]],
        strips: vec![strip],
    }
}

/// Noise-free clusters on every wafer of `station` the line crosses.
pub fn line_clusters(layout: &TrackerLayout, station: u8, line: &Line, first_id: u64) -> Vec<RawCluster> {
    let zc = layout.station_center_z(station).expect("station in layout");
    let mut out = Vec::new();
    for (_, address, element) in layout.station_wafers(station) {
        let dz = element.z() - zc;
        let x = line.x0 + line.tx * dz;
        let y = line.y0 + line.ty * dz;
        if !element.in_bounds(x, y, 0.0, 0.0) {
            continue;
        }
        let local = element.global_to_local(x, y);
        out.push(cluster_at(layout, address, local, first_id + out.len() as u64));
    }
    out
}

/// Uniformly scattered clusters over a station.
pub fn noise_clusters(
    layout: &TrackerLayout,
    station: u8,
    n: usize,
    rng: &mut StdRng,
    first_id: u64,
) -> Vec<RawCluster> {
    let half_width = 0.5 * layout.config.n_strips as f64 * layout.config.pitch;
    let half_length = layout.config.strip_half_length;
    (0..n)
        .map(|i| {
            let address = WaferAddress {
                station,
                layer: rng.gen_range(0..LAYERS_PER_STATION),
                eta: ETA_VALUES[rng.gen_range(0..ETA_VALUES.len())],
                phi: rng.gen_range(0..PHI_ROWS),
                side: rng.gen_range(0..SIDES),
            };
            let local = [
                rng.gen_range(-half_width..half_width),
                rng.gen_range(-half_length..half_length),
            ];
            cluster_at(layout, &address, local, first_id + i as u64)
        })
        .collect()
}

/// Records for a set of clusters of one station, in input order.
pub fn records(layout: &TrackerLayout, clusters: &[RawCluster]) -> Vec<ClusterRecord> {
    clusters
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let address = layout.address(c.wafer).expect("known wafer");
            ClusterRecord::build(i, c, &address, layout.element(c.wafer), 32)
        })
        .collect()
}
