//! A parameterised multi-station strip tracker.
//!
//! Each station has three layers; each layer is tiled by eight modules
//! (two columns in x selected by `eta`, four rows in y selected by `phi`),
//! and each module carries two wafers (sides) whose strips are rotated by
//! opposite stereo angles. Wafer ids are dense, so lookups are plain
//! vector indexing.

use itertools::iproduct;
use serde::{Deserialize, Serialize};

use crate::geometry::wafer::{stereo_signs, TrackerGeometry, WaferAddress, WaferElement, WaferId};

pub const LAYERS_PER_STATION: u8 = 3;
pub const PHI_ROWS: u8 = 4;
pub const ETA_VALUES: [i8; 2] = [-1, 1];
pub const SIDES: u8 = 2;

/// Station numbers are `u8`; a layout never holds more stations than this.
pub const MAX_STATIONS: usize = u8::MAX as usize + 1;

const WAFERS_PER_STATION: usize =
    LAYERS_PER_STATION as usize * ETA_VALUES.len() * PHI_ROWS as usize * SIDES as usize;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Central z of each station (mm). Entries past [`MAX_STATIONS`] are
    /// ignored.
    pub station_z: Vec<f64>,
    /// Distance between consecutive layers of a station (mm).
    pub layer_spacing: f64,
    /// z distance between the two sides of a module (mm).
    pub side_gap: f64,
    /// Stereo half-angle between the two sides (rad).
    pub stereo_angle: f64,
    pub pitch: f64,
    pub n_strips: u32,
    /// Half of the strip length (mm).
    pub strip_half_length: f64,
    /// Overlap in x between the two module columns (mm).
    pub eta_overlap: f64,
    /// Distance in y between module row centres (mm).
    pub row_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            station_z: vec![-1000.0, 0.0, 1000.0, 2000.0],
            layer_spacing: 50.0,
            side_gap: 2.0,
            stereo_angle: 0.02,
            pitch: 0.08,
            n_strips: 768,
            strip_half_length: 63.0,
            eta_overlap: 2.0,
            row_spacing: 60.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TrackerLayout {
    pub config: LayoutConfig,
    addresses: Vec<WaferAddress>,
    elements: Vec<WaferElement>,
    station_center: Vec<f64>,
}

impl TrackerLayout {
    pub fn new(config: LayoutConfig) -> Self {
        let stations: Vec<u8> = (0..=u8::MAX).take(config.station_z.len()).collect();
        let n_stations = stations.len();
        let mut addresses = Vec::with_capacity(n_stations * WAFERS_PER_STATION);
        let mut elements = Vec::with_capacity(n_stations * WAFERS_PER_STATION);

        let sin_stereo = config.stereo_angle.sin();
        let column_offset = config.strip_half_length - 0.5 * config.eta_overlap;

        for (station, layer, eta, phi, side) in iproduct!(
            stations.iter().copied(),
            0..LAYERS_PER_STATION,
            ETA_VALUES,
            0..PHI_ROWS,
            0..SIDES
        ) {
            let address = WaferAddress { station, layer, eta, phi, side };
            let (sign_sin, _) = stereo_signs(address.module_index());
            let side_sign = if side > 0 { -1.0 } else { 1.0 };

            let z = config.station_z[station as usize]
                + (layer as f64 - 1.0) * config.layer_spacing
                + (side as f64 - 0.5) * config.side_gap;
            let center = [
                eta as f64 * column_offset,
                (phi as f64 - 0.5 * (PHI_ROWS as f64 - 1.0)) * config.row_spacing,
                z,
            ];

            addresses.push(address);
            elements.push(WaferElement::new(
                center,
                sign_sin * side_sign * sin_stereo,
                sin_stereo,
                config.pitch,
                config.n_strips,
                config.strip_half_length,
            ));
        }

        let station_center = (0..n_stations)
            .map(|s| {
                let slice = &elements[s * WAFERS_PER_STATION..(s + 1) * WAFERS_PER_STATION];
                slice.iter().map(|e| e.z()).sum::<f64>() / slice.len() as f64
            })
            .collect();

        Self { config, addresses, elements, station_center }
    }

    pub fn wafer_id(&self, address: &WaferAddress) -> Option<WaferId> {
        if address.station as usize >= self.station_center.len()
            || address.layer >= LAYERS_PER_STATION
            || address.phi >= PHI_ROWS
            || address.side >= SIDES
            || !ETA_VALUES.contains(&address.eta)
        {
            return None;
        }
        let eta_bit = u32::from(address.eta > 0);
        let id = (((address.station as u32 * LAYERS_PER_STATION as u32 + address.layer as u32) * 2
            + eta_bit)
            * PHI_ROWS as u32
            + address.phi as u32)
            * SIDES as u32
            + address.side as u32;
        Some(WaferId(id))
    }

    /// All wafers of one station, in id order.
    pub fn station_wafers(
        &self,
        station: u8,
    ) -> impl Iterator<Item = (WaferId, &WaferAddress, &WaferElement)> + '_ {
        let start = (station as usize * WAFERS_PER_STATION).min(self.elements.len());
        let end = (start + WAFERS_PER_STATION).min(self.elements.len());
        (start..end).map(move |i| (WaferId(i as u32), &self.addresses[i], &self.elements[i]))
    }
}

impl Default for TrackerLayout {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl TrackerGeometry for TrackerLayout {
    fn address(&self, wafer: WaferId) -> Option<WaferAddress> {
        self.addresses.get(wafer.0 as usize).copied()
    }

    fn element(&self, wafer: WaferId) -> Option<&WaferElement> {
        self.elements.get(wafer.0 as usize)
    }

    fn station_center_z(&self, station: u8) -> Option<f64> {
        self.station_center.get(station as usize).copied()
    }

    fn station_count(&self) -> usize {
        self.station_center.len()
    }
}
