use serde::{Deserialize, Serialize};

/// Dense hash of one wafer (one side of one module).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaferId(pub u32);

/// Decoded identifier fields of a wafer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaferAddress {
    pub station: u8,
    /// 0..3 within the station
    pub layer: u8,
    /// module row, -1 or +1
    pub eta: i8,
    /// module column, 0..4
    pub phi: u8,
    /// sensor face, 0 or 1
    pub side: u8,
}

impl WaferAddress {
    #[inline]
    pub fn module_index(&self) -> u8 {
        module_index(self.eta, self.phi)
    }
}

/// Eight-way module label combining column and row parity.
#[inline]
pub fn module_index(eta: i8, phi: u8) -> u8 {
    2 * phi + u8::from(eta > 0)
}

/// Signs applied to (sin, cos) of the reported stereo angle for a module,
/// before the side flip.
#[inline]
pub fn stereo_signs(module_index: u8) -> (f64, f64) {
    match module_index {
        0 | 2 => (-1.0, 1.0),
        1 | 3 => (-1.0, 1.0),
        4 | 6 => (1.0, 1.0),
        5 | 7 => (1.0, 1.0),
        _ => (1.0, 1.0),
    }
}

/// Detector element of one wafer.
///
/// The local frame has its measurement axis along the strip normal
/// `(sin_alpha, cos_alpha)` and its strip axis along `(cos_alpha, -sin_alpha)`,
/// both in the global (x, y) plane. The wafer is a rectangle of
/// `n_strips * pitch` across the strips and `2 * half_length` along them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaferElement {
    pub center: [f64; 3],
    pub sin_alpha: f64,
    pub cos_alpha: f64,
    /// Stereo sine in the element's own sign convention.
    pub sin_stereo: f64,
    pub pitch: f64,
    pub n_strips: u32,
    pub half_length: f64,
}

impl WaferElement {
    pub fn new(
        center: [f64; 3],
        sin_alpha: f64,
        sin_stereo: f64,
        pitch: f64,
        n_strips: u32,
        half_length: f64,
    ) -> Self {
        Self {
            center,
            sin_alpha,
            cos_alpha: (1.0 - sin_alpha * sin_alpha).max(0.0).sqrt(),
            sin_stereo,
            pitch,
            n_strips,
            half_length,
        }
    }

    #[inline]
    pub fn sin_stereo(&self) -> f64 {
        self.sin_stereo
    }

    #[inline]
    pub fn phi_pitch(&self) -> f64 {
        self.pitch
    }

    #[inline]
    pub fn strip_max(&self) -> u32 {
        self.n_strips.saturating_sub(1)
    }

    #[inline]
    pub fn z(&self) -> f64 {
        self.center[2]
    }

    #[inline]
    pub fn half_width(&self) -> f64 {
        0.5 * self.n_strips as f64 * self.pitch
    }

    pub fn local_to_global(&self, local: [f64; 2]) -> [f64; 3] {
        let [lx, ly] = local;
        [
            self.center[0] + lx * self.sin_alpha + ly * self.cos_alpha,
            self.center[1] + lx * self.cos_alpha - ly * self.sin_alpha,
            self.center[2],
        ]
    }

    pub fn global_to_local(&self, x: f64, y: f64) -> [f64; 2] {
        let dx = x - self.center[0];
        let dy = y - self.center[1];
        [
            dx * self.sin_alpha + dy * self.cos_alpha,
            dx * self.cos_alpha - dy * self.sin_alpha,
        ]
    }

    /// Global end points of the strip through `local`.
    pub fn ends_of_strip(&self, local: [f64; 2]) -> ([f64; 3], [f64; 3]) {
        (
            self.local_to_global([local[0], -self.half_length]),
            self.local_to_global([local[0], self.half_length]),
        )
    }

    /// Local measurement coordinate of a strip centre.
    pub fn strip_position(&self, strip: u32) -> f64 {
        (strip as f64 + 0.5) * self.pitch - self.half_width()
    }

    /// Strip under a local measurement coordinate, if on the wafer.
    pub fn strip_at(&self, local_x: f64) -> Option<u32> {
        let s = ((local_x + self.half_width()) / self.pitch).floor();
        if s.is_finite() && s >= 0.0 && s < self.n_strips as f64 {
            Some(s as u32)
        } else {
            None
        }
    }

    /// Whether global (x, y) lies on the wafer, widened by the tolerances
    /// across (`tol_measure`) and along (`tol_strip`) the strips.
    pub fn in_bounds(&self, x: f64, y: f64, tol_measure: f64, tol_strip: f64) -> bool {
        let [lx, ly] = self.global_to_local(x, y);
        lx.abs() <= self.half_width() + tol_measure && ly.abs() <= self.half_length + tol_strip
    }
}

/// Geometry and identifier lookups consumed by the segment finder.
///
/// Implementations are shared read-only between concurrent events.
pub trait TrackerGeometry: Sync {
    fn address(&self, wafer: WaferId) -> Option<WaferAddress>;

    fn element(&self, wafer: WaferId) -> Option<&WaferElement>;

    /// Mean z of all detector elements of the station.
    fn station_center_z(&self, station: u8) -> Option<f64>;

    fn station_count(&self) -> usize;
}
