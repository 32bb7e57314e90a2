//! Weighted linear least-squares fit of a straight line to stereo strip
//! measurements.
//!
//! A strip with unit normal `(sinα, cosα)` at `dz` from the reference plane
//! measures
//!
//! ```text
//! u = (x0 + tx·dz)·sinα + (y0 + ty·dz)·cosα
//! ```
//!
//! so each measurement contributes the design row
//! `a = (sinα, cosα, sinα·dz, cosα·dz)` for parameters `(x0, y0, tx, ty)`.
//! The fitter keeps the 15 independent entries of the symmetric 5×5 matrix
//! `S = Σ [a, u]ᵀ[a, u] / σ²`; its top-left 4×4 block and last column are the
//! normal equations, and `[p, -1]ᵀ·S·[p, -1]` is the χ² at `p`.

use nalgebra::{Matrix4, Matrix5, Vector4, Vector5};

/// Pivots smaller than this fraction of the largest pivot are treated as zero.
const RELATIVE_PIVOT_TOLERANCE: f64 = 1e-12;

const N_SUMS: usize = 15;

/// Packed index of the upper-triangular entry (row <= col) of a 5×5 matrix.
#[inline]
const fn packed(row: usize, col: usize) -> usize {
    row * 5 - row * (row.saturating_sub(1)) / 2 + (col - row)
}

/// Running weighted sums over the measurements of one candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FitSums {
    sums: [f64; N_SUMS],
}

impl FitSums {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate one measurement. O(1).
    pub fn add(&mut self, sin_alpha: f64, cos_alpha: f64, dz: f64, u: f64, sigma_sq: f64) {
        let w = 1.0 / sigma_sq;
        let a = [sin_alpha, cos_alpha, sin_alpha * dz, cos_alpha * dz, u];
        for row in 0..5 {
            for col in row..5 {
                self.sums[packed(row, col)] += a[row] * a[col] * w;
            }
        }
    }

    /// Symmetric 5×5 matrix `S`.
    pub fn matrix(&self) -> Matrix5<f64> {
        Matrix5::from_fn(|r, c| {
            let (lo, hi) = if r <= c { (r, c) } else { (c, r) };
            self.sums[packed(lo, hi)]
        })
    }

    pub fn as_array(&self) -> &[f64; N_SUMS] {
        &self.sums
    }
}

/// Solution of the normal equations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineFit {
    /// (x0, y0, dx/dz, dy/dz) at the reference z.
    pub params: Vector4<f64>,
    pub covariance: Matrix4<f64>,
    pub chi2: f64,
    /// False when the normal matrix is numerically singular; `params` are
    /// then zero and must not be used.
    pub has_covariance: bool,
}

impl LineFit {
    pub fn solve(sums: &FitSums) -> Self {
        let s = sums.matrix();
        let s4: Matrix4<f64> = s.fixed_view::<4, 4>(0, 0).into_owned();
        let v: Vector4<f64> = s.fixed_view::<4, 1>(0, 4).into_owned();

        let lu = s4.full_piv_lu();
        let u = lu.u();
        let max_pivot = u[(0, 0)].abs();
        let full_rank = max_pivot.is_finite()
            && max_pivot > 0.0
            && (0..4).all(|i| u[(i, i)].abs() > max_pivot * RELATIVE_PIVOT_TOLERANCE);

        if !full_rank {
            return Self::singular();
        }

        let (params, covariance) = match (lu.solve(&v), lu.try_inverse()) {
            (Some(p), Some(c)) if p.iter().all(|x| x.is_finite()) => (p, c),
            _ => return Self::singular(),
        };

        let ext = Vector5::new(params[0], params[1], params[2], params[3], -1.0);
        let chi2 = (ext.transpose() * s * ext)[(0, 0)].max(0.0);

        Self { params, covariance, chi2, has_covariance: true }
    }

    fn singular() -> Self {
        Self {
            params: Vector4::zeros(),
            covariance: Matrix4::zeros(),
            chi2: f64::INFINITY,
            has_covariance: false,
        }
    }

    #[inline]
    pub fn x_at(&self, dz: f64) -> f64 {
        self.params[0] + self.params[2] * dz
    }

    #[inline]
    pub fn y_at(&self, dz: f64) -> f64 {
        self.params[1] + self.params[3] * dz
    }

    /// tan²θ of the line with respect to the z axis.
    #[inline]
    pub fn tan_theta_sq(&self) -> f64 {
        self.params[2] * self.params[2] + self.params[3] * self.params[3]
    }

    /// tan²θ projected on the x-z plane.
    #[inline]
    pub fn tan_theta_xz_sq(&self) -> f64 {
        self.params[2] * self.params[2]
    }
}
