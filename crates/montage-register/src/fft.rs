//! FFT-based correlation scoring of a warped overlap pair.
//!
//! Both images are zero-padded to a power-of-two frame large enough for
//! the full linear correlation, transformed with a row-column 2-D FFT,
//! multiplied spectrum-by-conjugate-spectrum, and transformed back. The
//! peak of the resulting surface is the pair's alignment score: identical
//! aligned images peak at their energy (the zero-lag term).

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::montage::TileImage;

struct Plans {
    nx: usize,
    ny: usize,
    row: Arc<dyn Fft<f64>>,
    col: Arc<dyn Fft<f64>>,
    row_inv: Arc<dyn Fft<f64>>,
    col_inv: Arc<dyn Fft<f64>>,
}

impl Plans {
    fn for_pair(a: &TileImage, b: &TileImage) -> Self {
        // Linear correlation support, rounded up to powers of two.
        let nx = (a.width + b.width - 1).next_power_of_two();
        let ny = (a.height + b.height - 1).next_power_of_two();
        let mut planner = FftPlanner::new();
        Self {
            nx,
            ny,
            row: planner.plan_fft_forward(nx),
            col: planner.plan_fft_forward(ny),
            row_inv: planner.plan_fft_inverse(nx),
            col_inv: planner.plan_fft_inverse(ny),
        }
    }

    /// In-place 2-D FFT by rows, then columns through a scratch buffer.
    fn transform(&self, data: &mut [Complex<f64>], inverse: bool) {
        let (row, col) = if inverse {
            (&self.row_inv, &self.col_inv)
        } else {
            (&self.row, &self.col)
        };

        for y in 0..self.ny {
            row.process(&mut data[y * self.nx..(y + 1) * self.nx]);
        }

        let mut scratch = vec![Complex::default(); self.ny];
        for x in 0..self.nx {
            for y in 0..self.ny {
                scratch[y] = data[y * self.nx + x];
            }
            col.process(&mut scratch);
            for y in 0..self.ny {
                data[y * self.nx + x] = scratch[y];
            }
        }
    }

    fn embed(&self, image: &TileImage) -> Vec<Complex<f64>> {
        let mut padded = vec![Complex::default(); self.nx * self.ny];
        for y in 0..image.height {
            for x in 0..image.width {
                padded[y * self.nx + x] = Complex::new(image.data[y * image.width + x], 0.0);
            }
        }
        padded
    }
}

/// Maximum of the FFT correlation surface of two images.
///
/// Returns 0 for an empty operand (nothing left to score after bounds
/// shrinkage).
pub(crate) fn correlation_peak(a: &TileImage, b: &TileImage) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let plans = Plans::for_pair(a, b);
    let mut fa = plans.embed(a);
    let mut fb = plans.embed(b);
    plans.transform(&mut fa, false);
    plans.transform(&mut fb, false);

    for (va, vb) in fa.iter_mut().zip(fb.iter()) {
        *va *= vb.conj();
    }
    plans.transform(&mut fa, true);

    // rustfft leaves the round trip scaled by the transform length.
    let scale = 1.0 / (plans.nx * plans.ny) as f64;
    fa.iter()
        .map(|v| v.re * scale)
        .fold(f64::MIN, |max, v| if v > max { v } else { max })
}
