//! Least-squares fit of a 2nd-order polynomial surface to a scalar field.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use montage_core::ScalarField;

use crate::BackgroundError;

/// Number of coefficients of the 2nd-order surface model.
pub const COEFF_COUNT: usize = 6;

/// Coefficients of `f(x, y) = c0 + c1*x + c2*y + c3*x*y + c4*x^2 + c5*y^2`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolyCoeffs(pub [f64; COEFF_COUNT]);

impl PolyCoeffs {
    #[inline]
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        let c = &self.0;
        c[0] + c[1] * x + c[2] * y + c[3] * x * y + c[4] * x * x + c[5] * y * y
    }
}

// Flat pixel index -> (x, y) model coordinates. The first geometry
// dimension is the modulus/divisor, matching row-major storage:
// x walks rows, y walks columns.
#[inline]
fn model_coords(index: usize, width: usize) -> (f64, f64) {
    ((index / width) as f64, (index % width) as f64)
}

/// Fit the surface to `field` in the least-squares sense.
///
/// One design-matrix row per pixel with columns `[1, x, y, xy, x^2, y^2]`.
/// A field containing non-finite cells (uncovered background pixels) is
/// refused: they would silently poison the whole solve.
pub fn fit_surface(field: &ScalarField) -> Result<PolyCoeffs, BackgroundError> {
    let uncovered = field.non_finite_cells();
    if uncovered > 0 {
        return Err(BackgroundError::UncoveredPixels { count: uncovered });
    }

    let n = field.len();
    if n < COEFF_COUNT {
        return Err(BackgroundError::TooFewPixels { count: n });
    }

    let mut a = DMatrix::<f64>::zeros(n, COEFF_COUNT);
    let mut b = DVector::<f64>::zeros(n);
    for i in 0..n {
        let (x, y) = model_coords(i, field.width);
        b[i] = field.data[i];
        a[(i, 0)] = 1.0;
        a[(i, 1)] = x;
        a[(i, 2)] = y;
        a[(i, 3)] = x * y;
        a[(i, 4)] = x * x;
        a[(i, 5)] = y * y;
    }

    let svd = a.svd(true, true);
    let solution = svd
        .solve(&b, 1e-12)
        .map_err(|_| BackgroundError::SolveFailed)?;

    let mut coeffs = [0.0; COEFF_COUNT];
    for (c, v) in coeffs.iter_mut().zip(solution.iter()) {
        *c = *v;
    }
    Ok(PolyCoeffs(coeffs))
}

/// Evaluate the surface at every pixel of a `width` x `height` field.
pub fn surface_values(coeffs: &PolyCoeffs, width: usize, height: usize) -> ScalarField {
    let mut out = ScalarField::zeros(width, height);
    for i in 0..out.len() {
        let (x, y) = model_coords(i, width);
        out.data[i] = coeffs.evaluate(x, y);
    }
    out
}

/// Evaluate the surface and subtract its arithmetic mean.
///
/// The centered surface has zero mean over the full pixel set: it models
/// the *deviation* from uniform illumination, not the absolute level.
pub fn centered_surface(coeffs: &PolyCoeffs, width: usize, height: usize) -> ScalarField {
    let mut surface = surface_values(coeffs, width, height);
    let mean = surface.mean();
    for v in &mut surface.data {
        *v -= mean;
    }
    surface
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn synthetic_field(width: usize, height: usize, coeffs: &PolyCoeffs) -> ScalarField {
        let mut field = ScalarField::zeros(width, height);
        for i in 0..field.len() {
            let (x, y) = model_coords(i, width);
            field.data[i] = coeffs.evaluate(x, y);
        }
        field
    }

    #[test]
    fn round_trip_recovers_known_coefficients() {
        let truth = PolyCoeffs([12.0, 0.4, -0.7, 0.02, -0.005, 0.008]);
        let field = synthetic_field(16, 12, &truth);

        let fitted = fit_surface(&field).expect("fit");
        for (got, want) in fitted.0.iter().zip(truth.0.iter()) {
            assert_relative_eq!(got, want, epsilon = 1e-8);
        }
    }

    #[test]
    fn centered_surface_has_zero_mean() {
        for coeffs in [
            PolyCoeffs([100.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            PolyCoeffs([3.0, 1.5, -2.0, 0.1, 0.04, -0.03]),
        ] {
            let surface = centered_surface(&coeffs, 13, 9);
            assert_relative_eq!(surface.mean(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn refuses_uncovered_cells() {
        let mut field = ScalarField::zeros(4, 4);
        field.data[5] = f64::NAN;
        match fit_surface(&field) {
            Err(BackgroundError::UncoveredPixels { count }) => assert_eq!(count, 1),
            other => panic!("expected UncoveredPixels, got {other:?}"),
        }
    }

    #[test]
    fn refuses_degenerate_geometry() {
        let field = ScalarField::zeros(2, 2);
        assert!(matches!(
            fit_surface(&field),
            Err(BackgroundError::TooFewPixels { count: 4 })
        ));
    }

    #[test]
    fn model_coords_use_first_dimension_as_modulus() {
        // width 5: index 7 -> row 1, column 2
        assert_eq!(model_coords(7, 5), (1.0, 2.0));
        assert_eq!(model_coords(0, 5), (0.0, 0.0));
        assert_eq!(model_coords(4, 5), (0.0, 4.0));
    }
}
