//! Polynomial dewarp transform mapping "new" pixel positions back to
//! "old" positions in a source tile.
//!
//! The transform operates in center-relative coordinates `u = x - cx`,
//! `v = y - cy` with seven terms per axis:
//!
//! ```text
//! old_x = cx + ax·[u, v, u², v², uv, u²v, uv²]
//! old_y = cy + ay·[u, v, u², v², uv, u²v, uv²]
//! ```
//!
//! Fourteen parameters total, x-axis coefficients first. The identity
//! vector is exact: `ax = [1,0,...]`, `ay = [0,1,0,...]`.

use crate::RegistrationError;

/// Integer pixel position `[x, y]` in the shared montage frame.
pub type PixelIndex = [i64; 2];

/// Polynomial terms per axis.
pub const PARAMS_PER_AXIS: usize = 7;

/// Total length of a dewarp parameter vector.
pub const fn required_parameter_count() -> usize {
    2 * PARAMS_PER_AXIS
}

/// The parameter vector that maps every index to itself.
pub fn identity_parameters() -> Vec<f64> {
    let mut params = vec![0.0; required_parameter_count()];
    params[0] = 1.0; // old_x = u
    params[PARAMS_PER_AXIS + 1] = 1.0; // old_y = v
    params
}

/// Split a parameter vector into per-axis coefficient slices, validating
/// its length.
pub fn split_parameters(parameters: &[f64]) -> Result<(&[f64], &[f64]), RegistrationError> {
    if parameters.len() != required_parameter_count() {
        return Err(RegistrationError::ParameterCount {
            expected: required_parameter_count(),
            found: parameters.len(),
        });
    }
    Ok(parameters.split_at(PARAMS_PER_AXIS))
}

/// A dewarp transform bound to a warp center.
#[derive(Clone, Copy, Debug)]
pub struct DewarpTransform<'a> {
    x_coeffs: &'a [f64],
    y_coeffs: &'a [f64],
    center: [f64; 2],
}

impl<'a> DewarpTransform<'a> {
    /// Build from a full parameter vector, validating its length.
    pub fn new(parameters: &'a [f64], center: [f64; 2]) -> Result<Self, RegistrationError> {
        let (x_coeffs, y_coeffs) = split_parameters(parameters)?;
        Ok(Self::from_axes(x_coeffs, y_coeffs, center))
    }

    /// Build from pre-split per-axis coefficients (length already checked).
    pub fn from_axes(x_coeffs: &'a [f64], y_coeffs: &'a [f64], center: [f64; 2]) -> Self {
        debug_assert_eq!(x_coeffs.len(), PARAMS_PER_AXIS);
        debug_assert_eq!(y_coeffs.len(), PARAMS_PER_AXIS);
        Self {
            x_coeffs,
            y_coeffs,
            center,
        }
    }

    /// Map a new-frame index to the old position it samples from.
    #[inline]
    pub fn old_index(&self, new: PixelIndex) -> PixelIndex {
        let u = new[0] as f64 - self.center[0];
        let v = new[1] as f64 - self.center[1];
        let terms = [u, v, u * u, v * v, u * v, u * u * v, u * v * v];

        let mut dx = 0.0;
        let mut dy = 0.0;
        for (i, t) in terms.iter().enumerate() {
            dx += self.x_coeffs[i] * t;
            dy += self.y_coeffs[i] * t;
        }

        [
            (self.center[0] + dx).round() as i64,
            (self.center[1] + dy).round() as i64,
        ]
    }
}
