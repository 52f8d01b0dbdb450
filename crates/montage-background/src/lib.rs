//! Background estimation for stacks of same-geometry grayscale images.
//!
//! Given N images and an inclusive threshold range, the estimator averages
//! in-threshold pixel values per position, fits a 2nd-order polynomial
//! surface to the averaged field by least squares, centers the surface to
//! zero mean, and can subtract or divide it back out of the source images
//! in place.
//!
//! ## Quickstart
//!
//! ```
//! use montage_background::{estimate_background, ThresholdRange};
//! use montage_core::GrayImageView;
//!
//! let pixels = vec![128u8; 64 * 48];
//! let images = vec![GrayImageView::new(64, 48, &pixels).unwrap()];
//!
//! let estimate = estimate_background(&images, ThresholdRange::FULL).unwrap();
//! assert_eq!(estimate.surface.width, 64);
//! ```

mod error;
mod estimator;
mod params;
mod polyfit;

pub use error::BackgroundError;
pub use estimator::{
    aggregate, apply_correction, average, correct_images, estimate_and_correct,
    estimate_background, Accumulated, AveragedBackground, BackgroundEstimate,
};
pub use params::{BackgroundParams, CorrectionMode, ThresholdRange};
pub use polyfit::{centered_surface, fit_surface, surface_values, PolyCoeffs, COEFF_COUNT};
