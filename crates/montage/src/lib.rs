//! Facade crate for the `montage-*` workspace.
//!
//! Two independently consumable subsystems:
//! - [`background`]: threshold-gated background estimation over an image
//!   stack with polynomial surface fitting and in-place correction.
//! - [`register`]: FFT-correlation scoring of montage tile overlaps under
//!   a polynomial dewarp model, plus a derivative-free simplex driver.
//!
//! ## Quickstart
//!
//! ```
//! use montage::background::{estimate_background, ThresholdRange};
//! use montage::core::GrayImageView;
//!
//! let frames: Vec<Vec<u8>> = (0..3).map(|i| vec![100 + i as u8; 32 * 24]).collect();
//! let images: Vec<GrayImageView<'_>> = frames
//!     .iter()
//!     .map(|f| GrayImageView::new(32, 24, f).unwrap())
//!     .collect();
//!
//! let estimate = estimate_background(&images, ThresholdRange::FULL).unwrap();
//! // The centered surface models deviation from uniform illumination.
//! assert!(estimate.surface.mean().abs() < 1e-6);
//! ```
//!
//! ## Driving the registration cost
//!
//! The cost function is gradient-free; drive it with the bundled simplex
//! minimizer (or any other derivative-free optimizer). The quantity to
//! *maximize* is the summed correlation peaks, so hand the minimizer the
//! negated residual.
//!
//! ## API map
//! - `montage::core`: image views, scalar fields, logger installation.
//! - `montage::background`: estimator pipeline and correction modes.
//! - `montage::register`: montage model, cost function, dewarp transform,
//!   simplex minimizer.

pub use montage_background as background;
pub use montage_core as core;
pub use montage_register as register;

pub use montage_background::{BackgroundError, CorrectionMode, ThresholdRange};
pub use montage_core::{GrayImageView, GrayImageViewMut, ScalarField};
pub use montage_register::{FftConvolutionCostFunction, GridMontage, MontageTile, TileKey};
