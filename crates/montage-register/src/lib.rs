//! FFT-correlation registration of a rectangular montage of image tiles.
//!
//! Given a grid of overlapping tiles, [`FftConvolutionCostFunction`]
//! materializes each tile into a shared index frame, derives the
//! overlap region of every horizontally and vertically adjacent pair,
//! and scores a candidate dewarp parameter vector by warping each pair
//! into its overlap, cropping to the valid common footprint and taking
//! the peak of their FFT correlation. The summed peaks, squared, form a
//! scalar a derivative-free optimizer can drive.
//!
//! ## Quickstart
//!
//! ```
//! use montage_core::GrayImageView;
//! use montage_register::{
//!     identity_parameters, FftConvolutionCostFunction, GridMontage, MontageTile,
//! };
//!
//! // Two 4x4 tiles side by side, one pixel of overlap.
//! let left = vec![100u8; 16];
//! let right = vec![100u8; 16];
//! let tiles = vec![
//!     MontageTile {
//!         origin: [0.0, 0.0],
//!         spacing: [1.0, 1.0],
//!         image: GrayImageView::new(4, 4, &left).unwrap(),
//!     },
//!     MontageTile {
//!         origin: [3.0, 0.0],
//!         spacing: [1.0, 1.0],
//!         image: GrayImageView::new(4, 4, &right).unwrap(),
//!     },
//! ];
//! let montage = GridMontage::new(1, 2, tiles).unwrap();
//!
//! let cost = FftConvolutionCostFunction::initialize(&montage).unwrap();
//! let value = cost.value(&identity_parameters()).unwrap();
//! assert!(value > 0.0);
//! ```

mod amoeba;
mod bounds;
mod cost;
mod dewarp;
mod error;
mod fft;
mod montage;
mod overlap;

pub use amoeba::{minimize, AmoebaParams, AmoebaResult};
pub use bounds::{build_crop_map, CropMap, RegionBounds};
pub use cost::FftConvolutionCostFunction;
pub use dewarp::{
    identity_parameters, required_parameter_count, split_parameters, DewarpTransform, PixelIndex,
    PARAMS_PER_AXIS,
};
pub use error::RegistrationError;
pub use montage::{GridMontage, MontageTile, TileImage, TileKey};
pub use overlap::{create_overlap_pairs, OverlapPair};
