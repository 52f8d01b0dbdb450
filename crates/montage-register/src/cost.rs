//! The FFT-convolution cost function over a tile montage.
//!
//! `initialize` materializes the per-tile images and derives the overlap
//! pairs once; `value` is then called repeatedly by an external
//! derivative-free optimizer with candidate dewarp parameter vectors.

use std::collections::BTreeMap;

use log::{debug, warn};
use rayon::prelude::*;

use crate::bounds::build_crop_map;
use crate::dewarp::{self, DewarpTransform};
use crate::fft::correlation_peak;
use crate::montage::{GridMontage, TileImage, TileKey};
use crate::overlap::{create_overlap_pairs, crop_to_bounds, generate_overlap_image, OverlapPair};
use crate::RegistrationError;

/// Alignment-quality cost function for a rectangular tile montage.
///
/// `value` returns the square of the summed per-overlap correlation
/// maxima. The sum grows with alignment quality, so a driver minimizing
/// toward better alignment negates the summed peaks; the squared form is
/// what the hosting registration pipeline consumes.
#[derive(Debug)]
pub struct FftConvolutionCostFunction {
    image_grid: BTreeMap<TileKey, TileImage>,
    overlaps: Vec<OverlapPair>,
    image_dim: [f64; 2],
}

impl FftConvolutionCostFunction {
    /// Materialize the montage and derive its overlap pairs.
    ///
    /// Tile materialization is embarrassingly parallel; per-cell results
    /// are collected into a deterministic keyed map rather than written
    /// through a shared lock.
    pub fn initialize(montage: &GridMontage<'_>) -> Result<Self, RegistrationError> {
        let image_dim = calculate_image_dim(montage);

        let cells: Vec<(usize, usize)> = (0..montage.rows())
            .flat_map(|row| (0..montage.cols()).map(move |col| (row, col)))
            .collect();
        let image_grid: BTreeMap<TileKey, TileImage> = cells
            .par_iter()
            .map(|&(row, col)| materialize_tile(montage, row, col, image_dim))
            .collect();

        let crop_map = build_crop_map(image_grid.iter());
        let overlaps = create_overlap_pairs(&crop_map);
        debug!(
            "initialized {} tiles, {} overlap pairs, nominal tile {}x{}",
            image_grid.len(),
            overlaps.len(),
            image_dim[0],
            image_dim[1]
        );

        Ok(Self {
            image_grid,
            overlaps,
            image_dim,
        })
    }

    /// Evaluate the cost of one dewarp parameter vector.
    ///
    /// Overlap pairs are scored concurrently; the per-pair maxima are
    /// reduced in pair order so the result is reproducible regardless of
    /// scheduling.
    pub fn value(&self, parameters: &[f64]) -> Result<f64, RegistrationError> {
        let (x_coeffs, y_coeffs) = dewarp::split_parameters(parameters)?;

        let maxima: Vec<f64> = self
            .overlaps
            .par_iter()
            .map(|overlap| self.score_overlap(overlap, x_coeffs, y_coeffs))
            .collect();
        let residual: f64 = maxima.iter().sum();

        Ok(residual * residual)
    }

    /// Derivatives are not provided; the cost function is gradient-free
    /// by contract.
    pub fn derivative(&self, _parameters: &[f64]) -> Result<Vec<f64>, RegistrationError> {
        Err(RegistrationError::DerivativeUnsupported)
    }

    /// Length of the parameter vector `value` expects.
    pub fn parameter_count(&self) -> usize {
        dewarp::required_parameter_count()
    }

    pub fn image_grid(&self) -> &BTreeMap<TileKey, TileImage> {
        &self.image_grid
    }

    pub fn overlaps(&self) -> &[OverlapPair] {
        &self.overlaps
    }

    /// Nominal tile dimensions the montage was materialized against.
    pub fn image_dim(&self) -> [f64; 2] {
        self.image_dim
    }

    fn score_overlap(&self, overlap: &OverlapPair, x_coeffs: &[f64], y_coeffs: &[f64]) -> f64 {
        let region = overlap.region;
        if region.is_empty() {
            warn!(
                "tiles {:?}/{:?} are adjacent but share no pixels",
                overlap.first, overlap.second
            );
            return 0.0;
        }
        let center = [
            region.left as f64 + (self.image_dim[0] - 1.0) / 2.0,
            region.top as f64 + (self.image_dim[1] - 1.0) / 2.0,
        ];
        let transform = DewarpTransform::from_axes(x_coeffs, y_coeffs, center);

        let first = &self.image_grid[&overlap.first];
        let second = &self.image_grid[&overlap.second];

        // Both warps tighten the same bounds; the crop keeps only pixels
        // backed by real source data in both images.
        let mut bounds = region;
        let warped_first = generate_overlap_image(first, &region, &transform, &mut bounds);
        let warped_second = generate_overlap_image(second, &region, &transform, &mut bounds);

        if bounds.is_empty() {
            warn!(
                "overlap {:?}/{:?} shrank to nothing under the current parameters",
                overlap.first, overlap.second
            );
            return 0.0;
        }

        let cropped_first = crop_to_bounds(&warped_first, &bounds);
        let cropped_second = crop_to_bounds(&warped_second, &bounds);
        correlation_peak(&cropped_first, &cropped_second)
    }
}

/// Nominal tile dimensions, probed from an interior tile when the grid is
/// wider/taller than two tiles (edge tiles may be clipped), else from the
/// corner tile.
fn calculate_image_dim(montage: &GridMontage<'_>) -> [f64; 2] {
    let x_probe = if montage.cols() > 2 { 1 } else { 0 };
    let y_probe = if montage.rows() > 2 { 1 } else { 0 };
    [
        montage.tile_at(0, x_probe).image.width as f64,
        montage.tile_at(y_probe, 0).image.height as f64,
    ]
}

/// Materialize one grid cell as an owned image in the shared index frame.
///
/// The image covers at most the nominal footprint. Asymmetric edge rule:
/// in a grid of more than two columns, the column-0 tile keeps only its
/// trailing `tile_width` pixel columns (its leading columns carry no
/// overlap); same for row 0 and rows.
fn materialize_tile(
    montage: &GridMontage<'_>,
    row: usize,
    col: usize,
    image_dim: [f64; 2],
) -> (TileKey, TileImage) {
    let tile = montage.tile_at(row, col);
    let geom_width = tile.image.width;
    let geom_height = tile.image.height;
    let [mut x_origin, mut y_origin] = tile.index_origin();

    let tile_width = geom_width.min(image_dim[0].floor() as usize);
    let tile_height = geom_height.min(image_dim[1].floor() as usize);

    let mut offset_x = 0usize;
    let mut offset_y = 0usize;
    if row == 0 && montage.rows() > 2 {
        offset_y = geom_height - tile_height;
        y_origin += offset_y as i64;
    }
    if col == 0 && montage.cols() > 2 {
        offset_x = geom_width - tile_width;
        x_origin += offset_x as i64;
    }

    let mut image = TileImage::new([x_origin, y_origin], tile_width, tile_height);
    for y in 0..tile_height {
        for x in 0..tile_width {
            let value = tile.image.data[(y + offset_y) * geom_width + (x + offset_x)] as f64;
            image.set([x_origin + x as i64, y_origin + y as i64], value);
        }
    }

    (TileKey::new(col, row), image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dewarp::identity_parameters;
    use crate::montage::MontageTile;
    use approx::assert_relative_eq;
    use montage_core::GrayImageView;

    // 2x2 montage of `size`x`size` tiles stepped by `step` (< size), so
    // neighbors share `size - step` pixels. All four tiles sample the
    // same global pattern, so overlapping content matches exactly.
    fn montage_tiles(size: usize, step: usize) -> Vec<(f64, f64, Vec<u8>)> {
        let pattern = |x: usize, y: usize| ((3 * x + 7 * y) % 251) as u8;
        let mut tiles = Vec::new();
        for row in 0..2usize {
            for col in 0..2usize {
                let ox = col * step;
                let oy = row * step;
                let mut data = Vec::with_capacity(size * size);
                for y in 0..size {
                    for x in 0..size {
                        data.push(pattern(ox + x, oy + y));
                    }
                }
                tiles.push((ox as f64, oy as f64, data));
            }
        }
        tiles
    }

    fn build_montage(storage: &[(f64, f64, Vec<u8>)], size: usize) -> GridMontage<'_> {
        let tiles = storage
            .iter()
            .map(|(ox, oy, data)| MontageTile {
                origin: [*ox, *oy],
                spacing: [1.0, 1.0],
                image: GrayImageView::new(size, size, data).unwrap(),
            })
            .collect();
        GridMontage::new(2, 2, tiles).unwrap()
    }

    #[test]
    fn initialize_builds_grid_and_pairs() {
        let storage = montage_tiles(8, 6);
        let montage = build_montage(&storage, 8);

        let cost = FftConvolutionCostFunction::initialize(&montage).unwrap();
        assert_eq!(cost.image_grid().len(), 4);
        assert_eq!(cost.overlaps().len(), 4);
        assert_eq!(cost.image_dim(), [8.0, 8.0]);

        // 2x2 grid: no edge clipping, every tile keeps its full footprint.
        let top_left = &cost.image_grid()[&TileKey::new(0, 0)];
        assert_eq!(top_left.origin, [0, 0]);
        assert_eq!((top_left.width, top_left.height), (8, 8));
        let bottom_right = &cost.image_grid()[&TileKey::new(1, 1)];
        assert_eq!(bottom_right.origin, [6, 6]);
    }

    #[test]
    fn identity_cost_is_squared_sum_of_overlap_energies() {
        let storage = montage_tiles(8, 6);
        let montage = build_montage(&storage, 8);
        let cost = FftConvolutionCostFunction::initialize(&montage).unwrap();

        // With identity dewarp the two warped images of each pair are
        // identical, so each pair peaks at its overlap energy.
        let mut expected_residual = 0.0;
        for overlap in cost.overlaps() {
            let first = &cost.image_grid()[&overlap.first];
            let region = overlap.region;
            let mut energy = 0.0;
            for y in region.top..region.bottom {
                for x in region.left..region.right {
                    let v = first.get([x, y]).unwrap();
                    energy += v * v;
                }
            }
            expected_residual += energy;
        }

        let value = cost.value(&identity_parameters()).unwrap();
        assert_relative_eq!(
            value,
            expected_residual * expected_residual,
            epsilon = 1e-6 * expected_residual * expected_residual
        );
    }

    #[test]
    fn warped_parameters_never_beat_identity_here() {
        let storage = montage_tiles(8, 6);
        let montage = build_montage(&storage, 8);
        let cost = FftConvolutionCostFunction::initialize(&montage).unwrap();

        let aligned = cost.value(&identity_parameters()).unwrap();

        let mut stretched = identity_parameters();
        stretched[0] = 1.3;
        let warped = cost.value(&stretched).unwrap();
        assert!(warped <= aligned);
    }

    #[test]
    fn derivative_is_always_unsupported() {
        let storage = montage_tiles(8, 6);
        let montage = build_montage(&storage, 8);
        let cost = FftConvolutionCostFunction::initialize(&montage).unwrap();

        assert_eq!(
            cost.derivative(&identity_parameters()).unwrap_err(),
            RegistrationError::DerivativeUnsupported
        );
    }

    #[test]
    fn wrong_parameter_length_is_rejected() {
        let storage = montage_tiles(8, 6);
        let montage = build_montage(&storage, 8);
        let cost = FftConvolutionCostFunction::initialize(&montage).unwrap();

        assert_eq!(cost.parameter_count(), 14);
        assert!(matches!(
            cost.value(&[0.0; 3]),
            Err(RegistrationError::ParameterCount { found: 3, .. })
        ));
    }

    #[test]
    fn edge_tiles_clip_to_nominal_footprint_in_wide_grids() {
        // 3 columns, 1 row: nominal width probes the interior tile (6);
        // the column-0 tile is wider (8) and keeps its trailing 6 columns.
        let pattern = |x: usize| (x % 97) as u8;
        let first: Vec<u8> = (0..8u8).flat_map(|_| (0..8).map(|x| pattern(x))).collect();
        let middle: Vec<u8> = (0..8u8).flat_map(|_| (6..12).map(|x| pattern(x))).collect();
        let last: Vec<u8> = (0..8u8).flat_map(|_| (10..16).map(|x| pattern(x))).collect();

        let tiles = vec![
            MontageTile {
                origin: [0.0, 0.0],
                spacing: [1.0, 1.0],
                image: GrayImageView::new(8, 8, &first).unwrap(),
            },
            MontageTile {
                origin: [6.0, 0.0],
                spacing: [1.0, 1.0],
                image: GrayImageView::new(6, 8, &middle).unwrap(),
            },
            MontageTile {
                origin: [10.0, 0.0],
                spacing: [1.0, 1.0],
                image: GrayImageView::new(6, 8, &last).unwrap(),
            },
        ];
        let montage = GridMontage::new(1, 3, tiles).unwrap();
        let cost = FftConvolutionCostFunction::initialize(&montage).unwrap();

        let edge = &cost.image_grid()[&TileKey::new(0, 0)];
        assert_eq!((edge.width, edge.height), (6, 8));
        // Trailing columns: origin shifted right by the clipped amount.
        assert_eq!(edge.origin, [2, 0]);
        assert_eq!(edge.get([2, 0]), Some(pattern(2) as f64));
        assert_eq!(edge.get([7, 0]), Some(pattern(7) as f64));
    }
}
