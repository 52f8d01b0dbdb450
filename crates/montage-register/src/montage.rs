//! Input model for a rectangular grid of tiles and the materialized
//! per-tile images the cost function works on.

use serde::{Deserialize, Serialize};

use montage_core::GrayImageView;

use crate::dewarp::PixelIndex;
use crate::RegistrationError;

/// Grid position of a tile, `(col, row)` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileKey {
    pub col: usize,
    pub row: usize,
}

impl TileKey {
    pub fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }

    /// Key of the right neighbor.
    pub fn right(&self) -> TileKey {
        TileKey::new(self.col + 1, self.row)
    }

    /// Key of the bottom neighbor.
    pub fn below(&self) -> TileKey {
        TileKey::new(self.col, self.row + 1)
    }
}

/// One tile of the input montage: placement plus a borrowed pixel view.
///
/// `origin` and `spacing` are in physical units; dividing origin by
/// spacing moves the tile into the integer index space the registration
/// runs in (as if the montage had unit spacing).
#[derive(Clone, Copy, Debug)]
pub struct MontageTile<'a> {
    pub origin: [f64; 2],
    pub spacing: [f64; 2],
    pub image: GrayImageView<'a>,
}

impl MontageTile<'_> {
    /// Tile origin in index space.
    pub fn index_origin(&self) -> [i64; 2] {
        [
            (self.origin[0] / self.spacing[0]) as i64,
            (self.origin[1] / self.spacing[1]) as i64,
        ]
    }
}

/// A rectangular grid of tiles, row-major.
#[derive(Clone, Debug)]
pub struct GridMontage<'a> {
    rows: usize,
    cols: usize,
    tiles: Vec<MontageTile<'a>>,
}

impl<'a> GridMontage<'a> {
    pub fn new(
        rows: usize,
        cols: usize,
        tiles: Vec<MontageTile<'a>>,
    ) -> Result<Self, RegistrationError> {
        if rows == 0 || cols == 0 {
            return Err(RegistrationError::EmptyMontage);
        }
        if tiles.len() != rows * cols {
            return Err(RegistrationError::GridShapeMismatch {
                rows,
                cols,
                expected: rows * cols,
                found: tiles.len(),
            });
        }
        for tile in &tiles {
            if tile.spacing[0] <= 0.0 || tile.spacing[1] <= 0.0 {
                return Err(RegistrationError::BadSpacing {
                    x: tile.spacing[0],
                    y: tile.spacing[1],
                });
            }
        }
        Ok(Self { rows, cols, tiles })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn tile(&self, row: usize, col: usize) -> Option<&MontageTile<'a>> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(&self.tiles[row * self.cols + col])
    }

    #[inline]
    pub(crate) fn tile_at(&self, row: usize, col: usize) -> &MontageTile<'a> {
        &self.tiles[row * self.cols + col]
    }
}

/// An owned tile image in the shared index frame.
///
/// Materialized once per registration run from the borrowed montage data;
/// also used for the transient warped/cropped overlap images.
#[derive(Clone, Debug, PartialEq)]
pub struct TileImage {
    pub origin: [i64; 2],
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl TileImage {
    /// Zero-filled image with the given placement.
    pub fn new(origin: [i64; 2], width: usize, height: usize) -> Self {
        Self {
            origin,
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    #[inline]
    fn offset(&self, index: PixelIndex) -> Option<usize> {
        let x = index[0] - self.origin[0];
        let y = index[1] - self.origin[1];
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// Whether the montage-frame index falls inside this image.
    #[inline]
    pub fn contains(&self, index: PixelIndex) -> bool {
        self.offset(index).is_some()
    }

    /// Pixel at a montage-frame index, or `None` outside the image.
    #[inline]
    pub fn get(&self, index: PixelIndex) -> Option<f64> {
        self.offset(index).map(|o| self.data[o])
    }

    /// Store a pixel at a montage-frame index; out-of-image writes are a
    /// caller bug.
    #[inline]
    pub fn set(&mut self, index: PixelIndex, value: f64) {
        if let Some(o) = self.offset(index) {
            self.data[o] = value;
        } else {
            debug_assert!(false, "write outside tile image at {index:?}");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Sum of squared pixel values.
    pub fn energy(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum()
    }
}
