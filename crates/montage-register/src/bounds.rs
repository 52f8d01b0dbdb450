//! Rectangular region bounds and the nearest-edge shrink heuristic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dewarp::PixelIndex;
use crate::montage::{TileImage, TileKey};

/// Half-open rectangle `[left, right) x [top, bottom)` in the shared
/// index frame.
///
/// Describes both a tile's nominal footprint and the valid
/// (non-extrapolated) portion of a warped image, which shrinks as invalid
/// pixels are discovered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub top: i64,
    pub bottom: i64,
    pub left: i64,
    pub right: i64,
}

impl RegionBounds {
    pub fn from_origin_size(origin: [i64; 2], width: usize, height: usize) -> Self {
        Self {
            top: origin[1],
            bottom: origin[1] + height as i64,
            left: origin[0],
            right: origin[0] + width as i64,
        }
    }

    pub fn of_image(image: &TileImage) -> Self {
        Self::from_origin_size(image.origin, image.width, image.height)
    }

    #[inline]
    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    #[inline]
    pub fn contains(&self, index: PixelIndex) -> bool {
        index[0] >= self.left && index[0] < self.right && index[1] >= self.top && index[1] < self.bottom
    }

    /// Shrink toward the edge nearest to an invalid pixel.
    ///
    /// The pixel's distance to each edge of `footprint` picks the bound to
    /// tighten; ties resolve in the fixed order top, bottom, left, right.
    /// A heuristic, not an exact visibility computation; the order is part
    /// of the contract for reproducibility.
    pub fn tighten(&mut self, invalid: PixelIndex, footprint: &RegionBounds) {
        let dist_top = invalid[1] - footprint.top;
        let dist_bottom = footprint.bottom - invalid[1];
        let dist_left = invalid[0] - footprint.left;
        let dist_right = footprint.right - invalid[0];

        if dist_top <= dist_bottom && dist_top <= dist_left && dist_top <= dist_right {
            self.top = self.top.max(invalid[1]);
        } else if dist_bottom <= dist_top && dist_bottom <= dist_left && dist_bottom <= dist_right {
            self.bottom = self.bottom.min(invalid[1]);
        } else if dist_left <= dist_top && dist_left <= dist_bottom && dist_left <= dist_right {
            self.left = self.left.max(invalid[0]);
        } else {
            self.right = self.right.min(invalid[0]);
        }
    }
}

/// Per-tile footprint bounds, keyed and iterated deterministically.
pub type CropMap = BTreeMap<TileKey, RegionBounds>;

/// Build the crop map from the materialized tile images.
pub fn build_crop_map<'a, I>(tiles: I) -> CropMap
where
    I: IntoIterator<Item = (&'a TileKey, &'a TileImage)>,
{
    tiles
        .into_iter()
        .map(|(key, image)| (*key, RegionBounds::of_image(image)))
        .collect()
}
