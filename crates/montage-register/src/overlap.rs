//! Overlap-pair derivation and warped overlap-image generation.

use serde::{Deserialize, Serialize};

use crate::bounds::{CropMap, RegionBounds};
use crate::dewarp::DewarpTransform;
use crate::montage::{TileImage, TileKey};

/// Two adjacent tiles and the rectangle their content shares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapPair {
    pub first: TileKey,
    pub second: TileKey,
    pub region: RegionBounds,
}

/// Derive the overlap pair for every right- and bottom-neighbor adjacency
/// present in the crop map.
pub fn create_overlap_pairs(crop_map: &CropMap) -> Vec<OverlapPair> {
    let mut overlaps = Vec::new();

    for (&key, bounds) in crop_map {
        let right_key = key.right();
        if let Some(right_bounds) = crop_map.get(&right_key) {
            overlaps.push(OverlapPair {
                first: key,
                second: right_key,
                region: right_overlap_region(bounds, right_bounds),
            });
        }

        let below_key = key.below();
        if let Some(below_bounds) = crop_map.get(&below_key) {
            overlaps.push(OverlapPair {
                first: key,
                second: below_key,
                region: bottom_overlap_region(bounds, below_bounds),
            });
        }
    }

    overlaps
}

/// Overlap of a tile with its right neighbor: intersect in Y, span from
/// the right tile's left edge to the left tile's right edge.
fn right_overlap_region(left: &RegionBounds, right: &RegionBounds) -> RegionBounds {
    RegionBounds {
        top: left.top.max(right.top),
        bottom: left.bottom.min(right.bottom),
        left: right.left,
        right: left.right,
    }
}

/// Overlap of a tile with its bottom neighbor: the X/Y-swapped rule.
fn bottom_overlap_region(top: &RegionBounds, bottom: &RegionBounds) -> RegionBounds {
    RegionBounds {
        top: bottom.top,
        bottom: top.bottom,
        left: top.left.max(bottom.left),
        right: top.right.min(bottom.right),
    }
}

/// Warp a base tile into the overlap region.
///
/// Every new-frame pixel of `region` samples the base image at the
/// position the dewarp transform maps it back to. Pixels that land
/// outside the base image become zero and tighten `bounds` via the
/// nearest-edge heuristic, so both images of a pair end up sharing one
/// shrunk valid rectangle.
pub(crate) fn generate_overlap_image(
    base: &TileImage,
    region: &RegionBounds,
    transform: &DewarpTransform<'_>,
    bounds: &mut RegionBounds,
) -> TileImage {
    let mut out = TileImage::new(
        [region.left, region.top],
        region.width() as usize,
        region.height() as usize,
    );

    for y in region.top..region.bottom {
        for x in region.left..region.right {
            let new_index = [x, y];
            let value = match base.get(transform.old_index(new_index)) {
                Some(v) => v,
                None => {
                    bounds.tighten(new_index, region);
                    0.0
                }
            };
            out.set(new_index, value);
        }
    }

    out
}

/// Copy of `image` restricted to `bounds`.
pub(crate) fn crop_to_bounds(image: &TileImage, bounds: &RegionBounds) -> TileImage {
    let mut out = TileImage::new(
        [bounds.left, bounds.top],
        bounds.width() as usize,
        bounds.height() as usize,
    );
    for y in bounds.top..bounds.bottom {
        for x in bounds.left..bounds.right {
            if let Some(v) = image.get([x, y]) {
                out.set([x, y], v);
            }
        }
    }
    out
}
