use serde::{Deserialize, Serialize};

/// Geometry mismatch between a pixel buffer and its declared dimensions.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("buffer of {len} pixels does not match {width}x{height}")]
pub struct GeometryError {
    pub width: usize,
    pub height: usize,
    pub len: usize,
}

/// Borrowed grayscale image over caller-owned storage.
///
/// The backing slice is row-major with `len = width * height`. The montage
/// crates never allocate or free source pixel storage; the hosting
/// application keeps ownership and hands out views.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

impl<'a> GrayImageView<'a> {
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, GeometryError> {
        if data.len() != width * height {
            return Err(GeometryError {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pixel at `(x, y)`, or `None` outside the image.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }

    /// Whether two views share width and height.
    #[inline]
    pub fn same_geometry(&self, other: &GrayImageView<'_>) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// Mutable counterpart of [`GrayImageView`] for in-place correction.
#[derive(Debug)]
pub struct GrayImageViewMut<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a mut [u8],
}

impl<'a> GrayImageViewMut<'a> {
    pub fn new(width: usize, height: usize, data: &'a mut [u8]) -> Result<Self, GeometryError> {
        if data.len() != width * height {
            return Err(GeometryError {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Immutable view of the same pixels.
    pub fn as_view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: self.data,
        }
    }
}

/// Owned double-valued field, row-major, same indexing as the image views.
///
/// Used for accumulated backgrounds and fitted surfaces where `u8`
/// precision is not enough.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalarField {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl ScalarField {
    /// Zero-filled field of the given geometry.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<f64>) -> Result<Self, GeometryError> {
        if data.len() != width * height {
            return Err(GeometryError {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arithmetic mean over all cells. NaN cells poison the mean, which is
    /// the intended propagation for uncovered pixels.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Count of non-finite cells.
    pub fn non_finite_cells(&self) -> usize {
        self.data.iter().filter(|v| !v.is_finite()).count()
    }
}
