/// Errors reported by the background estimator.
///
/// `code()` exposes the distinct negative integer the hosting framework
/// expects on its status sink alongside the rendered message.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundError {
    #[error("no source images were provided")]
    NoImages,
    #[error("source image {index} is {found_width}x{found_height}, expected {expected_width}x{expected_height}")]
    GeometryMismatch {
        index: usize,
        expected_width: usize,
        expected_height: usize,
        found_width: usize,
        found_height: usize,
    },
    #[error("cannot select both subtract and divide; choose one or neither")]
    ConflictingModes,
    #[error("background field has {count} cells no source image covered; widen the threshold range")]
    UncoveredPixels { count: usize },
    #[error("{count} pixels are too few to fit a 6-coefficient surface")]
    TooFewPixels { count: usize },
    #[error("least-squares solve failed")]
    SolveFailed,
}

impl BackgroundError {
    pub fn code(&self) -> i32 {
        match self {
            BackgroundError::NoImages => -76000,
            BackgroundError::GeometryMismatch { .. } => -76001,
            BackgroundError::ConflictingModes => -76002,
            BackgroundError::UncoveredPixels { .. } => -76003,
            BackgroundError::TooFewPixels { .. } => -76004,
            BackgroundError::SolveFailed => -76005,
        }
    }
}
