/// Errors reported by the registration cost function.
///
/// `code()` exposes the distinct negative integer the hosting framework
/// expects on its status sink alongside the rendered message.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum RegistrationError {
    #[error("montage grid has no tiles")]
    EmptyMontage,
    #[error("montage of {rows}x{cols} tiles expects {expected} images, got {found}")]
    GridShapeMismatch {
        rows: usize,
        cols: usize,
        expected: usize,
        found: usize,
    },
    #[error("dewarp parameter vector has length {found}, expected {expected}")]
    ParameterCount { expected: usize, found: usize },
    #[error("tile spacing must be positive, got ({x}, {y})")]
    BadSpacing { x: f64, y: f64 },
    #[error("the cost function provides no derivative; drive it with a derivative-free optimizer")]
    DerivativeUnsupported,
}

impl RegistrationError {
    pub fn code(&self) -> i32 {
        match self {
            RegistrationError::EmptyMontage => -66600,
            RegistrationError::GridShapeMismatch { .. } => -66601,
            RegistrationError::ParameterCount { .. } => -66602,
            RegistrationError::BadSpacing { .. } => -66603,
            RegistrationError::DerivativeUnsupported => -66610,
        }
    }
}
