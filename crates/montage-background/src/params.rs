use serde::{Deserialize, Serialize};

use crate::BackgroundError;

/// Inclusive raw-pixel value range `[low, high]`.
///
/// Pixels outside the range are excluded from averaging and from
/// corrective adjustment. An inverted range (`low > high`) is not an
/// error; it simply matches no pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRange {
    pub low: u8,
    pub high: u8,
}

impl ThresholdRange {
    /// The full byte range: every pixel qualifies.
    pub const FULL: ThresholdRange = ThresholdRange { low: 0, high: 255 };

    pub fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    #[inline]
    pub fn contains(&self, value: u8) -> bool {
        value >= self.low && value <= self.high
    }
}

impl Default for ThresholdRange {
    fn default() -> Self {
        Self::FULL
    }
}

/// How the centered background surface is applied back to source images.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrectionMode {
    /// Estimate only; leave the source images untouched.
    #[default]
    None,
    /// Subtract the surface, clamping the result to `[0, 255]`.
    Subtract,
    /// Divide by the surface. No clamp beyond the saturating cast back to
    /// `u8`; a zero or negative surface value is the caller's problem and
    /// is pinned by test, not silently guarded.
    Divide,
}

impl CorrectionMode {
    /// Adapt the hosting framework's pair of boolean parameters.
    ///
    /// Selecting both subtract and divide is a configuration error.
    pub fn from_flags(subtract: bool, divide: bool) -> Result<Self, BackgroundError> {
        match (subtract, divide) {
            (true, true) => Err(BackgroundError::ConflictingModes),
            (true, false) => Ok(CorrectionMode::Subtract),
            (false, true) => Ok(CorrectionMode::Divide),
            (false, false) => Ok(CorrectionMode::None),
        }
    }
}

/// Parameters of one background-estimation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackgroundParams {
    pub threshold: ThresholdRange,
    pub mode: CorrectionMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_contains_is_inclusive() {
        let range = ThresholdRange::new(10, 20);
        assert!(!range.contains(9));
        assert!(range.contains(10));
        assert!(range.contains(20));
        assert!(!range.contains(21));
    }

    #[test]
    fn inverted_range_matches_nothing() {
        let range = ThresholdRange::new(200, 100);
        assert!(!range.contains(150));
        assert!(!range.contains(200));
        assert!(!range.contains(100));
    }

    #[test]
    fn mode_flags_reject_both() {
        assert_eq!(
            CorrectionMode::from_flags(false, false).unwrap(),
            CorrectionMode::None
        );
        assert_eq!(
            CorrectionMode::from_flags(true, false).unwrap(),
            CorrectionMode::Subtract
        );
        assert_eq!(
            CorrectionMode::from_flags(false, true).unwrap(),
            CorrectionMode::Divide
        );
        let err = CorrectionMode::from_flags(true, true).unwrap_err();
        assert_eq!(err.code(), -76002);
    }

    #[test]
    fn params_serde_round_trip() {
        let params = BackgroundParams {
            threshold: ThresholdRange::new(5, 250),
            mode: CorrectionMode::Subtract,
        };
        let json = serde_json::to_string(&params).unwrap();
        let back: BackgroundParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
