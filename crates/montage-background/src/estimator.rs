//! Threshold-gated aggregation, averaging and in-place correction.
//!
//! The run is a single forward pass: aggregate -> average -> fit ->
//! center -> (optionally) apply. There is no rollback; each stage
//! consumes the previous stage's output.

use log::info;

use montage_core::{GrayImageView, GrayImageViewMut, ScalarField};

use crate::polyfit::{self, PolyCoeffs};
use crate::{BackgroundError, BackgroundParams, CorrectionMode, ThresholdRange};

/// Per-pixel sums and contribution counts over an image stack.
#[derive(Clone, Debug)]
pub struct Accumulated {
    pub sums: ScalarField,
    pub counts: Vec<u32>,
}

/// Averaged background field.
///
/// Cells no source image covered hold a non-finite value (the division by
/// a zero count is deliberate, not an accident to paper over); `uncovered`
/// counts them so callers can reject or tolerate the field explicitly.
#[derive(Clone, Debug)]
pub struct AveragedBackground {
    pub field: ScalarField,
    pub uncovered: usize,
}

/// Result of a full estimation run.
#[derive(Clone, Debug)]
pub struct BackgroundEstimate {
    /// Fitted surface coefficients (uncentered).
    pub coeffs: PolyCoeffs,
    /// Mean-centered surface, the final background image.
    pub surface: ScalarField,
}

/// Sum in-threshold pixel values across the stack and count contributors.
///
/// All images must share one geometry; an empty stack is an error.
pub fn aggregate(
    images: &[GrayImageView<'_>],
    threshold: ThresholdRange,
) -> Result<Accumulated, BackgroundError> {
    let first = images.first().ok_or(BackgroundError::NoImages)?;
    let (width, height) = (first.width, first.height);

    for (index, image) in images.iter().enumerate() {
        if !image.same_geometry(first) {
            return Err(BackgroundError::GeometryMismatch {
                index,
                expected_width: width,
                expected_height: height,
                found_width: image.width,
                found_height: image.height,
            });
        }
    }

    let mut sums = ScalarField::zeros(width, height);
    let mut counts = vec![0u32; sums.len()];
    for image in images {
        for (i, &value) in image.data.iter().enumerate() {
            if threshold.contains(value) {
                sums.data[i] += value as f64;
                counts[i] += 1;
            }
        }
    }

    Ok(Accumulated { sums, counts })
}

/// Divide each accumulated cell by its contribution count.
pub fn average(accumulated: Accumulated) -> AveragedBackground {
    let Accumulated { mut sums, counts } = accumulated;
    let mut uncovered = 0usize;
    for (sum, &count) in sums.data.iter_mut().zip(counts.iter()) {
        if count == 0 {
            uncovered += 1;
        }
        *sum /= count as f64;
    }
    AveragedBackground {
        field: sums,
        uncovered,
    }
}

/// Full estimation pipeline: aggregate, average, fit, center.
pub fn estimate_background(
    images: &[GrayImageView<'_>],
    threshold: ThresholdRange,
) -> Result<BackgroundEstimate, BackgroundError> {
    let averaged = average(aggregate(images, threshold)?);
    let (width, height) = (averaged.field.width, averaged.field.height);

    info!(
        "fitting a polynomial background to a {}x{} stack of {} images; may take a while for large images",
        width,
        height,
        images.len()
    );
    let coeffs = polyfit::fit_surface(&averaged.field)?;
    let surface = polyfit::centered_surface(&coeffs, width, height);

    Ok(BackgroundEstimate { coeffs, surface })
}

/// Apply the centered surface to one image in place.
///
/// Only pixels inside the threshold range are touched. Subtract rounds to
/// nearest and clamps to `[0, 255]`; divide performs the `f64` division
/// unguarded and converts back with Rust's saturating cast (a non-finite
/// quotient saturates, it does not panic).
pub fn apply_correction(
    image: &mut GrayImageViewMut<'_>,
    surface: &ScalarField,
    threshold: ThresholdRange,
    mode: CorrectionMode,
) -> Result<(), BackgroundError> {
    if image.width != surface.width || image.height != surface.height {
        return Err(BackgroundError::GeometryMismatch {
            index: 0,
            expected_width: surface.width,
            expected_height: surface.height,
            found_width: image.width,
            found_height: image.height,
        });
    }

    match mode {
        CorrectionMode::None => {}
        CorrectionMode::Subtract => {
            for (pixel, &level) in image.data.iter_mut().zip(surface.data.iter()) {
                if threshold.contains(*pixel) {
                    *pixel = (*pixel as f64 - level).round().clamp(0.0, 255.0) as u8;
                }
            }
        }
        CorrectionMode::Divide => {
            for (pixel, &level) in image.data.iter_mut().zip(surface.data.iter()) {
                if threshold.contains(*pixel) {
                    *pixel = (*pixel as f64 / level) as u8;
                }
            }
        }
    }

    Ok(())
}

/// One-call filter run: estimate the background from the stack, then
/// apply the selected correction mode to every image in place.
pub fn estimate_and_correct(
    images: &mut [GrayImageViewMut<'_>],
    params: BackgroundParams,
) -> Result<BackgroundEstimate, BackgroundError> {
    let estimate = {
        let views: Vec<GrayImageView<'_>> = images.iter().map(|image| image.as_view()).collect();
        estimate_background(&views, params.threshold)?
    };
    correct_images(images, &estimate.surface, params.threshold, params.mode)?;
    Ok(estimate)
}

/// Apply the correction to a whole stack.
pub fn correct_images(
    images: &mut [GrayImageViewMut<'_>],
    surface: &ScalarField,
    threshold: ThresholdRange,
    mode: CorrectionMode,
) -> Result<(), BackgroundError> {
    for image in images.iter_mut() {
        apply_correction(image, surface, threshold, mode)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn views<'a>(stack: &'a [Vec<u8>], width: usize, height: usize) -> Vec<GrayImageView<'a>> {
        stack
            .iter()
            .map(|data| GrayImageView::new(width, height, data).unwrap())
            .collect()
    }

    #[test]
    fn full_range_average_is_exact_mean() {
        let stack = vec![vec![10u8, 20, 30, 40], vec![30u8, 40, 50, 60], vec![
            50u8, 60, 70, 80,
        ]];
        let images = views(&stack, 2, 2);

        let averaged = average(aggregate(&images, ThresholdRange::FULL).unwrap());
        assert_eq!(averaged.uncovered, 0);
        for (i, want) in [30.0, 40.0, 50.0, 60.0].iter().enumerate() {
            assert_relative_eq!(averaged.field.data[i], want);
        }
    }

    #[test]
    fn narrowing_threshold_never_increases_counts() {
        let stack = vec![vec![10u8, 200, 30, 90], vec![40u8, 220, 50, 110]];
        let images = views(&stack, 2, 2);

        let wide = aggregate(&images, ThresholdRange::FULL).unwrap();
        let narrow = aggregate(&images, ThresholdRange::new(0, 100)).unwrap();
        for (n, w) in narrow.counts.iter().zip(wide.counts.iter()) {
            assert!(n <= w);
        }
    }

    #[test]
    fn zero_count_cell_averages_non_finite() {
        let stack = vec![vec![10u8, 200], vec![20u8, 210]];
        let images = views(&stack, 2, 1);

        // Threshold excludes the second pixel in both images.
        let averaged = average(aggregate(&images, ThresholdRange::new(0, 100)).unwrap());
        assert_eq!(averaged.uncovered, 1);
        assert!(averaged.field.data[0].is_finite());
        assert!(!averaged.field.data[1].is_finite());
    }

    #[test]
    fn empty_stack_is_an_error() {
        let err = aggregate(&[], ThresholdRange::FULL).unwrap_err();
        assert_eq!(err, BackgroundError::NoImages);
        assert_eq!(err.code(), -76000);
    }

    #[test]
    fn mismatched_geometry_is_an_error() {
        let a = vec![0u8; 4];
        let b = vec![0u8; 6];
        let images = vec![
            GrayImageView::new(2, 2, &a).unwrap(),
            GrayImageView::new(3, 2, &b).unwrap(),
        ];
        let err = aggregate(&images, ThresholdRange::FULL).unwrap_err();
        assert!(matches!(err, BackgroundError::GeometryMismatch {
            index: 1,
            ..
        }));
    }

    #[test]
    fn subtract_clamps_both_ends() {
        let mut data = vec![10u8, 200];
        let mut image = GrayImageViewMut::new(2, 1, &mut data).unwrap();
        let surface = ScalarField::from_vec(2, 1, vec![50.0, -100.0]).unwrap();

        apply_correction(
            &mut image,
            &surface,
            ThresholdRange::FULL,
            CorrectionMode::Subtract,
        )
        .unwrap();
        assert_eq!(data, vec![0u8, 255]);
    }

    #[test]
    fn out_of_threshold_pixels_are_untouched() {
        let mut data = vec![10u8, 200];
        let mut image = GrayImageViewMut::new(2, 1, &mut data).unwrap();
        let surface = ScalarField::from_vec(2, 1, vec![5.0, 5.0]).unwrap();

        apply_correction(
            &mut image,
            &surface,
            ThresholdRange::new(0, 100),
            CorrectionMode::Subtract,
        )
        .unwrap();
        assert_eq!(data, vec![5u8, 200]);
    }

    #[test]
    fn divide_by_zero_surface_saturates() {
        // Decided policy: no zero-guard; the f64 quotient saturates on cast.
        let mut data = vec![100u8, 100];
        let mut image = GrayImageViewMut::new(2, 1, &mut data).unwrap();
        let surface = ScalarField::from_vec(2, 1, vec![0.0, 2.0]).unwrap();

        apply_correction(
            &mut image,
            &surface,
            ThresholdRange::FULL,
            CorrectionMode::Divide,
        )
        .unwrap();
        assert_eq!(data, vec![255u8, 50]);
    }

    #[test]
    fn estimate_and_correct_runs_the_whole_filter() {
        let mut stack = vec![vec![90u8; 8 * 8], vec![110u8; 8 * 8]];
        let (first, rest) = stack.split_at_mut(1);
        let mut images = vec![
            GrayImageViewMut::new(8, 8, &mut first[0]).unwrap(),
            GrayImageViewMut::new(8, 8, &mut rest[0]).unwrap(),
        ];

        let params = BackgroundParams {
            threshold: ThresholdRange::FULL,
            mode: CorrectionMode::Subtract,
        };
        let estimate = estimate_and_correct(&mut images, params).unwrap();

        // Flat stack: nothing to subtract, both images keep their levels.
        assert_relative_eq!(estimate.surface.mean(), 0.0, epsilon = 1e-9);
        assert!(stack[0].iter().all(|&v| v == 90));
        assert!(stack[1].iter().all(|&v| v == 110));
    }

    #[test]
    fn estimate_recovers_flat_background() {
        // Uniform images: the centered surface must be ~0 everywhere.
        let stack = vec![vec![80u8; 20 * 15]; 4];
        let images = views(&stack, 20, 15);

        let estimate = estimate_background(&images, ThresholdRange::FULL).unwrap();
        assert_relative_eq!(estimate.surface.mean(), 0.0, epsilon = 1e-9);
        for v in &estimate.surface.data {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-6);
        }
    }
}
