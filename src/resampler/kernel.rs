//! Windowed-sinc low-pass kernels for the sinc interpolation engine.

use crate::utils::dsp::window::{blackman_harris, sinc};

// -------------------------------------------------------------------------------------------------

/// Cutoff scaling applied when downsampling, so the transition band ends below the output's
/// Nyquist frequency.
const DOWNSAMPLING_CUTOFF_MARGIN: f64 = 1.03;

// -------------------------------------------------------------------------------------------------

/// Normalized cutoff (relative to the input's Nyquist frequency) a sinc kernel needs for the
/// given `rate_in / rate_out` ratio.
pub fn sinc_cutoff(ratio: f64) -> f64 {
    if ratio > 1.0 {
        1.0 / (ratio * DOWNSAMPLING_CUTOFF_MARGIN)
    } else {
        1.0
    }
}

// -------------------------------------------------------------------------------------------------

/// Design an oversampled, Blackman-Harris windowed sinc low-pass prototype.
///
/// The prototype spans `size` input frames with `oversize` coefficients per frame, so it holds
/// `size * oversize + 1` coefficients where coefficient `k` sits at tap offset
/// `k / oversize - size / 2`. It is an even order design and symmetric around its center tap.
/// Coefficients are normalized to unity DC gain per input frame.
pub fn design_lowpass(size: usize, oversize: usize, cutoff: f64) -> Vec<f64> {
    debug_assert!(size > 0 && oversize > 0, "Invalid kernel size");
    debug_assert!(cutoff > 0.0 && cutoff <= 1.0, "Invalid kernel cutoff");

    let len = size * oversize + 1;
    let half_width = size as f64 / 2.0;
    let mut prototype = Vec::with_capacity(len);
    for k in 0..len {
        let t = k as f64 / oversize as f64 - half_width;
        prototype.push(cutoff * sinc(cutoff * t) * blackman_harris(t, size as f64));
    }

    // the last coefficient duplicates the first phase, so leave it out of the gain sum
    let power: f64 = prototype[..len - 1].iter().sum();
    if power > 0.0 {
        let scale = oversize as f64 / power;
        for value in prototype.iter_mut() {
            *value *= scale;
        }
    }
    prototype
}

// -------------------------------------------------------------------------------------------------

/// A low-pass kernel table, rearranged into `oversize + 1` rows of `size` taps for fast
/// per-phase convolution.
///
/// Row `r` holds the taps at sub-frame phase `r / oversize`. A fractional input position `f`
/// is rendered by blending the two rows around `(1 - f) * oversize`.
#[derive(Debug, Clone)]
pub struct SincKernel {
    size: usize,
    oversize: usize,
    cutoff: f64,
    coefficients: Vec<f32>,
}

impl SincKernel {
    pub const DEFAULT_SIZE: usize = 64;
    pub const DEFAULT_INTERPOLATION_SIZE: usize = 32;

    pub const MIN_SIZE: usize = 4;
    pub const MAX_SIZE: usize = 1536;
    pub const MAX_INTERPOLATION_SIZE: usize = 4096;

    /// Build a new kernel table for the given resampling ratio.
    pub fn new(size: usize, oversize: usize, ratio: f64) -> Self {
        debug_assert!(size >= Self::MIN_SIZE && size % 2 == 0, "Invalid kernel size");
        let cutoff = sinc_cutoff(ratio);
        let prototype = design_lowpass(size, oversize, cutoff);

        let mut coefficients = vec![0.0_f32; (oversize + 1) * size];
        for (row_index, row) in coefficients.chunks_exact_mut(size).enumerate() {
            for (tap, coefficient) in row.iter_mut().enumerate() {
                *coefficient = prototype[tap * oversize + row_index] as f32;
            }
        }
        Self {
            size,
            oversize,
            cutoff,
            coefficients,
        }
    }

    /// Number of taps (input frames) a single output frame depends on.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of phase rows per input frame.
    pub fn oversize(&self) -> usize {
        self.oversize
    }

    /// Normalized cutoff of the kernel, relative to the input's Nyquist frequency.
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// True when the kernel is the full band response, which doesn't depend on the ratio.
    pub fn is_ideal(&self) -> bool {
        self.cutoff >= 1.0
    }

    /// Test if this kernel can be reused for the given parameters. Ideal kernels are reused for
    /// all ratios which need an ideal kernel.
    pub fn matches(&self, size: usize, oversize: usize, ratio: f64) -> bool {
        if self.size != size || self.oversize != oversize {
            return false;
        }
        let cutoff = sinc_cutoff(ratio);
        if self.is_ideal() {
            cutoff >= 1.0
        } else {
            self.cutoff == cutoff
        }
    }

    /// Frame offset of the interpolation center from the first tap.
    pub fn center_offset(&self) -> usize {
        self.size / 2 - 1
    }

    /// Access a single phase row.
    #[inline]
    pub fn row(&self, index: usize) -> &[f32] {
        &self.coefficients[index * self.size..(index + 1) * self.size]
    }

    /// Rows and blend weight for the given fractional position in range `[0, 1)`:
    /// returns `(row_a, row_b, weight_b)`, where the result is `a * (1 - weight_b) + b * weight_b`.
    #[inline]
    pub fn rows(&self, fraction: f64) -> (&[f32], &[f32], f64) {
        debug_assert!((0.0..1.0).contains(&fraction), "Invalid fraction");
        let phase = fraction * self.oversize as f64;
        let index = (phase as usize).min(self.oversize - 1);
        let weight = phase - index as f64;
        let row_a = self.oversize - index;
        (self.row(row_a), self.row(row_a - 1), weight)
    }
}

// -------------------------------------------------------------------------------------------------
