//! Window and sinc functions for windowed-sinc FIR designs.

use std::f64::consts::PI;

// -------------------------------------------------------------------------------------------------

/// Normalized sinc function: `sin(pi * x) / (pi * x)`, with `sinc(0) == 1`.
///
/// Evaluated on `|x|`, so `sinc(x) == sinc(-x)` holds bit-exact.
#[inline]
pub fn sinc(x: f64) -> f64 {
    let x = x.abs();
    if x < 1e-12 {
        1.0
    } else {
        let pos = PI * x;
        pos.sin() / pos
    }
}

// -------------------------------------------------------------------------------------------------

/// 4-term Blackman-Harris window (~92 dB stopband attenuation), centered at `t == 0` and
/// spanning `width` taps. Returns 0 outside of `-width/2..=width/2`.
///
/// Like [`sinc`], this is evaluated on `|t|` and thus exactly symmetric.
#[inline]
pub fn blackman_harris(t: f64, width: f64) -> f64 {
    debug_assert!(width > 0.0, "Invalid window width");
    let t = t.abs();
    if t > width / 2.0 {
        return 0.0;
    }
    let x = 2.0 * PI * t / width;
    0.35875 + 0.48829 * x.cos() + 0.14128 * (2.0 * x).cos() + 0.01168 * (3.0 * x).cos()
}

// -------------------------------------------------------------------------------------------------
