//! Buffer and DSP helpers used by the resampler, exposed for custom interpolation setups.

pub mod buffer;
pub mod dsp;

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
macro_rules! assert_eq_with_epsilon {
    ($x:expr, $y:expr, $d:expr) => {
        let (x, y, d) = ($x, $y, $d);
        if (x - y).abs() > d {
            panic!("assertion failed: |{x} - {y}| <= {d}");
        }
    };
}

#[cfg(test)]
pub(crate) use assert_eq_with_epsilon;
