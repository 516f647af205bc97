use std::f64;

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Low-pass coefficients of a [BiquadFilter].
///
/// The cutoff is normalized to the Nyquist frequency of the signal the filter runs on, so
/// `0.5` means a quarter of the sample rate. This way coefficients can directly be derived
/// from a resampling ratio without knowing the actual sample rates.
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadFilterCoefficients {
    cutoff: f64,
    q: f64,
    a1: f64,
    a2: f64,
    a3: f64,
}

impl Default for BiquadFilterCoefficients {
    fn default() -> Self {
        let mut coefficients = Self {
            cutoff: Self::DEFAULT_CUTOFF,
            q: Self::DEFAULT_Q,
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
        };
        coefficients.apply();
        coefficients
    }
}

impl BiquadFilterCoefficients {
    pub const DEFAULT_CUTOFF: f64 = 0.693;
    pub const DEFAULT_Q: f64 = 0.707;

    /// Cutoff changes smaller than this are ignored in [`Self::set`].
    pub const CUTOFF_EPSILON: f64 = 0.000001;

    pub fn new(cutoff: f64, q: f64) -> Result<Self, Error> {
        let mut coefficients = Self::default();
        coefficients.set(cutoff, q)?;
        Ok(coefficients)
    }

    /// The normalized cutoff frequency in range `(0, 1)`.
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// The steepness of the filter.
    pub fn q(&self) -> f64 {
        self.q
    }

    /// Sets and applies new filter parameters. Returns true when the coefficients changed.
    pub fn set(&mut self, cutoff: f64, q: f64) -> Result<bool, Error> {
        if !(cutoff > 0.0 && cutoff < 1.0) {
            return Err(Error::ConfigurationError(format!(
                "Invalid filter cutoff: must be in range (0, 1), but is {cutoff}"
            )));
        }
        if !(q > 0.0 && q.is_finite()) {
            return Err(Error::ConfigurationError(format!(
                "Invalid filter Q: must be > 0, but is {q}"
            )));
        }
        if (self.cutoff - cutoff).abs() >= Self::CUTOFF_EPSILON || self.q != q {
            self.cutoff = cutoff;
            self.q = q;
            self.apply();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn apply(&mut self) {
        let g = f64::tan(f64::consts::FRAC_PI_2 * self.cutoff);
        let k = 1.0 / self.q;
        self.a1 = 1.0 / (1.0 + g * (g + k));
        self.a2 = g * self.a1;
        self.a3 = g * self.a2;
    }
}

// -------------------------------------------------------------------------------------------------

/// State variable biquad low-pass filter, designed by Andrew Simper of Cytomic.
/// See <http://cytomic.com/files/dsp/SvfLinearTrapOptimised2.pdf>
///
/// The frequency response of this filter is the same as of BZT filters.
///
/// This is a second-order filter. It has a cutoff slope of 12 dB/octave. Q = 0.707 means no
/// resonant peaking.
///
/// This filter is stable when modulated at high rates, so the cutoff can follow live ratio
/// changes without clicks.
#[derive(Debug, Default, Clone)]
pub struct BiquadFilter {
    ic1eq: f64,
    ic2eq: f64,
}

impl BiquadFilter {
    pub fn new() -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
        }
    }

    /// Process all samples of a single channel in an interleaved buffer.
    #[inline]
    pub fn process_channel(
        &mut self,
        coefficients: &BiquadFilterCoefficients,
        buffer: &mut [f32],
        channel_index: usize,
        channel_count: usize,
    ) {
        for sample in buffer.iter_mut().skip(channel_index).step_by(channel_count) {
            *sample = self.process_sample(coefficients, *sample as f64) as f32;
        }
    }

    /// Apply the filter on a single sample.
    #[inline]
    pub fn process_sample(&mut self, coefficients: &BiquadFilterCoefficients, input: f64) -> f64 {
        let v0 = input;
        let v3 = v0 - self.ic2eq;
        let v1 = coefficients.a1 * self.ic1eq + coefficients.a2 * v3;
        let v2 = self.ic2eq + coefficients.a2 * self.ic1eq + coefficients.a3 * v3;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;
        v2
    }

    /// Reset state of filter.
    #[inline]
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

// -------------------------------------------------------------------------------------------------
