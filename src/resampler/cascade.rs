use crate::{
    utils::dsp::filters::biquad::{BiquadFilter, BiquadFilterCoefficients},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// A chain of identical low-pass biquad stages, with separate filter memory for each channel.
///
/// Used for cheap anti-alias smoothing around point or linear interpolation: as pre-filter on
/// the input when downsampling, else as post-filter on the output.
#[derive(Debug, Clone)]
pub struct CascadeFilter {
    stage_count: usize,
    channel_count: usize,
    coefficients: BiquadFilterCoefficients,
    // channel major: [channel * stage_count + stage]
    filters: Vec<BiquadFilter>,
}

impl CascadeFilter {
    pub const MAX_STAGES: usize = 4;

    /// Normalized cutoffs are kept in this range to keep the filter stable.
    const MIN_CUTOFF: f64 = 0.0001;
    const MAX_CUTOFF: f64 = 0.9999;

    pub fn new(stage_count: usize) -> Self {
        debug_assert!(
            (1..=Self::MAX_STAGES).contains(&stage_count),
            "Invalid stage count"
        );
        Self {
            stage_count,
            channel_count: 0,
            coefficients: BiquadFilterCoefficients::default(),
            filters: Vec::new(),
        }
    }

    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    pub fn coefficients(&self) -> &BiquadFilterCoefficients {
        &self.coefficients
    }

    /// Allocate filter memory for the given channel layout. Memory is cleared when the
    /// layout changes, else kept as it is.
    pub fn set_channel_count(&mut self, channel_count: usize) {
        if self.channel_count != channel_count {
            self.channel_count = channel_count;
            self.filters.clear();
            self.filters
                .resize(channel_count * self.stage_count, BiquadFilter::new());
        }
    }

    /// Update stage parameters. The cutoff gets clamped into a stable range. Returns true
    /// when the coefficients had to be recalculated.
    pub fn set_parameters(&mut self, cutoff: f64, q: f64) -> Result<bool, Error> {
        let cutoff = cutoff.clamp(Self::MIN_CUTOFF, Self::MAX_CUTOFF);
        self.coefficients.set(cutoff, q)
    }

    /// Run all stages on the given interleaved buffer.
    pub fn process(&mut self, buffer: &mut [f32], channel_count: usize) {
        debug_assert_eq!(
            self.channel_count, channel_count,
            "Filter memory is not allocated for this channel layout"
        );
        for (index, filter) in self.filters.iter_mut().enumerate() {
            let channel_index = index / self.stage_count;
            filter.process_channel(&self.coefficients, buffer, channel_index, channel_count);
        }
    }

    /// Clear all filter memory.
    pub fn reset(&mut self) {
        for filter in self.filters.iter_mut() {
            filter.reset();
        }
    }
}

// -------------------------------------------------------------------------------------------------
