use assume::assume;
use strum::{Display, EnumIter, EnumString};

use super::{cascade::CascadeFilter, kernel::SincKernel};
use crate::{utils::buffer::frame_count, Error};

// -------------------------------------------------------------------------------------------------

/// Interpolation method used to render output frames from input frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum InterpolationMode {
    /// Use the nearest input frame at or before the read position.
    Nearest,
    /// Linear blend of the two input frames around the read position.
    Linear,
    /// Band-limited windowed-sinc interpolation.
    Sinc,
}

// -------------------------------------------------------------------------------------------------

/// Result of a single [`InterpolationEngine::produce`] run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Production {
    /// Number of rendered output frames.
    pub written: usize,
    /// Number of leading output frames which are centered within real, non padded input.
    pub valid: usize,
    /// Read position after the last rendered frame, relative to the first input frame.
    pub position: f64,
}

// -------------------------------------------------------------------------------------------------

/// Stateful interpolation engine. The variant is selected once per mode change, and each
/// variant keeps its own state: filter memory for the cascade, the kernel table for sinc.
#[derive(Debug, Clone)]
pub enum InterpolationEngine {
    /// Nearest or linear interpolation without any filtering.
    Passthrough { interpolate: bool },
    /// Nearest or linear interpolation, smoothed with a cascade of low-pass stages.
    Cascade {
        interpolate: bool,
        filter: CascadeFilter,
    },
    /// Windowed-sinc interpolation. The kernel is built lazily for the active ratio.
    Sinc {
        size: usize,
        oversize: usize,
        kernel: Option<SincKernel>,
    },
}

impl InterpolationEngine {
    /// Create a nearest or linear interpolating engine with `filter_count` cascade stages.
    pub fn interpolating(interpolate: bool, filter_count: usize) -> Self {
        if filter_count > 0 {
            Self::Cascade {
                interpolate,
                filter: CascadeFilter::new(filter_count),
            }
        } else {
            Self::Passthrough { interpolate }
        }
    }

    /// Create a sinc interpolating engine with the given, already validated, kernel sizes.
    pub fn sinc(size: usize, oversize: usize) -> Self {
        Self::Sinc {
            size,
            oversize,
            kernel: None,
        }
    }

    pub fn mode(&self) -> InterpolationMode {
        match self {
            Self::Passthrough { interpolate } | Self::Cascade { interpolate, .. } => {
                if *interpolate {
                    InterpolationMode::Linear
                } else {
                    InterpolationMode::Nearest
                }
            }
            Self::Sinc { .. } => InterpolationMode::Sinc,
        }
    }

    pub fn filter_count(&self) -> usize {
        match self {
            Self::Cascade { filter, .. } => filter.stage_count(),
            _ => 0,
        }
    }

    /// Number of input frames, starting at the integer read position, a single output frame
    /// depends on.
    pub fn tap_span(&self) -> usize {
        match self {
            Self::Sinc { size, .. } => *size,
            Self::Passthrough { interpolate } | Self::Cascade { interpolate, .. } => {
                if *interpolate {
                    2
                } else {
                    1
                }
            }
        }
    }

    /// Number of frames in front of the interpolation center the engine reads. The input ring
    /// gets primed with that many silent frames at the start of a stream.
    pub fn history_frames(&self) -> usize {
        match self {
            Self::Sinc { size, .. } => size / 2 - 1,
            _ => 0,
        }
    }

    /// Access to the sinc kernel, if one got built.
    pub fn kernel(&self) -> Option<&SincKernel> {
        match self {
            Self::Sinc { kernel, .. } => kernel.as_ref(),
            _ => None,
        }
    }

    /// Make sure the sinc kernel fits the given ratio. Returns true when it got (re)built.
    pub fn update_kernel(&mut self, ratio: f64) -> bool {
        if let Self::Sinc {
            size,
            oversize,
            kernel,
        } = self
        {
            if !kernel
                .as_ref()
                .is_some_and(|kernel| kernel.matches(*size, *oversize, ratio))
            {
                *kernel = Some(SincKernel::new(*size, *oversize, ratio));
                return true;
            }
        }
        false
    }

    /// Update cascade filter parameters and filter memory layout.
    pub fn update_filter(
        &mut self,
        ratio: f64,
        filter_position: f64,
        filter_q: f64,
        channel_count: usize,
    ) -> Result<(), Error> {
        if let Self::Cascade { filter, .. } = self {
            filter.set_channel_count(channel_count);
            let cutoff = if ratio > 1.0 {
                filter_position / ratio
            } else {
                filter_position * ratio
            };
            if filter.set_parameters(cutoff, filter_q)? {
                log::debug!(
                    "Cascade filter cutoff set to {:.4}",
                    filter.coefficients().cutoff()
                );
            }
        }
        Ok(())
    }

    /// Apply the cascade pre-filter on newly received input, when downsampling.
    pub fn prefilter(&mut self, input: &mut [f32], channel_count: usize, ratio: f64) {
        if let Self::Cascade { filter, .. } = self {
            if ratio > 1.0 && !input.is_empty() {
                filter.process(input, channel_count);
            }
        }
    }

    /// Clear filter memory.
    pub fn reset(&mut self) {
        if let Self::Cascade { filter, .. } = self {
            filter.reset();
        }
    }

    /// Render output frames from the given interleaved input, starting at read `position`,
    /// advancing the position by `ratio` for each output frame. Stops when the output is full or
    /// the input can't support another frame. `real_frames` is the number of input frames which
    /// are not flush padding.
    pub fn produce(
        &mut self,
        input: &[f32],
        real_frames: usize,
        position: f64,
        ratio: f64,
        output: &mut [f32],
        channel_count: usize,
    ) -> Production {
        debug_assert!(input.len() % channel_count == 0);
        debug_assert!(output.len() % channel_count == 0);
        match self {
            Self::Passthrough { interpolate } => {
                if *interpolate {
                    render_linear(input, real_frames, position, ratio, output, channel_count)
                } else {
                    render_nearest(input, real_frames, position, ratio, output, channel_count)
                }
            }
            Self::Cascade {
                interpolate,
                filter,
            } => {
                let production = if *interpolate {
                    render_linear(input, real_frames, position, ratio, output, channel_count)
                } else {
                    render_nearest(input, real_frames, position, ratio, output, channel_count)
                };
                if ratio <= 1.0 && production.written > 0 {
                    filter.process(
                        &mut output[..production.written * channel_count],
                        channel_count,
                    );
                }
                production
            }
            Self::Sinc { kernel, .. } => {
                if let Some(kernel) = kernel {
                    render_sinc(
                        kernel,
                        input,
                        real_frames,
                        position,
                        ratio,
                        output,
                        channel_count,
                    )
                } else {
                    debug_assert!(false, "Sinc kernel should have been built before");
                    Production {
                        written: 0,
                        valid: 0,
                        position,
                    }
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

fn render_nearest(
    input: &[f32],
    real_frames: usize,
    mut position: f64,
    ratio: f64,
    output: &mut [f32],
    channel_count: usize,
) -> Production {
    let available = frame_count(input, channel_count);
    let real_end = real_frames as f64;
    let mut written = 0;
    let mut valid = 0;
    for frame in output.chunks_exact_mut(channel_count) {
        let index = position as usize;
        if index >= available {
            break;
        }
        frame.copy_from_slice(&input[index * channel_count..(index + 1) * channel_count]);
        if position < real_end {
            valid += 1;
        }
        written += 1;
        position += ratio;
    }
    Production {
        written,
        valid,
        position,
    }
}

fn render_linear(
    input: &[f32],
    real_frames: usize,
    mut position: f64,
    ratio: f64,
    output: &mut [f32],
    channel_count: usize,
) -> Production {
    let available = frame_count(input, channel_count);
    let real_end = real_frames as f64;
    let mut written = 0;
    let mut valid = 0;
    for frame in output.chunks_exact_mut(channel_count) {
        let index = position as usize;
        if index + 1 >= available {
            break;
        }
        let fraction = (position - index as f64) as f32;
        assume!(unsafe: (index + 2) * channel_count <= input.len(), "Read position is checked above");
        let current = &input[index * channel_count..(index + 1) * channel_count];
        let next = &input[(index + 1) * channel_count..(index + 2) * channel_count];
        for ((out, a), b) in frame.iter_mut().zip(current).zip(next) {
            *out = a * (1.0 - fraction) + b * fraction;
        }
        if position < real_end {
            valid += 1;
        }
        written += 1;
        position += ratio;
    }
    Production {
        written,
        valid,
        position,
    }
}

fn render_sinc(
    kernel: &SincKernel,
    input: &[f32],
    real_frames: usize,
    position: f64,
    ratio: f64,
    output: &mut [f32],
    channel_count: usize,
) -> Production {
    let size = kernel.size();
    let center = kernel.center_offset() as f64;
    let available = frame_count(input, channel_count);
    let real_end = real_frames as f64;

    // compile the loop for the best available SIMD instruction set
    pulp::Arch::new().dispatch(|| {
        let mut position = position;
        let mut written = 0;
        let mut valid = 0;
        for frame in output.chunks_exact_mut(channel_count) {
            let index = position as usize;
            if index + size > available {
                break;
            }
            let (row_a, row_b, weight) = kernel.rows(position - index as f64);
            let taps = &input[index * channel_count..(index + size) * channel_count];
            if channel_count == 1 {
                let mut sum_a = 0.0_f32;
                let mut sum_b = 0.0_f32;
                for ((a, b), x) in row_a.iter().zip(row_b).zip(taps) {
                    sum_a += a * x;
                    sum_b += b * x;
                }
                frame[0] = (sum_a as f64 * (1.0 - weight) + sum_b as f64 * weight) as f32;
            } else {
                for (channel_index, out) in frame.iter_mut().enumerate() {
                    let mut sum_a = 0.0_f32;
                    let mut sum_b = 0.0_f32;
                    let channel_taps = taps.iter().skip(channel_index).step_by(channel_count);
                    for ((a, b), x) in row_a.iter().zip(row_b).zip(channel_taps) {
                        sum_a += a * x;
                        sum_b += b * x;
                    }
                    *out = (sum_a as f64 * (1.0 - weight) + sum_b as f64 * weight) as f32;
                }
            }
            if position + center < real_end {
                valid += 1;
            }
            written += 1;
            position += ratio;
        }
        Production {
            written,
            valid,
            position,
        }
    })
}

// -------------------------------------------------------------------------------------------------
