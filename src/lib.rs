#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod error;
mod resampler;

// public, flat re-exports
pub use error::Error;

pub use resampler::{
    engine::InterpolationMode, kernel::SincKernel, AudioResampler, BlockResampler, FeedMode,
    Resampler, ResamplerOptions, ResamplingQuality,
};

// public mods
pub mod utils;

pub mod kernels {
    //! Windowed-sinc low-pass design helpers, as used by the sinc interpolation mode.

    pub use super::resampler::kernel::{design_lowpass, sinc_cutoff, SincKernel};
}
