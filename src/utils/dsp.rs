//! Common, shared DSP tools for the interpolation engines.

pub mod filters;
pub mod window;
