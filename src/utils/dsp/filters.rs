//! Low-order filters used for anti-alias smoothing.

pub mod biquad;
