use std::{error, fmt};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by the resampler.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Invalid rate, channel count, kernel size or filter parameter. The session keeps its
    /// last valid configuration.
    ConfigurationError(String),
    /// The prepare/out call sequence was not followed, e.g. more input frames were passed to
    /// `out` than the preceding `prepare` authorized.
    ProtocolViolation(String),
    /// More output was requested than the prepared input or the given output buffer can hold.
    CapacityExceeded { requested: usize, available: usize },
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigurationError(str) => write!(f, "Invalid configuration: {str}"),
            Self::ProtocolViolation(str) => write!(f, "Resampler protocol violation: {str}"),
            Self::CapacityExceeded {
                requested,
                available,
            } => write!(
                f,
                "Capacity exceeded: requested {requested} frames, but only {available} are available"
            ),
        }
    }
}
