//! Error Types for Calibration Loading and Screen Capture
//!
//! Errors are kept small and Copy so they can be returned from the event
//! hot path and stored without allocation. Failures here are local to a
//! single load or a single event:
//!
//! - [`ConfigError`]: the calibration source was missing or malformed.
//!   The engine still runs on defaulted (zero) calibration in a degraded
//!   mode; nothing panics.
//! - [`CaptureError`]: the screen-capture collaborator was unavailable or
//!   the call failed. The current event is dropped and the next event is
//!   the retry.

use thiserror_no_std::Error;

/// Result type for calibration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for screen-capture requests.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Calibration load failures.
///
/// All of these leave the affected fields at their zero defaults rather
/// than aborting startup.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Calibration document could not be read
    #[error("calibration source unavailable: {reason}")]
    SourceUnavailable {
        reason: &'static str,
    },

    /// A value in the calibration source failed to parse
    #[error("malformed calibration value: {field}")]
    MalformedValue {
        field: &'static str,
    },

    /// An expected node/field was absent from the source
    #[error("missing calibration field: {field}")]
    MissingField {
        field: &'static str,
    },
}

/// Screen-capture failures, reported per event.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    /// Capture service is not registered or has gone away
    #[error("capture service unavailable")]
    ServiceUnavailable,

    /// The capture call itself failed or timed out
    #[error("capture call failed")]
    CallFailed,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::SourceUnavailable { reason } =>
                defmt::write!(fmt, "calibration source unavailable: {}", reason),
            Self::MalformedValue { field } =>
                defmt::write!(fmt, "malformed calibration value: {}", field),
            Self::MissingField { field } =>
                defmt::write!(fmt, "missing calibration field: {}", field),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CaptureError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::ServiceUnavailable => defmt::write!(fmt, "capture service unavailable"),
            Self::CallFailed => defmt::write!(fmt, "capture call failed"),
        }
    }
}
