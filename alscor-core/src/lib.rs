//! Correction engine for ambient light sensors mounted behind displays
//!
//! Light reaching an under-display ALS is contaminated by the panel's own
//! emission, so raw lux readings must be adjusted with a live estimate of
//! what the screen is showing over the sensor. This crate implements the
//! stateful correction: per-channel polynomial compensation from a screen
//! capture, hysteresis-band debouncing, rate limiting, and gain-adaptive
//! calibration (AGC) from a secondary channel.
//!
//! Screen capture and brightness are injected capabilities, so the engine
//! runs unchanged against a platform capture service or a test fake.
//!
//! ```no_run
//! use alscor_core::{
//!     CalibrationConfig, CorrectionEngine, SensorEvent,
//!     capture::{FixedBrightness, FixedCapture, ScreenSample},
//!     time::SystemClock,
//! };
//!
//! let mut engine = CorrectionEngine::new(
//!     CalibrationConfig::default(),
//!     FixedCapture::new(ScreenSample::default()),
//!     FixedBrightness::new(512.0),
//!     SystemClock::new(),
//! );
//!
//! let mut event = SensorEvent::new(1, 500.0, 0);
//! engine.process(&mut event);
//! if event.is_valid() {
//!     // event.scalar now holds the corrected lux value
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod capture;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod events;
pub mod hysteresis;
pub mod time;

#[cfg(feature = "std")]
pub mod device;

// Public API
pub use config::{CalibrationConfig, CalibrationOverrides, RawCalibration};
pub use engine::{CorrectionEngine, CorrectionState, DropReason, ProcessOutcome};
pub use errors::{CaptureError, ConfigError};
pub use events::SensorEvent;
pub use hysteresis::{HysteresisRange, HysteresisTable};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
