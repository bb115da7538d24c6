//! Screen Capture and Brightness Collaborators
//!
//! The engine subtracts the panel's own light from the sensor reading, so
//! it needs to know what the screen is showing over the sensor and how
//! bright the backlight currently is. Both are injected as capabilities:
//! production wires them to the platform capture service and the backlight
//! driver, tests substitute the deterministic implementations below.
//!
//! Capture is blocking from the engine's point of view. A timeout or a
//! service error surfaces as an ordinary [`CaptureError`] and drops the
//! current event; the next sensor event is the retry.

use crate::errors::{CaptureError, CaptureResult};

/// Color sample of the display region above the sensor.
///
/// Channel intensities are in the same linear scale the calibration
/// polynomials were fitted against (0..255 per channel).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScreenSample {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl ScreenSample {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Capability supplying screen-color samples above the sensor.
pub trait ScreenCapture {
    /// Request the current color of the display area overlapping the
    /// sensor. Blocking; failure drops the event being processed.
    fn capture(&mut self) -> CaptureResult<ScreenSample>;
}

/// Capability supplying the current display brightness.
pub trait BrightnessSource {
    /// Current backlight level in device units (0 = screen off).
    fn brightness(&self) -> f32;
}

/// Capture source returning a fixed sample, for tests and bring-up.
#[derive(Debug, Clone, Copy)]
pub struct FixedCapture {
    sample: ScreenSample,
}

impl FixedCapture {
    pub fn new(sample: ScreenSample) -> Self {
        Self { sample }
    }

    pub fn set(&mut self, sample: ScreenSample) {
        self.sample = sample;
    }
}

impl ScreenCapture for FixedCapture {
    fn capture(&mut self) -> CaptureResult<ScreenSample> {
        Ok(self.sample)
    }
}

/// Capture source that always fails, for exercising drop paths.
#[derive(Debug, Clone, Copy)]
pub struct FailingCapture;

impl ScreenCapture for FailingCapture {
    fn capture(&mut self) -> CaptureResult<ScreenSample> {
        Err(CaptureError::ServiceUnavailable)
    }
}

/// Brightness source returning a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct FixedBrightness {
    level: f32,
}

impl FixedBrightness {
    pub fn new(level: f32) -> Self {
        Self { level }
    }

    pub fn set(&mut self, level: f32) {
        self.level = level;
    }
}

impl BrightnessSource for FixedBrightness {
    fn brightness(&self) -> f32 {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_capture_returns_sample() {
        let mut capture = FixedCapture::new(ScreenSample::new(10.0, 20.0, 30.0));
        let sample = capture.capture().unwrap();
        assert_eq!(sample, ScreenSample::new(10.0, 20.0, 30.0));

        capture.set(ScreenSample::new(1.0, 2.0, 3.0));
        assert_eq!(capture.capture().unwrap().g, 2.0);
    }

    #[test]
    fn failing_capture_reports_unavailable() {
        let mut capture = FailingCapture;
        assert_eq!(capture.capture(), Err(CaptureError::ServiceUnavailable));
    }
}
