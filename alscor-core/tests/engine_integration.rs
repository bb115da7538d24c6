//! Integration tests for the correction engine
//!
//! Exercises the full event flow with scripted collaborators: calibration
//! load, capture, compensation, hysteresis reuse, rate limiting, forced
//! resynchronization and the reject guard.

use std::cell::Cell;
use std::rc::Rc;

use alscor_core::{
    capture::{BrightnessSource, ScreenCapture, ScreenSample},
    config::ChannelCalibration,
    engine::DropReason,
    errors::{CaptureError, CaptureResult},
    time::FixedClock,
    CalibrationConfig, CalibrationOverrides, CorrectionEngine, ProcessOutcome, RawCalibration,
    SensorEvent,
};

/// Brightness fake the test can change between events.
#[derive(Clone)]
struct SharedBrightness(Rc<Cell<f32>>);

impl SharedBrightness {
    fn new(level: f32) -> Self {
        Self(Rc::new(Cell::new(level)))
    }

    fn set(&self, level: f32) {
        self.0.set(level);
    }
}

impl BrightnessSource for SharedBrightness {
    fn brightness(&self) -> f32 {
        self.0.get()
    }
}

/// Capture fake the test can switch between a sample and a failure.
#[derive(Clone)]
struct SharedCapture(Rc<Cell<CaptureResult<ScreenSample>>>);

impl SharedCapture {
    fn new(sample: ScreenSample) -> Self {
        Self(Rc::new(Cell::new(Ok(sample))))
    }

    fn set(&self, result: CaptureResult<ScreenSample>) {
        self.0.set(result);
    }
}

impl ScreenCapture for SharedCapture {
    fn capture(&mut self) -> CaptureResult<ScreenSample> {
        self.0.get()
    }
}

/// Document calibration with zero compensation polynomials and unity
/// gain tiers, matching the worked scenario of the algorithm notes.
fn passthrough_raw() -> RawCalibration {
    RawCalibration {
        channels: [
            ChannelCalibration { max_lux: 200.0, comp: [0.0; 3] },
            ChannelCalibration { max_lux: 300.0, comp: [0.0; 3] },
            ChannelCalibration { max_lux: 400.0, comp: [0.0; 3] },
            ChannelCalibration { max_lux: 500.0, comp: [0.0; 3] },
        ],
        max_lux_div: [1.0; 4],
        grayscale_weights: [0.3, 0.59, 0.11],
        // Document order; tier 0 ends up as level 4 = 1.0
        inverse_gain_levels: [0.125, 0.25, 0.5, 1.0],
        cal_coe: 0.0,
        gaincal_points: [100.0, 200.0, 400.0, 800.0],
        hbr: false,
    }
}

fn passthrough_overrides() -> CalibrationOverrides {
    CalibrationOverrides {
        row_coe: 1000.0, // base inverse gain 1.0
        cali_coe: 0.0,
        rgbw_max_lux: [0.0; 4],
        bias: 50.0,
        max_brightness: 1023.0,
    }
}

#[test]
fn worked_scenario_exact_arithmetic() {
    // Raw 500, bias 50, brightness 512/1023, dark screen, zero polynomial
    // coefficients: correction is exactly zero, the output is post-bias
    // minus the 14 lux floor.
    let config = CalibrationConfig::load(&passthrough_raw(), &passthrough_overrides());
    assert_eq!(config.calib_gain, 1.0);
    assert_eq!(config.sensor_inverse_gain[0], 1.0);

    let clock = FixedClock::new(1000);
    let mut engine = CorrectionEngine::new(
        config,
        SharedCapture::new(ScreenSample::default()),
        SharedBrightness::new(512.0),
        &clock,
    );

    let mut event = SensorEvent::new(3, 500.0, 1000);
    let outcome = engine.process(&mut event);

    assert_eq!(outcome, ProcessOutcome::Corrected(436.0));
    assert_eq!(event.scalar, 436.0);
    assert!(event.is_valid());
}

#[test]
fn idempotent_across_recapture_cycles() {
    // Identical raw reading, screen sample and brightness across two
    // forced recapture cycles must produce identical output.
    let config = CalibrationConfig::load(&passthrough_raw(), &passthrough_overrides());
    let clock = FixedClock::new(1000);
    let mut engine = CorrectionEngine::new(
        config,
        SharedCapture::new(ScreenSample::new(40.0, 80.0, 120.0)),
        SharedBrightness::new(512.0),
        &clock,
    );

    let mut first = SensorEvent::new(3, 500.0, 1000);
    let first_outcome = engine.process(&mut first);

    // Past the forced-update interval, so the second cycle recaptures
    clock.advance(3500);
    let mut second = SensorEvent::new(3, 500.0, 4500);
    let second_outcome = engine.process(&mut second);

    assert!(matches!(first_outcome, ProcessOutcome::Corrected(_)));
    assert_eq!(first_outcome, second_outcome);
    assert_eq!(first.scalar, second.scalar);
}

#[test]
fn rate_limited_event_is_dropped_without_state_change() {
    let config = CalibrationConfig::load(&passthrough_raw(), &passthrough_overrides());
    let clock = FixedClock::new(1000);
    let mut engine = CorrectionEngine::new(
        config,
        SharedCapture::new(ScreenSample::default()),
        SharedBrightness::new(512.0),
        &clock,
    );

    let mut first = SensorEvent::new(3, 500.0, 1000);
    engine.process(&mut first);
    assert!(first.is_valid());
    let state_before = *engine.state();

    clock.advance(50);
    let mut second = SensorEvent::new(3, 500.0, 1050);
    let outcome = engine.process(&mut second);

    assert_eq!(outcome, ProcessOutcome::Dropped(DropReason::RateLimited));
    assert!(!second.is_valid());
    assert_eq!(*engine.state(), state_before);
}

#[test]
fn capture_failure_drops_event_and_retries_on_next() {
    let config = CalibrationConfig::load(&passthrough_raw(), &passthrough_overrides());
    let clock = FixedClock::new(1000);
    let capture = SharedCapture::new(ScreenSample::default());
    let mut engine = CorrectionEngine::new(
        config,
        capture.clone(),
        SharedBrightness::new(512.0),
        &clock,
    );

    let mut first = SensorEvent::new(3, 500.0, 1000);
    engine.process(&mut first);
    let last_corrected = engine.state().last_corrected_value;
    let (hyst_min, hyst_max) = (engine.state().hyst_min, engine.state().hyst_max);

    // Service goes away; the forced interval guarantees a recapture
    capture.set(Err(CaptureError::CallFailed));
    clock.advance(3500);
    let mut second = SensorEvent::new(3, 500.0, 4500);
    let outcome = engine.process(&mut second);

    assert_eq!(
        outcome,
        ProcessOutcome::Dropped(DropReason::CaptureFailed(CaptureError::CallFailed))
    );
    assert!(!second.is_valid());
    assert_eq!(engine.state().last_corrected_value, last_corrected);
    assert_eq!(engine.state().hyst_min, hyst_min);
    assert_eq!(engine.state().hyst_max, hyst_max);

    // Service returns; the next event completes the pending cycle
    capture.set(Ok(ScreenSample::default()));
    clock.advance(200);
    let mut third = SensorEvent::new(3, 500.0, 4700);
    let outcome = engine.process(&mut third);
    assert_eq!(outcome, ProcessOutcome::Corrected(436.0));
    assert!(third.is_valid());
}

/// Calibration that produces a screen-glow estimate far larger than the
/// raw reading: a constant-term red polynomial against a generous white
/// ceiling.
fn glare_config() -> CalibrationConfig {
    CalibrationConfig {
        rgbw_max_lux: [20_000.0, 0.0, 0.0, 14_000.0],
        rgbw_max_lux_div: [1.0; 4],
        rgbw_lux_postmul: [20_000.0, 0.0, 0.0, 14_000.0],
        rgbw_poly: [
            [0.0, 0.0, 1.0],
            [0.0; 3],
            [0.0; 3],
            [0.0; 3],
        ],
        grayscale_weights: [0.0; 3],
        sensor_gaincal_points: [100.0, 200.0, 400.0, 800.0],
        sensor_inverse_gain: [1.0; 4],
        agc_threshold: 800.0,
        calib_gain: 1.0,
        bias: 0.0,
        max_brightness: 1023.0,
        hbr: false,
    }
}

#[test]
fn reject_guard_reuses_stale_value() {
    let clock = FixedClock::new(1000);
    let brightness = SharedBrightness::new(0.0);
    let mut engine = CorrectionEngine::new(
        glare_config(),
        SharedCapture::new(ScreenSample::default()),
        brightness.clone(),
        &clock,
    );

    // Prime with the screen off: correction 0, band set around 0 lux
    let mut prime = SensorEvent::new(3, 0.0, 1000);
    assert_eq!(engine.process(&mut prime), ProcessOutcome::Corrected(0.0));

    // Screen to full brightness: the polynomial estimate (14000 after the
    // full-white clamp) dwarfs the 10200 lux reading, and the calibrated
    // reading is above the guard exemption. Not forced, so reject.
    brightness.set(1023.0);
    clock.advance(200);
    let mut event = SensorEvent::new(3, 10_200.0, 1200);
    let outcome = engine.process(&mut event);

    assert_eq!(outcome, ProcessOutcome::Reused(0.0));
    assert_eq!(event.scalar, 0.0);
    assert!(event.is_valid());
    // Bands survive the rejected cycle
    assert_eq!(engine.state().hyst_min, -1.0);
    assert_eq!(engine.state().hyst_max, 4.0);
}

#[test]
fn forced_cycle_overrides_reject_guard() {
    let clock = FixedClock::new(1000);
    let brightness = SharedBrightness::new(0.0);
    let mut engine = CorrectionEngine::new(
        glare_config(),
        SharedCapture::new(ScreenSample::default()),
        brightness.clone(),
        &clock,
    );

    let mut prime = SensorEvent::new(3, 0.0, 1000);
    engine.process(&mut prime);

    // Same disproportionate correction, but past the forced interval:
    // the guard is bypassed and the (floored) correction is accepted
    brightness.set(1023.0);
    clock.advance(3500);
    let mut event = SensorEvent::new(3, 10_200.0, 4500);
    let outcome = engine.process(&mut event);

    assert_eq!(outcome, ProcessOutcome::Corrected(0.0));
    // Band re-selected for the accepted value, widened by full white
    assert_eq!(engine.state().hyst_max, 4.0 + 14_000.0);
}
