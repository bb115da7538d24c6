//! Panel-Aware Light Correction Engine
//!
//! ## Overview
//!
//! A light sensor mounted behind a display panel measures ambient light
//! plus whatever the panel itself is emitting over the sensor window. The
//! engine subtracts a live estimate of that panel contribution from each
//! raw reading.
//!
//! The estimate comes from a screen-color capture run through a per-channel
//! polynomial model, which makes every recomputation a capture round-trip.
//! Three mechanisms keep that affordable:
//!
//! - a **rate limiter** drops events arriving faster than once per 100 ms;
//! - a **hysteresis band** around the last accepted value reuses the
//!   previous correction while the raw reading stays inside it;
//! - a **forced resync** every 3 s while the screen is lit bypasses the
//!   band so slow drift cannot accumulate.
//!
//! On top of the subtraction, an AGC step picks a sensor inverse-gain tier
//! from a secondary intensity channel, so the output stays linear across
//! the sensor's gain ranges.
//!
//! ## Processing model
//!
//! `process` is synchronous and runs once per incoming event on the
//! delivery path; the capture call blocks inside it. The engine owns all
//! of its state, so no locking is needed under single-threaded delivery.
//! Wrap the engine in a mutex if multiple threads can deliver events for
//! the same sensor.
//!
//! Events are corrected in place. Dropped events (rate limit, capture
//! failure) get their handle cleared; callers must discard those instead
//! of forwarding them.

use crate::{
    capture::{BrightnessSource, ScreenCapture},
    config::CalibrationConfig,
    constants::{
        AGC_CHANNEL_EPSILON, CHANNEL_FULL_SCALE, CORRECTION_FLOOR_LUX, FORCED_UPDATE_INTERVAL_MS,
        HBR_CHANNEL_SCALE, PANEL_GAMMA, RATE_LIMIT_MS, RECAPTURE_BAND_MAX, RECAPTURE_BAND_MIN,
        REJECT_GUARD_EXEMPT_LUX, REJECT_GUARD_RATIO,
    },
    errors::CaptureError,
    events::SensorEvent,
    hysteresis::HysteresisTable,
    time::{TimeSource, Timestamp},
};

#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

/// Why an event was dropped rather than corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Less than the minimum interval since the last processed event
    RateLimited,
    /// Screen capture collaborator failed
    CaptureFailed(CaptureError),
}

/// Result of processing one sensor event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessOutcome {
    /// A fresh capture ran and the correction was accepted
    Corrected(f32),
    /// The previous corrected value was reused (hysteresis or reject guard)
    Reused(f32),
    /// The event was marked invalid; callers must not forward it
    Dropped(DropReason),
}

/// Per-sensor mutable state, owned by the engine for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionState {
    /// Timestamp of the last processed (non-dropped) event; `None`
    /// until the first event arrives
    pub last_update: Option<Timestamp>,
    /// Timestamp of the last forced resynchronization
    pub last_forced_update: Timestamp,
    /// Next capture bypasses hysteresis suppression
    pub force_update: bool,
    /// Lower raw-value acceptance bound; -1 = never reject from below
    pub hyst_min: f32,
    /// Upper raw-value acceptance bound
    pub hyst_max: f32,
    /// Most recent accepted output, reused when recapture is skipped
    pub last_corrected_value: f32,
    /// Inverse gain of the last accepted cycle, used to pre-scale the
    /// next raw reading in the recapture decision
    pub last_agc_gain: f32,
}

impl Default for CorrectionState {
    fn default() -> Self {
        Self {
            last_update: None,
            last_forced_update: 0,
            force_update: true,
            hyst_min: -1.0,
            hyst_max: -1.0,
            last_corrected_value: 0.0,
            last_agc_gain: 0.0,
        }
    }
}

/// The correction engine: calibration, hysteresis table, collaborators
/// and per-run state in one owned object.
pub struct CorrectionEngine<C, B, T> {
    config: CalibrationConfig,
    table: HysteresisTable,
    capture: C,
    brightness: B,
    clock: T,
    state: CorrectionState,
}

impl<C, B, T> CorrectionEngine<C, B, T>
where
    C: ScreenCapture,
    B: BrightnessSource,
    T: TimeSource,
{
    /// Build an engine with the reference hysteresis table.
    pub fn new(config: CalibrationConfig, capture: C, brightness: B, clock: T) -> Self {
        Self::with_table(config, HysteresisTable::reference(), capture, brightness, clock)
    }

    /// Build an engine with a custom hysteresis table.
    ///
    /// The table is expected in raw-sensor units; it is rescaled into
    /// event units here, exactly once.
    pub fn with_table(
        config: CalibrationConfig,
        mut table: HysteresisTable,
        capture: C,
        brightness: B,
        clock: T,
    ) -> Self {
        let gain = config.raw_unit_gain();
        if gain > 0.0 {
            table.rescale(gain);
        }
        Self {
            config,
            table,
            capture,
            brightness,
            clock,
            state: CorrectionState::default(),
        }
    }

    /// Current per-run state (read-only).
    pub fn state(&self) -> &CorrectionState {
        &self.state
    }

    /// Calibration in effect (read-only after construction).
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Hysteresis table after load-time rescaling.
    pub fn table(&self) -> &HysteresisTable {
        &self.table
    }

    /// Correct one sensor event in place.
    ///
    /// On [`ProcessOutcome::Dropped`] the event's handle is cleared and
    /// its scalar is meaningless; callers must discard it.
    pub fn process(&mut self, event: &mut SensorEvent) -> ProcessOutcome {
        // Bias removal; never drives the reading negative
        if event.scalar > self.config.bias {
            event.scalar -= self.config.bias;
        }
        log_debug!("raw sensor reading: {:.0}", event.scalar);

        let now = self.clock.now();
        let brightness = self.brightness.brightness();

        // Rate limiting and periodic resynchronization. The forced-update
        // timer only runs while the screen is lit; a dark screen emits
        // nothing worth resynchronizing against.
        match self.state.last_update {
            None => {
                self.state.last_update = Some(now);
                self.state.last_forced_update = now;
            }
            Some(last) => {
                if brightness > 0.0
                    && now.saturating_sub(self.state.last_forced_update)
                        > FORCED_UPDATE_INTERVAL_MS
                {
                    self.state.force_update = true;
                    self.state.last_forced_update = now;
                }
                if now.saturating_sub(last) < RATE_LIMIT_MS {
                    event.invalidate();
                    return ProcessOutcome::Dropped(DropReason::RateLimited);
                }
                self.state.last_update = Some(now);
            }
        }

        // Recapture decision: the raw reading pre-scaled by the last
        // accepted gains decides together with the hysteresis band
        let prescaled = event.scalar * self.config.calib_gain * self.state.last_agc_gain;
        let outside_band =
            event.scalar < self.state.hyst_min || event.scalar > self.state.hyst_max;
        let outside_calibrated = prescaled < RECAPTURE_BAND_MIN || prescaled > RECAPTURE_BAND_MAX;

        if !(self.state.force_update || (outside_band && outside_calibrated)) {
            event.scalar = self.state.last_corrected_value;
            return ProcessOutcome::Reused(event.scalar);
        }

        // Capture; a failure drops the event and leaves hysteresis and
        // the last corrected value exactly as they were
        let sample = match self.capture.capture() {
            Ok(sample) => sample,
            Err(err) => {
                log_warn!("could not capture area above sensor: {}", err);
                event.invalidate();
                return ProcessOutcome::Dropped(DropReason::CaptureFailed(err));
            }
        };
        log_debug!(
            "screen color above sensor: {:.1} {:.1} {:.1}",
            sample.r,
            sample.g,
            sample.b
        );

        // RGBW compensation model
        let weights = &self.config.grayscale_weights;
        let gray = sample.r * weights[0] + sample.g * weights[1] + sample.b * weights[2];
        let rgbw = [sample.r, sample.g, sample.b, gray];

        let mut correction = 0.0f32;
        for (i, &x) in rgbw.iter().enumerate() {
            let contribution = horner(&self.config.rgbw_poly[i], x) * self.config.rgbw_lux_postmul[i];
            if i < 3 {
                correction += contribution.max(0.0);
            } else {
                // Synthetic white removes the overlap counted three times
                correction -= contribution;
            }
        }
        let brightness_ratio = brightness / self.config.max_brightness;
        correction *= brightness_ratio;

        // Bound the estimate by what the panel can physically emit: a
        // full-white ceiling and a gamma-corrected floor for the actual
        // gray level on screen
        let fullwhite = self.config.rgbw_max_lux[3] * brightness_ratio;
        let gray_gamma = libm::powf(gray / CHANNEL_FULL_SCALE, PANEL_GAMMA) * fullwhite;
        correction = correction.max(gray_gamma).min(fullwhite);

        let raw_corrected = (event.scalar - correction).max(0.0);

        // AGC tier selection from the secondary channel
        let mut agc_gain = self.config.sensor_inverse_gain[0];
        if raw_corrected > self.config.agc_threshold {
            if let Some(estimate) = gain_estimate(
                self.config.hbr,
                event.agc_channel(),
                raw_corrected,
            ) {
                agc_gain = self.config.select_inverse_gain(estimate);
            }
        }

        // Accept unless the correction is wildly disproportionate to the
        // reading (capture glitch); forced cycles always accept
        let accept = correction <= event.scalar * REJECT_GUARD_RATIO
            || event.scalar * self.config.calib_gain * agc_gain < REJECT_GUARD_EXEMPT_LUX
            || self.state.force_update;

        let outcome = if accept {
            let mut corrected = raw_corrected * self.config.calib_gain * agc_gain;
            self.state.last_agc_gain = agc_gain;

            // Band for the next events, widened at the top by the
            // full-white estimate so bright screens don't oscillate
            let band = self.table.select(corrected);
            self.state.hyst_min = band.min;
            self.state.hyst_max = band.max + fullwhite;

            corrected = (corrected - CORRECTION_FLOOR_LUX).max(0.0);
            self.state.last_corrected_value = corrected;
            event.scalar = corrected;
            log_debug!("corrected reading: {:.0}", corrected);
            ProcessOutcome::Corrected(corrected)
        } else {
            log_debug!(
                "correction {:.0} disproportionate to reading {:.0}, reusing last value",
                correction,
                event.scalar
            );
            event.scalar = self.state.last_corrected_value;
            ProcessOutcome::Reused(self.state.last_corrected_value)
        };

        // The capture cycle ran to completion; forced or not, the next
        // event starts from a clean slate
        self.state.force_update = false;
        outcome
    }
}

/// Evaluate a quadratic with coefficients in highest-order-first order.
fn horner(coeffs: &[f32; 3], x: f32) -> f32 {
    let mut acc = 0.0f32;
    for &coef in coeffs {
        acc = acc * x + coef;
    }
    acc
}

/// Gain estimate from the secondary intensity channel.
///
/// Returns `None` when the channel cannot produce a meaningful estimate
/// (non-HBR formula with a dead secondary channel); the caller keeps the
/// base tier in that case.
fn gain_estimate(hbr: bool, secondary: f32, raw_corrected: f32) -> Option<f32> {
    if hbr {
        Some(secondary * HBR_CHANNEL_SCALE / raw_corrected)
    } else if secondary >= AGC_CHANNEL_EPSILON {
        Some(raw_corrected / secondary)
    } else {
        None
    }
}
