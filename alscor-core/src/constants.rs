//! Calibrated Constants of the Correction Algorithm
//!
//! These values were tuned against reference panels and are part of the
//! algorithm itself, not device configuration. Changing any of them changes
//! the correction behavior; device-specific tuning belongs in
//! [`CalibrationConfig`](crate::config::CalibrationConfig) instead.

// ===== EVENT TIMING =====

/// Minimum interval between processed events (milliseconds).
///
/// Events arriving faster than this are dropped before any state is
/// touched, bounding the screen-capture rate independent of how fast the
/// sensor delivers readings.
pub const RATE_LIMIT_MS: u64 = 100;

/// Interval after which a recapture is forced (milliseconds).
///
/// Periodic resynchronization while the screen is lit. Compensates for
/// slow drift that stays inside the hysteresis band and would otherwise
/// never trigger a recapture.
pub const FORCED_UPDATE_INTERVAL_MS: u64 = 3_000;

// ===== RECAPTURE DECISION =====

/// Lower edge of the calibrated-raw band that suppresses recapture (lux).
pub const RECAPTURE_BAND_MIN: f32 = 10.0;

/// Upper edge of the calibrated-raw band that suppresses recapture (lux).
///
/// Derived as 5.0 / 0.07 in the reference tuning; kept as the exact
/// expression so the derivation stays visible.
pub const RECAPTURE_BAND_MAX: f32 = 5.0 / 0.07;

// ===== COMPENSATION MODEL =====

/// Exponent of the panel gamma curve used for the grayscale floor.
pub const PANEL_GAMMA: f32 = 2.2;

/// Full-scale value of a captured 8-bit channel sample.
pub const CHANNEL_FULL_SCALE: f32 = 255.0;

/// Guard band subtracted from every accepted corrected value (lux).
///
/// Keeps the output clear of the residual panel glow that survives the
/// polynomial model on dark content.
pub const CORRECTION_FLOOR_LUX: f32 = 14.0;

// ===== ACCEPT / REJECT GUARD =====

/// Maximum ratio of screen correction to raw reading before the result
/// is rejected as a capture glitch and the last good value is reused.
pub const REJECT_GUARD_RATIO: f32 = 1.35;

/// Calibrated readings below this always bypass the reject guard (lux).
pub const REJECT_GUARD_EXEMPT_LUX: f32 = 10_000.0;

// ===== GAIN HANDLING =====

/// Divisor converting device coefficient files (integer per-mille) into
/// gain multipliers.
pub const COEFFICIENT_SCALE: f32 = 1000.0;

/// Numerator of the AGC activation threshold: tier selection is attempted
/// above `800 / base_inverse_gain` lux.
pub const AGC_THRESHOLD_NUMERATOR: f32 = 800.0;

/// Scale applied to the secondary channel in the high-bit-rate gain
/// estimate.
pub const HBR_CHANNEL_SCALE: f32 = 1000.0;

/// Secondary-channel readings below this are treated as a dead channel
/// and AGC tier escalation is skipped.
pub const AGC_CHANNEL_EPSILON: f32 = 1e-6;

// ===== DEFAULTS =====

/// Default maximum backlight value when the device does not report one.
pub const DEFAULT_MAX_BRIGHTNESS: f32 = 1023.0;
