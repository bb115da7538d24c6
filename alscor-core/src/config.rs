//! Calibration Configuration
//!
//! The panel's light output and the sensor's gain characteristics are
//! described by a per-device calibration document plus a handful of
//! runtime values read from device storage. This module merges both into
//! an immutable [`CalibrationConfig`] consumed by the engine.
//!
//! Loading happens once at initialization, never during event processing.
//! A partially populated source leaves fields at their zero defaults: the
//! engine still runs, producing degenerate near-zero corrections instead
//! of crashing (degraded mode, see [`crate::errors::ConfigError`]).
//!
//! Document front ends (XML or otherwise) are out of scope here; anything
//! that can produce a [`RawCalibration`] satisfies the loader contract.

use crate::constants::{AGC_THRESHOLD_NUMERATOR, COEFFICIENT_SCALE, DEFAULT_MAX_BRIGHTNESS};

#[cfg(feature = "log")]
macro_rules! log_info {
    ($($arg:tt)*) => { log::info!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

/// Calibration for one display sub-channel (R, G, B or synthetic white).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelCalibration {
    /// Maximum lux contribution of this channel at full brightness
    pub max_lux: f32,
    /// Quadratic compensation coefficients, highest order first:
    /// `comp[0]*x² + comp[1]*x + comp[2]`
    pub comp: [f32; 3],
}

/// Document-shaped calibration input, before runtime merging.
///
/// Field layout follows the calibration document: four channel nodes,
/// grayscale weights, inverse-gain levels (document order, level 1
/// first), a global calibration coefficient and the AGC separation
/// points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawCalibration {
    /// R, G, B, W channel calibrations
    pub channels: [ChannelCalibration; 4],
    /// Per-channel normalization divisors (1.0 when the document omits them)
    pub max_lux_div: [f32; 4],
    /// Weights combining captured R, G, B into the synthetic white sample
    pub grayscale_weights: [f32; 3],
    /// Inverse-gain levels in document order; mapped to AGC tiers in
    /// reverse (level 4 becomes tier 0)
    pub inverse_gain_levels: [f32; 4],
    /// Global calibration coefficient (per-mille; 0 = absent)
    pub cal_coe: f32,
    /// Ascending gain-estimate thresholds for AGC tier selection
    pub gaincal_points: [f32; 4],
    /// Secondary channel is high-bit-rate (alternate gain-estimate formula)
    pub hbr: bool,
}

impl Default for RawCalibration {
    fn default() -> Self {
        Self {
            channels: [ChannelCalibration::default(); 4],
            max_lux_div: [1.0; 4],
            grayscale_weights: [0.0; 3],
            inverse_gain_levels: [0.0; 4],
            cal_coe: 0.0,
            gaincal_points: [0.0; 4],
            hbr: false,
        }
    }
}

/// Runtime values from device-specific storage, refined over the document.
///
/// A zero value means "absent, keep the document default" throughout.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationOverrides {
    /// Row coefficient (per-mille); replaces the base inverse gain
    pub row_coe: f32,
    /// Calibration coefficient (per-mille); sets the global gain
    pub cali_coe: f32,
    /// Per-channel maximum lux measured on this unit
    pub rgbw_max_lux: [f32; 4],
    /// Fixed offset subtracted from every raw reading
    pub bias: f32,
    /// Maximum representable display brightness
    pub max_brightness: f32,
}

impl Default for CalibrationOverrides {
    fn default() -> Self {
        Self {
            row_coe: 0.0,
            cali_coe: 0.0,
            rgbw_max_lux: [0.0; 4],
            bias: 0.0,
            max_brightness: DEFAULT_MAX_BRIGHTNESS,
        }
    }
}

/// Merged calibration, read-only during event processing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationConfig {
    /// Maximum lux contribution per channel at full brightness
    pub rgbw_max_lux: [f32; 4],
    /// Normalization divisors per channel
    pub rgbw_max_lux_div: [f32; 4],
    /// Derived post-multipliers, `max_lux[i] / max_lux_div[i]`
    pub rgbw_lux_postmul: [f32; 4],
    /// Per-channel quadratic compensation polynomials, highest order first
    pub rgbw_poly: [[f32; 3]; 4],
    /// Weights combining captured R, G, B into the synthetic white sample
    pub grayscale_weights: [f32; 3],
    /// Ascending gain-estimate thresholds, in lockstep with the tiers
    pub sensor_gaincal_points: [f32; 4],
    /// Per-tier inverse sensor gain, tier 0 = base gain
    pub sensor_inverse_gain: [f32; 4],
    /// Corrected-lux threshold above which AGC tier selection runs
    pub agc_threshold: f32,
    /// Global calibration gain multiplier
    pub calib_gain: f32,
    /// Fixed offset removed from every raw reading
    pub bias: f32,
    /// Maximum representable display brightness
    pub max_brightness: f32,
    /// Secondary channel is high-bit-rate
    pub hbr: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            rgbw_max_lux: [0.0; 4],
            rgbw_max_lux_div: [1.0; 4],
            rgbw_lux_postmul: [0.0; 4],
            rgbw_poly: [[0.0; 3]; 4],
            grayscale_weights: [0.0; 3],
            sensor_gaincal_points: [0.0; 4],
            sensor_inverse_gain: [0.0; 4],
            agc_threshold: f32::INFINITY,
            calib_gain: 1.0,
            bias: 0.0,
            max_brightness: DEFAULT_MAX_BRIGHTNESS,
            hbr: false,
        }
    }
}

impl CalibrationConfig {
    /// Merge the document calibration with runtime device values.
    ///
    /// Merge rules:
    /// - nonzero per-channel max lux in `overrides` replaces the document
    ///   value, with post-multipliers recomputed afterwards;
    /// - nonzero `row_coe` replaces the base inverse gain
    ///   (`row_coe / 1000`); the AGC threshold is `800 /` base gain;
    /// - positive `cali_coe` (overrides win over the document) sets
    ///   `calib_gain = cali_coe / 1000`, otherwise 1.0;
    /// - `max_brightness` falls back to 1023 when unreported.
    pub fn load(raw: &RawCalibration, overrides: &CalibrationOverrides) -> Self {
        let mut config = Self {
            rgbw_max_lux_div: raw.max_lux_div,
            rgbw_poly: [
                raw.channels[0].comp,
                raw.channels[1].comp,
                raw.channels[2].comp,
                raw.channels[3].comp,
            ],
            grayscale_weights: raw.grayscale_weights,
            sensor_gaincal_points: raw.gaincal_points,
            // Document levels map to tiers in reverse order
            sensor_inverse_gain: [
                raw.inverse_gain_levels[3],
                raw.inverse_gain_levels[2],
                raw.inverse_gain_levels[1],
                raw.inverse_gain_levels[0],
            ],
            hbr: raw.hbr,
            ..Self::default()
        };

        for i in 0..4 {
            config.rgbw_max_lux[i] = if overrides.rgbw_max_lux[i] != 0.0 {
                overrides.rgbw_max_lux[i]
            } else {
                raw.channels[i].max_lux
            };
            // A zero divisor would blow up the post-multiplier; treat it
            // as the document omitting the field
            if config.rgbw_max_lux_div[i] == 0.0 {
                config.rgbw_max_lux_div[i] = 1.0;
            }
        }
        config.recompute_postmul();
        log_info!(
            "Display maximums: R={:.0} G={:.0} B={:.0} W={:.0}",
            config.rgbw_max_lux[0],
            config.rgbw_max_lux[1],
            config.rgbw_max_lux[2],
            config.rgbw_max_lux[3]
        );

        if overrides.row_coe != 0.0 {
            config.sensor_inverse_gain[0] = overrides.row_coe / COEFFICIENT_SCALE;
        }
        config.agc_threshold = AGC_THRESHOLD_NUMERATOR / config.sensor_inverse_gain[0];

        let cali_coe = if overrides.cali_coe > 0.0 {
            overrides.cali_coe
        } else {
            raw.cal_coe
        };
        config.calib_gain = if cali_coe > 0.0 {
            cali_coe / COEFFICIENT_SCALE
        } else {
            1.0
        };
        log_info!(
            "Calibrated sensor gain: {:.2}x",
            1.0 / (config.calib_gain * config.sensor_inverse_gain[0])
        );

        config.bias = overrides.bias;
        config.max_brightness = if overrides.max_brightness > 0.0 {
            overrides.max_brightness
        } else {
            DEFAULT_MAX_BRIGHTNESS
        };

        config
    }

    /// Replace one channel's maximum lux, keeping post-multipliers in sync.
    pub fn set_max_lux(&mut self, channel: usize, max_lux: f32) {
        self.rgbw_max_lux[channel] = max_lux;
        self.recompute_postmul();
    }

    /// Recompute `rgbw_lux_postmul` from the current max-lux values.
    ///
    /// Must run whenever `rgbw_max_lux` changes; [`Self::load`] and
    /// [`Self::set_max_lux`] do so automatically.
    pub fn recompute_postmul(&mut self) {
        for i in 0..4 {
            self.rgbw_lux_postmul[i] = self.rgbw_max_lux[i] / self.rgbw_max_lux_div[i];
        }
    }

    /// Factor converting raw-sensor units into event units; the
    /// hysteresis table is rescaled by this exactly once at load time.
    pub fn raw_unit_gain(&self) -> f32 {
        self.calib_gain * self.sensor_inverse_gain[0]
    }

    /// Select the inverse gain for an AGC gain estimate: forward scan
    /// over the ascending calibration points, last match wins, base tier
    /// when no point is exceeded.
    pub fn select_inverse_gain(&self, estimate: f32) -> f32 {
        let mut gain = self.sensor_inverse_gain[0];
        for (point, &inverse_gain) in self
            .sensor_gaincal_points
            .iter()
            .zip(self.sensor_inverse_gain.iter())
        {
            if estimate > *point {
                gain = inverse_gain;
            }
        }
        gain
    }
}
