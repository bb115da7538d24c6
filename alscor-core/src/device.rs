//! Device Pseudo-File Value Providers
//!
//! Factory calibration and backlight state live in small pseudo-files
//! (one value per file) exported by the sensor and panel drivers. This
//! module reads them with per-value defaults: a missing or malformed file
//! never aborts the load, it just logs the [`ConfigError`] and leaves
//! that value at its default. The engine tolerates the resulting
//! partially populated calibration without crashing.
//!
//! Paths are injected so tests can point the providers at a temp
//! directory instead of `/proc` and `/sys`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::capture::BrightnessSource;
use crate::config::CalibrationOverrides;
use crate::constants::DEFAULT_MAX_BRIGHTNESS;
use crate::errors::{ConfigError, ConfigResult};

/// Read a single whitespace-trimmed value from `dir/name`.
pub fn read_value<T: FromStr>(dir: &Path, name: &'static str) -> ConfigResult<T> {
    let contents = fs::read_to_string(dir.join(name)).map_err(|err| match err.kind() {
        ErrorKind::NotFound => ConfigError::MissingField { field: name },
        _ => ConfigError::SourceUnavailable { reason: name },
    })?;
    contents
        .trim()
        .parse()
        .map_err(|_| ConfigError::MalformedValue { field: name })
}

/// Read a value, falling back to `default` on any failure.
///
/// Failures are logged at debug level; an absent file is the common case
/// on devices without factory calibration for that value.
pub fn read_or_default<T: FromStr + Copy>(dir: &Path, name: &'static str, default: T) -> T {
    match read_value(dir, name) {
        Ok(value) => value,
        Err(err) => {
            log::debug!("calibration value {}: {}", name, err);
            default
        }
    }
}

/// Per-channel max-lux file names, in R, G, B, W order.
const MAX_LUX_FILES: [&str; 4] = [
    "red_max_lux",
    "green_max_lux",
    "blue_max_lux",
    "white_max_lux",
];

impl CalibrationOverrides {
    /// Read runtime calibration values from the sensor calibration
    /// directory and the backlight directory.
    ///
    /// Absent values stay at their "keep the document default" zero,
    /// except `max_brightness` which falls back to 1023.
    pub fn from_device(cali_dir: &Path, backlight_dir: &Path) -> Self {
        let mut overrides = Self {
            row_coe: read_or_default(cali_dir, "row_coe", 0.0),
            cali_coe: read_or_default(cali_dir, "cali_coe", 0.0),
            rgbw_max_lux: [0.0; 4],
            bias: read_or_default(cali_dir, "bias", 0.0),
            max_brightness: read_or_default(
                backlight_dir,
                "max_brightness",
                DEFAULT_MAX_BRIGHTNESS,
            ),
        };
        for (value, name) in overrides.rgbw_max_lux.iter_mut().zip(MAX_LUX_FILES) {
            *value = read_or_default(cali_dir, name, 0.0);
        }
        log::info!(
            "device calibration: row_coe={} cali_coe={} max_brightness={}",
            overrides.row_coe,
            overrides.cali_coe,
            overrides.max_brightness
        );
        overrides
    }
}

/// Brightness source backed by the backlight driver's pseudo-file.
///
/// Reads on every query; the backlight changes constantly and the file
/// is a cheap kernel-backed read.
#[derive(Debug, Clone)]
pub struct FileBrightnessSource {
    backlight_dir: PathBuf,
}

impl FileBrightnessSource {
    /// Point at a backlight directory containing a `brightness` file.
    pub fn new(backlight_dir: &Path) -> Self {
        Self {
            backlight_dir: backlight_dir.to_path_buf(),
        }
    }
}

impl BrightnessSource for FileBrightnessSource {
    fn brightness(&self) -> f32 {
        // Unreadable backlight reads as "screen off"
        read_or_default(&self.backlight_dir, "brightness", 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn read_value_classifies_failures() {
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(
            read_value::<f32>(dir.path(), "absent"),
            Err(ConfigError::MissingField { field: "absent" })
        );

        write(dir.path(), "garbage", "not a number");
        assert_eq!(
            read_value::<f32>(dir.path(), "garbage"),
            Err(ConfigError::MalformedValue { field: "garbage" })
        );

        write(dir.path(), "value", " 1250 \n");
        assert_eq!(read_value::<f32>(dir.path(), "value"), Ok(1250.0));
    }

    #[test]
    fn read_or_default_falls_back() {
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(read_or_default(dir.path(), "absent", 7.5f32), 7.5);

        write(dir.path(), "garbage", "xyz");
        assert_eq!(read_or_default(dir.path(), "garbage", 3.0f32), 3.0);
    }

    #[test]
    fn overrides_from_device_files() {
        let cali = tempfile::tempdir().unwrap();
        let backlight = tempfile::tempdir().unwrap();

        write(cali.path(), "row_coe", "610");
        write(cali.path(), "cali_coe", "1005");
        write(cali.path(), "white_max_lux", "520");
        write(backlight.path(), "max_brightness", "2047");

        let overrides = CalibrationOverrides::from_device(cali.path(), backlight.path());
        assert_eq!(overrides.row_coe, 610.0);
        assert_eq!(overrides.cali_coe, 1005.0);
        assert_eq!(overrides.rgbw_max_lux, [0.0, 0.0, 0.0, 520.0]);
        assert_eq!(overrides.bias, 0.0);
        assert_eq!(overrides.max_brightness, 2047.0);
    }

    #[test]
    fn missing_calibration_directory_yields_defaults() {
        let empty = tempfile::tempdir().unwrap();
        let overrides = CalibrationOverrides::from_device(
            &empty.path().join("nope"),
            &empty.path().join("nope"),
        );
        assert_eq!(overrides, CalibrationOverrides::default());
    }

    #[test]
    fn file_brightness_source_reads_each_query() {
        let backlight = tempfile::tempdir().unwrap();
        let source = FileBrightnessSource::new(backlight.path());

        // No file yet: screen off
        assert_eq!(source.brightness(), 0.0);

        write(backlight.path(), "brightness", "512");
        assert_eq!(source.brightness(), 512.0);

        write(backlight.path(), "brightness", "0");
        assert_eq!(source.brightness(), 0.0);
    }
}
