//! Sensor Event Record
//!
//! The engine mutates events in place: the primary scalar is replaced with
//! the corrected lux value, and events the engine decides to suppress are
//! marked by clearing the handle to [`INVALID_SENSOR_HANDLE`]. Downstream
//! consumers must check [`SensorEvent::is_valid`] before delivering an
//! event.
//!
//! Events are plain stack records with no heap data so they can be passed
//! through interrupt-driven delivery paths unchanged.

use crate::time::Timestamp;

/// Handle value marking an event as dropped.
pub const INVALID_SENSOR_HANDLE: i32 = -1;

/// Number of auxiliary data channels carried alongside the primary scalar.
pub const AUX_CHANNELS: usize = 16;

/// Index of the secondary intensity channel used for AGC tier selection.
pub const AGC_CHANNEL: usize = 2;

/// A single light-sensor event, mutated in place by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorEvent {
    /// Identifies the originating sensor; cleared to signal "do not deliver"
    pub sensor_handle: i32,
    /// Primary reading: raw lux on entry, corrected lux on exit
    pub scalar: f32,
    /// Auxiliary channels; index [`AGC_CHANNEL`] carries the secondary
    /// intensity used for gain estimation
    pub data: [f32; AUX_CHANNELS],
    /// Event timestamp in milliseconds (boot-time clock)
    pub timestamp: Timestamp,
}

impl SensorEvent {
    /// Create an event with a raw scalar reading and zeroed aux channels.
    pub fn new(sensor_handle: i32, scalar: f32, timestamp: Timestamp) -> Self {
        Self {
            sensor_handle,
            scalar,
            data: [0.0; AUX_CHANNELS],
            timestamp,
        }
    }

    /// Secondary intensity channel feeding AGC gain estimation.
    pub fn agc_channel(&self) -> f32 {
        self.data[AGC_CHANNEL]
    }

    /// Mark this event as dropped.
    ///
    /// Consumers treat an invalid handle as "discard, do not forward".
    pub fn invalidate(&mut self) {
        self.sensor_handle = INVALID_SENSOR_HANDLE;
    }

    /// Whether the event should still be delivered downstream.
    pub fn is_valid(&self) -> bool {
        self.sensor_handle != INVALID_SENSOR_HANDLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_fits_on_stack() {
        // Delivery paths copy events; keep them cache-friendly
        assert!(core::mem::size_of::<SensorEvent>() <= 128);
    }

    #[test]
    fn invalidate_clears_handle() {
        let mut event = SensorEvent::new(7, 120.0, 1000);
        assert!(event.is_valid());

        event.invalidate();
        assert!(!event.is_valid());
        assert_eq!(event.sensor_handle, INVALID_SENSOR_HANDLE);
    }

    #[test]
    fn agc_channel_reads_index_two() {
        let mut event = SensorEvent::new(1, 50.0, 0);
        event.data[AGC_CHANNEL] = 42.0;
        assert_eq!(event.agc_channel(), 42.0);
    }
}
