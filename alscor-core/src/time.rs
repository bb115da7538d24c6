//! Time sources for the correction engine
//!
//! The rate limiter and forced-update timer need a monotonic millisecond
//! clock. The abstraction mirrors what sensor HALs provide (boot-time
//! clock) while letting tests drive time deterministically.

/// Timestamp in milliseconds since device boot.
pub type Timestamp = u64;

/// Source of monotonic time for the engine.
pub trait TimeSource {
    /// Get current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// System clock backed by `std::time::Instant` (monotonic).
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl SystemClock {
    pub fn new() -> Self {
        Self { origin: std::time::Instant::now() }
    }
}

#[cfg(feature = "std")]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }
}

/// Fixed time source for testing.
///
/// Interior mutability so the engine can hold it by value while the test
/// advances time between events.
#[derive(Debug)]
pub struct FixedClock {
    timestamp: core::cell::Cell<Timestamp>,
}

impl FixedClock {
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp: core::cell::Cell::new(timestamp) }
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.set(timestamp);
    }

    pub fn advance(&self, ms: u64) {
        self.timestamp.set(self.timestamp.get() + ms);
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> Timestamp {
        self.timestamp.get()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
