//! Monotonic millisecond clock seam.
//!
//! All cache timestamps come from one clock so that the
//! `server_ts >= source_ts` invariant holds without cross-clock skew.  The
//! seam exists so tests can substitute a manual clock.

/// A monotonic millisecond counter.
///
/// Implementations must never go backwards; the epoch is arbitrary.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Milliseconds elapsed since the clock was created, backed by
/// [`std::time::Instant`].
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    start: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
