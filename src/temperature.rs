//! Fallback policy for a flaky temperature channel.
//!
//! A single failed 1-Wire transaction is almost always transient (a missed
//! presence pulse, a corrupted scratchpad) and the physical quantity moves
//! slowly, so the last good value is a better answer than no answer.  Only
//! after [`MAX_CONSECUTIVE_ERRORS`] back-to-back failures is the channel
//! reported as faulted, so downstream logic can alarm on a dead sensor
//! instead of trusting a frozen value.

use core::fmt::Debug;

use log::warn;

/// Scalar stand-in for [`TempReading::Fault`] at boundaries that can only
/// carry a number, far outside the sensor's -55..+125 °C operating range.
pub const FAULT_TEMPERATURE_C: f32 = -1000.0;

/// Failures in a row before the channel is reported as faulted.
pub const MAX_CONSECUTIVE_ERRORS: u8 = 3;

/// Anything that can produce a temperature in °C.
pub trait TemperatureSensor {
    type Error;

    fn read_celsius(&mut self) -> Result<f32, Self::Error>;
}

/// Outcome of one policy-filtered read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TempReading {
    /// The sensor answered; the value was measured just now.
    Fresh(f32),
    /// The sensor failed; this is the most recent good value.
    LastGood(f32),
    /// The sensor has failed [`MAX_CONSECUTIVE_ERRORS`] times in a row.
    Fault,
}

impl TempReading {
    /// Collapse to a scalar, mapping [`TempReading::Fault`] to
    /// [`FAULT_TEMPERATURE_C`].
    pub fn celsius(self) -> f32 {
        match self {
            TempReading::Fresh(t) | TempReading::LastGood(t) => t,
            TempReading::Fault => FAULT_TEMPERATURE_C,
        }
    }

    pub fn is_fault(self) -> bool {
        matches!(self, TempReading::Fault)
    }
}

/// One temperature channel: a sensor plus its error-recovery state.
///
/// Owns the consecutive-error counter and the last good value, so isolated
/// instances can be created per channel (and per test).
pub struct TempChannel<S> {
    sensor: S,
    consecutive_errors: u8,
    last_good: f32,
}

impl<S> TempChannel<S>
where
    S: TemperatureSensor,
    S::Error: Debug,
{
    /// Before the first successful read the fallback value is 0.0 °C.
    pub fn new(sensor: S) -> Self {
        Self {
            sensor,
            consecutive_errors: 0,
            last_good: 0.0,
        }
    }

    /// Read the sensor once and apply the fallback policy.
    ///
    /// A success resets the error counter and becomes the new fallback value.
    pub fn read(&mut self) -> TempReading {
        match self.sensor.read_celsius() {
            Ok(t) => {
                self.consecutive_errors = 0;
                self.last_good = t;
                TempReading::Fresh(t)
            }
            Err(err) => {
                self.consecutive_errors = self.consecutive_errors.saturating_add(1);
                warn!(
                    "temperature read failed ({:?}), {} consecutive errors",
                    err, self.consecutive_errors
                );
                if self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    TempReading::Fault
                } else {
                    TempReading::LastGood(self.last_good)
                }
            }
        }
    }

    pub fn into_inner(self) -> S {
        self.sensor
    }
}
