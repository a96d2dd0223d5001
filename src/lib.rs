//! Cached, polled access to a fixed set of field I/O points.
//!
//! The crate sits between slow field hardware (I2C port-expander banks for
//! discrete I/O, a bit-banged 1-Wire temperature sensor, caller-supplied
//! analog sampling) and a protocol server that must answer reads in
//! sub-millisecond time.  Periodic polling loops push fresh values into a
//! mutex-guarded [`IoCache`] with bounded lock waits; the server reads
//! last-known values plus source/server timestamps from the cache and writes
//! outputs through to hardware synchronously.
//!
//! The hardware drivers are `no_std` and generic over `embedded-hal` 1.0
//! traits.  The cache, clock, polling loops and points facade require the
//! `std` feature (enabled by default).

#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod bus;
#[cfg(feature = "std")]
mod cache;
mod clock;
mod common;
pub mod dev;
mod discrete;
mod mutex;
mod pin;
#[cfg(feature = "std")]
mod points;
#[cfg(feature = "std")]
mod poll;
mod temperature;

#[cfg(test)]
pub(crate) mod test_util;

pub use bus::I2cBus;
pub use clock::Clock;
pub use common::mode;
pub use dev::ds18b20::{crc8, Ds18b20, Ds18b20Error};
pub use dev::pcf8574::Pcf8574;
pub use discrete::DiscreteIo;
pub use mutex::PortMutex;
pub use pin::{Pin, PinError};
pub use temperature::{
    TempChannel, TempReading, TemperatureSensor, FAULT_TEMPERATURE_C, MAX_CONSECUTIVE_ERRORS,
};

pub(crate) use bus::I2cExt;
pub(crate) use common::PortDriver;

#[cfg(feature = "std")]
pub use cache::{IoCache, Reading, NUM_ANALOG_CHANNELS, NUM_TEMPERATURE_CHANNELS};
#[cfg(feature = "std")]
pub use clock::StdClock;
#[cfg(feature = "std")]
pub use points::IoPoints;
#[cfg(feature = "std")]
pub use poll::{start_polling, PollPeriods, Poller};
