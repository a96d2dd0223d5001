//! The I/O point surface served to the field-protocol layer.
//!
//! All reads come from the [`IoCache`] and return in sub-millisecond time.
//! Output writes go through to the hardware first and then update the cache
//! synchronously, stamped with the current time on both timestamps since the
//! write just happened.
//!
//! Bootstrap order: create the cache, wire up
//! [`start_polling`](crate::start_polling), let the first polls settle, then
//! accept server traffic.

use std::sync::Arc;

use crate::cache::{IoCache, Reading};
use crate::clock::{Clock, StdClock};
use crate::dev::pcf8574::Driver;
use crate::discrete::DiscreteIo;
use crate::{I2cBus, PortMutex};

/// Read/write facade over the cache and the discrete-output write-through
/// path.
pub struct IoPoints<M, C = StdClock> {
    cache: Arc<IoCache<C>>,
    discrete: Arc<DiscreteIo<M>>,
}

impl<M, C: Clock> IoPoints<M, C> {
    pub fn new(cache: Arc<IoCache<C>>, discrete: Arc<DiscreteIo<M>>) -> Self {
        Self { cache, discrete }
    }

    /// Cached 16-bit discrete-input word.
    pub fn discrete_inputs(&self) -> Reading<u16> {
        self.cache.discrete_inputs()
    }

    /// Cached 16-bit discrete-output word.
    pub fn discrete_outputs(&self) -> Reading<u16> {
        self.cache.discrete_outputs()
    }

    /// Cached temperature in °C, `None` until the channel delivered once.
    pub fn temperature(&self, channel: usize) -> Option<Reading<f32>> {
        self.cache.temperature(channel)
    }

    /// Cached analog value, `None` until the channel delivered once.
    pub fn analog(&self, channel: usize) -> Option<Reading<f32>> {
        self.cache.analog(channel)
    }

    /// Drive the output word to the hardware, then update the cache.
    ///
    /// The hardware write happens outside any cache lock; only after it
    /// succeeds is the cache touched, so a bus fault never leaves the cache
    /// claiming a state the hardware is not in.
    pub fn write_discrete_outputs<I2C>(&self, word: u16) -> Result<(), I2C::BusError>
    where
        I2C: I2cBus,
        M: PortMutex<Port = Driver<I2C>>,
    {
        self.discrete.write_outputs(word)?;
        let now = self.cache.now_ms();
        self.cache.update_discrete_outputs(word, now);
        Ok(())
    }
}
