//! Staleness-aware cache between the hardware polling loops and the protocol
//! server.
//!
//! One mutex guards all channel groups; it is only ever held for a value
//! copy, never across a hardware transaction.  Both sides acquire it with a
//! *bounded* wait and degrade instead of blocking:
//!
//! - readers wait at most 5 ms and fall back to a zero/default reading, so
//!   the server's latency guarantee holds even under contention;
//! - writers wait at most 20 ms and drop the update, which the next polling
//!   cycle supersedes.
//!
//! Every entry carries two timestamps: when the value was physically sampled
//! (`source_ts_ms`, supplied by the caller) and when the cache entry was
//! written (`server_ts_ms`, stamped here).  The gap between them is the
//! staleness a consumer actually observes.

use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::clock::{Clock, StdClock};

pub const NUM_TEMPERATURE_CHANNELS: usize = 4;
pub const NUM_ANALOG_CHANNELS: usize = 4;

/// Reader lock wait; well under the external client's polling interval.
const GET_LOCK_WAIT: Duration = Duration::from_millis(5);
/// Writer lock wait; the polling tasks tolerate a brief block.
const UPDATE_LOCK_WAIT: Duration = Duration::from_millis(20);

/// A cached value with its sampling and cache-write timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reading<T> {
    pub value: T,
    /// Monotonic ms at the moment the hardware was sampled.
    pub source_ts_ms: u64,
    /// Monotonic ms at the moment the cache entry was written.
    pub server_ts_ms: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct WordGroup {
    value: u16,
    source_ts_ms: u64,
    server_ts_ms: u64,
}

impl WordGroup {
    fn reading(&self) -> Reading<u16> {
        Reading {
            value: self.value,
            source_ts_ms: self.source_ts_ms,
            server_ts_ms: self.server_ts_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ChannelGroup {
    value: f32,
    valid: bool,
    source_ts_ms: u64,
    server_ts_ms: u64,
}

impl ChannelGroup {
    fn reading(&self) -> Option<Reading<f32>> {
        self.valid.then_some(Reading {
            value: self.value,
            source_ts_ms: self.source_ts_ms,
            server_ts_ms: self.server_ts_ms,
        })
    }
}

#[derive(Default)]
struct State {
    inputs: WordGroup,
    outputs: WordGroup,
    temperatures: [ChannelGroup; NUM_TEMPERATURE_CHANNELS],
    analogs: [ChannelGroup; NUM_ANALOG_CHANNELS],
}

/// Last-known values for every channel group, with bounded-wait access.
pub struct IoCache<C = StdClock> {
    state: Mutex<State>,
    clock: C,
}

impl IoCache<StdClock> {
    pub fn new() -> Self {
        Self::with_clock(StdClock::new())
    }
}

impl Default for IoCache<StdClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> IoCache<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock,
        }
    }

    /// The cache's own monotonic clock, for callers that stamp their own
    /// source timestamps (e.g. the synchronous output write-through).
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Last-known discrete-input word.
    ///
    /// Returns an all-zero default if the lock cannot be taken within the
    /// read bound; callers must tolerate the occasional stale-default read.
    pub fn discrete_inputs(&self) -> Reading<u16> {
        match self.state.try_lock_for(GET_LOCK_WAIT) {
            Some(state) => state.inputs.reading(),
            None => {
                debug!("discrete-inputs read timed out on cache lock, returning default");
                Reading::default()
            }
        }
    }

    /// Last-known discrete-output word, with the same degradation as
    /// [`IoCache::discrete_inputs`].
    pub fn discrete_outputs(&self) -> Reading<u16> {
        match self.state.try_lock_for(GET_LOCK_WAIT) {
            Some(state) => state.outputs.reading(),
            None => {
                debug!("discrete-outputs read timed out on cache lock, returning default");
                Reading::default()
            }
        }
    }

    /// Last-known temperature for `channel`, or `None` while the channel has
    /// never been updated (or on lock timeout / bad index).
    pub fn temperature(&self, channel: usize) -> Option<Reading<f32>> {
        if channel >= NUM_TEMPERATURE_CHANNELS {
            return None;
        }
        match self.state.try_lock_for(GET_LOCK_WAIT) {
            Some(state) => state.temperatures[channel].reading(),
            None => {
                debug!("temperature read timed out on cache lock");
                None
            }
        }
    }

    /// Last-known analog value for `channel`; same contract as
    /// [`IoCache::temperature`].
    pub fn analog(&self, channel: usize) -> Option<Reading<f32>> {
        if channel >= NUM_ANALOG_CHANNELS {
            return None;
        }
        match self.state.try_lock_for(GET_LOCK_WAIT) {
            Some(state) => state.analogs[channel].reading(),
            None => {
                debug!("analog read timed out on cache lock");
                None
            }
        }
    }

    /// Store a freshly sampled input word.  Returns `false` if the update was
    /// dropped because the lock stayed contended past the write bound; the
    /// next polling cycle supersedes it.
    pub fn update_discrete_inputs(&self, value: u16, source_ts_ms: u64) -> bool {
        match self.state.try_lock_for(UPDATE_LOCK_WAIT) {
            Some(mut state) => {
                state.inputs = WordGroup {
                    value,
                    source_ts_ms,
                    server_ts_ms: self.clock.now_ms(),
                };
                true
            }
            None => {
                warn!("discrete-inputs update dropped, cache lock contended");
                false
            }
        }
    }

    pub fn update_discrete_outputs(&self, value: u16, source_ts_ms: u64) -> bool {
        match self.state.try_lock_for(UPDATE_LOCK_WAIT) {
            Some(mut state) => {
                state.outputs = WordGroup {
                    value,
                    source_ts_ms,
                    server_ts_ms: self.clock.now_ms(),
                };
                true
            }
            None => {
                warn!("discrete-outputs update dropped, cache lock contended");
                false
            }
        }
    }

    /// Store a temperature sample and mark the channel valid.
    pub fn update_temperature(&self, channel: usize, value: f32, source_ts_ms: u64) -> bool {
        if channel >= NUM_TEMPERATURE_CHANNELS {
            return false;
        }
        match self.state.try_lock_for(UPDATE_LOCK_WAIT) {
            Some(mut state) => {
                state.temperatures[channel] = ChannelGroup {
                    value,
                    valid: true,
                    source_ts_ms,
                    server_ts_ms: self.clock.now_ms(),
                };
                true
            }
            None => {
                warn!("temperature update dropped, cache lock contended");
                false
            }
        }
    }

    /// Store an analog sample and mark the channel valid.
    pub fn update_analog(&self, channel: usize, value: f32, source_ts_ms: u64) -> bool {
        if channel >= NUM_ANALOG_CHANNELS {
            return false;
        }
        match self.state.try_lock_for(UPDATE_LOCK_WAIT) {
            Some(mut state) => {
                state.analogs[channel] = ChannelGroup {
                    value,
                    valid: true,
                    source_ts_ms,
                    server_ts_ms: self.clock.now_ms(),
                };
                true
            }
            None => {
                warn!("analog update dropped, cache lock contended");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::ManualClock;

    #[test]
    fn update_then_get_returns_value_and_stamps_server_time() {
        let clock = ManualClock::new(100);
        let cache = IoCache::with_clock(clock.clone());

        clock.set(150);
        assert!(cache.update_discrete_inputs(0x00ff, 120));

        let r = cache.discrete_inputs();
        assert_eq!(r.value, 0x00ff);
        assert_eq!(r.source_ts_ms, 120);
        assert_eq!(r.server_ts_ms, 150);
        assert!(r.server_ts_ms >= r.source_ts_ms);
    }

    #[test]
    fn input_and_output_groups_are_independent() {
        let clock = ManualClock::new(0);
        let cache = IoCache::with_clock(clock.clone());

        cache.update_discrete_inputs(0x1111, 1);
        clock.advance(10);
        cache.update_discrete_outputs(0x2222, 11);

        assert_eq!(cache.discrete_inputs().value, 0x1111);
        assert_eq!(cache.discrete_outputs().value, 0x2222);
        assert_eq!(cache.discrete_inputs().server_ts_ms, 0);
        assert_eq!(cache.discrete_outputs().server_ts_ms, 10);
    }

    #[test]
    fn timestamps_are_monotonic_across_updates() {
        let clock = ManualClock::new(0);
        let cache = IoCache::with_clock(clock.clone());

        let mut previous = cache.discrete_inputs();
        for step in 1..=5u64 {
            clock.advance(7);
            cache.update_discrete_inputs(step as u16, step * 7);
            let current = cache.discrete_inputs();
            assert!(current.source_ts_ms >= previous.source_ts_ms);
            assert!(current.server_ts_ms >= previous.server_ts_ms);
            previous = current;
        }
    }

    #[test]
    fn temperature_channel_invalid_until_first_update() {
        let clock = ManualClock::new(50);
        let cache = IoCache::with_clock(clock.clone());

        assert!(cache.temperature(0).is_none());

        assert!(cache.update_temperature(0, 21.5, 40));
        let r = cache.temperature(0).unwrap();
        assert_eq!(r.value, 21.5);
        assert_eq!(r.source_ts_ms, 40);
        assert_eq!(r.server_ts_ms, 50);

        // Other channels stay invalid.
        assert!(cache.temperature(1).is_none());
    }

    #[test]
    fn analog_channel_invalid_until_first_update() {
        let cache = IoCache::with_clock(ManualClock::new(0));

        assert!(cache.analog(2).is_none());
        assert!(cache.update_analog(2, 1023.0, 0));
        assert_eq!(cache.analog(2).unwrap().value, 1023.0);
        assert!(cache.analog(3).is_none());
    }

    #[test]
    fn out_of_range_channels_are_rejected() {
        let cache = IoCache::with_clock(ManualClock::new(0));

        assert!(!cache.update_temperature(NUM_TEMPERATURE_CHANNELS, 1.0, 0));
        assert!(!cache.update_analog(NUM_ANALOG_CHANNELS, 1.0, 0));
        assert!(cache.temperature(NUM_TEMPERATURE_CHANNELS).is_none());
        assert!(cache.analog(NUM_ANALOG_CHANNELS).is_none());
    }

    #[test]
    fn reader_degrades_to_default_under_contention() {
        let cache = IoCache::with_clock(ManualClock::new(0));
        cache.update_discrete_inputs(0xbeef, 0);

        let guard = cache.state.lock();
        // The bounded wait expires and the reader reports the default.
        let r = cache.discrete_inputs();
        assert_eq!(r.value, 0);
        assert!(cache.temperature(0).is_none());
        drop(guard);

        assert_eq!(cache.discrete_inputs().value, 0xbeef);
    }

    #[test]
    fn writer_drops_update_under_contention() {
        let cache = IoCache::with_clock(ManualClock::new(0));
        cache.update_discrete_inputs(0x0001, 0);

        let guard = cache.state.lock();
        assert!(!cache.update_discrete_inputs(0x0002, 1));
        drop(guard);

        // The dropped update left the previous value in place.
        assert_eq!(cache.discrete_inputs().value, 0x0001);
    }
}
