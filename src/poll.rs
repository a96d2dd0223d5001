//! Periodic polling loops feeding the [`IoCache`].
//!
//! One thread per channel group, so a stalled hardware transaction on one
//! group (a 1-Wire conversion takes about a second) never disturbs another
//! group's cadence.  Each loop checks its elapsed time against its period,
//! performs the slow hardware read outside any cache lock, then pushes the
//! value with its sampling timestamp.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{info, warn};

use crate::cache::{IoCache, NUM_ANALOG_CHANNELS};
use crate::clock::Clock;
use crate::temperature::TempReading;

/// Poll periods per channel group, plus the idle yield every loop sleeps
/// between cadence checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPeriods {
    /// Discrete inputs; short, digital state changes quickly and a bank read
    /// is cheap.
    pub inputs: Duration,
    /// Temperature; the conversion itself takes about a second and the
    /// quantity moves slowly.
    pub temperature: Duration,
    /// Analog channels.
    pub analog: Duration,
    /// Cooperative yield at the end of every loop iteration.
    pub idle: Duration,
}

impl Default for PollPeriods {
    fn default() -> Self {
        Self {
            inputs: Duration::from_millis(20),
            temperature: Duration::from_millis(1000),
            analog: Duration::from_millis(100),
            idle: Duration::from_millis(5),
        }
    }
}

/// Handle owning the polling threads.
///
/// Dropping the handle without calling [`Poller::stop`] detaches the loops;
/// they keep polling for the lifetime of the process, which is the normal
/// mode for firmware.
pub struct Poller {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Poller {
    /// Signal all loops to finish their current iteration and join them.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("polling thread panicked during shutdown");
            }
        }
        info!("io polling stopped");
    }
}

/// Spawn the three polling loops.
///
/// The sampling closures are the hardware seam:
///
/// - `inputs` returns the current active-high input word, or `None` on a bus
///   fault — the tick is skipped and the cached entry (including its
///   timestamps) stays as-is, so consumers can see the data age;
/// - `temperature` is polled for channel 0 and is expected to apply the
///   last-good/fault policy itself (see [`TempChannel`](crate::TempChannel));
///   every outcome is cached so the attempt is timestamped;
/// - `analog` is called once per channel per tick, `None` skips a channel.
///
/// Give the first polls one input period plus a little slack to settle
/// before accepting external reads, so clients never observe the initial
/// zero state.
pub fn start_polling<C, I, T, A>(
    cache: Arc<IoCache<C>>,
    periods: PollPeriods,
    inputs: I,
    temperature: T,
    analog: A,
) -> io::Result<Poller>
where
    C: Clock + Send + Sync + 'static,
    I: FnMut() -> Option<u16> + Send + 'static,
    T: FnMut() -> TempReading + Send + 'static,
    A: FnMut(usize) -> Option<f32> + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let mut poller = Poller {
        stop: Arc::clone(&stop),
        handles: Vec::with_capacity(3),
    };

    let spawned = (|| -> io::Result<()> {
        let mut read_inputs = inputs;
        poller.handles.push(spawn_loop(
            "io-poll-inputs",
            Arc::clone(&cache),
            Arc::clone(&stop),
            periods.inputs,
            periods.idle,
            move |cache| match read_inputs() {
                Some(word) => {
                    let ts = cache.now_ms();
                    cache.update_discrete_inputs(word, ts);
                }
                None => warn!("discrete-input read failed, keeping previous cache entry"),
            },
        )?);

        let mut read_temperature = temperature;
        poller.handles.push(spawn_loop(
            "io-poll-temperature",
            Arc::clone(&cache),
            Arc::clone(&stop),
            periods.temperature,
            periods.idle,
            move |cache| {
                let reading = read_temperature();
                if reading.is_fault() {
                    warn!("temperature channel 0 reports a persistent fault");
                }
                let ts = cache.now_ms();
                cache.update_temperature(0, reading.celsius(), ts);
            },
        )?);

        let mut read_analog = analog;
        poller.handles.push(spawn_loop(
            "io-poll-analog",
            Arc::clone(&cache),
            Arc::clone(&stop),
            periods.analog,
            periods.idle,
            move |cache| {
                for channel in 0..NUM_ANALOG_CHANNELS {
                    if let Some(value) = read_analog(channel) {
                        let ts = cache.now_ms();
                        cache.update_analog(channel, value, ts);
                    }
                }
            },
        )?);

        Ok(())
    })();

    match spawned {
        Ok(()) => {
            info!("io polling started ({} loops)", poller.handles.len());
            Ok(poller)
        }
        Err(err) => {
            // Tear down whatever already started before reporting.
            poller.stop();
            Err(err)
        }
    }
}

fn spawn_loop<C, F>(
    name: &str,
    cache: Arc<IoCache<C>>,
    stop: Arc<AtomicBool>,
    period: Duration,
    idle: Duration,
    mut body: F,
) -> io::Result<JoinHandle<()>>
where
    C: Clock + Send + Sync + 'static,
    F: FnMut(&IoCache<C>) + Send + 'static,
{
    let period_ms = period.as_millis() as u64;
    thread::Builder::new().name(name.into()).spawn(move || {
        let mut last_run = cache.now_ms();
        while !stop.load(Ordering::Relaxed) {
            let now = cache.now_ms();
            if now.saturating_sub(last_run) >= period_ms {
                body(&cache);
                last_run = now;
            }
            thread::sleep(idle);
        }
    })
}
