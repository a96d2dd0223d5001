//! Shared fakes for unit tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use embedded_hal::i2c::{ErrorType, I2c, Operation};

use crate::clock::Clock;

/// An I2C bus fake that remembers the last byte written to each address and
/// serves it back on reads.  Clones share the same storage, so one bus can be
/// handed to several device drivers, like a shared physical bus.
#[derive(Clone)]
pub(crate) struct FakeBus {
    ports: Rc<RefCell<[u8; 128]>>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self {
            // PCF8574 power-on state: all pins released (reads as all-ones).
            ports: Rc::new(RefCell::new([0xff; 128])),
        }
    }

    pub fn stored(&self, addr: u8) -> u8 {
        self.ports.borrow()[addr as usize]
    }

    pub fn store(&self, addr: u8, value: u8) {
        self.ports.borrow_mut()[addr as usize] = value;
    }
}

impl ErrorType for FakeBus {
    type Error = core::convert::Infallible;
}

impl I2c for FakeBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    if let Some(&value) = bytes.last() {
                        self.ports.borrow_mut()[address as usize] = value;
                    }
                }
                Operation::Read(buffer) => {
                    let value = self.ports.borrow()[address as usize];
                    for b in buffer.iter_mut() {
                        *b = value;
                    }
                }
            }
        }
        Ok(())
    }
}

/// A clock that only moves when told to.  Clones share the same instant.
#[derive(Clone)]
pub(crate) struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(now_ms)),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::Relaxed);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}
