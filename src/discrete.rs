//! Composition of four 8-bit expander banks into one 16-bit input word and
//! one 16-bit output word.
//!
//! The expanders are wired active-low: an energized input reads as 0 and a 0
//! written to an output bank energizes the load.  Everything above this
//! module works with active-high words; the inversion happens here and only
//! here.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::dev::pcf8574::{Driver, Pcf8574};
use crate::{I2cBus, PortMutex};

/// Four expander banks presented as 16-bit active-high input/output words.
///
/// Bank layout: `in1`/`out1` carry bits 0..=7, `in2`/`out2` carry bits
/// 8..=15.
///
/// The single-bit accessors are read-modify-write sequences and are *not*
/// atomic across the read-then-write gap.  With one writer (the usual
/// write-through path from a protocol server) that is fine; multiple
/// concurrent writers need their own lock around this struct.
pub struct DiscreteIo<M> {
    in1: Pcf8574<M>,
    in2: Pcf8574<M>,
    out1: Pcf8574<M>,
    out2: Pcf8574<M>,
    initialized: AtomicBool,
}

impl<I2C, M> DiscreteIo<M>
where
    I2C: I2cBus,
    M: PortMutex<Port = Driver<I2C>>,
{
    /// Bind the four banks.  No bus traffic happens here; the output banks
    /// are driven to their safe state on first access (or an explicit
    /// [`DiscreteIo::init`]).
    pub fn new(in1: Pcf8574<M>, in2: Pcf8574<M>, out1: Pcf8574<M>, out2: Pcf8574<M>) -> Self {
        Self {
            in1,
            in2,
            out1,
            out2,
            initialized: AtomicBool::new(false),
        }
    }

    /// Drive both output banks to all-ones, which de-energizes every load on
    /// the active-low hardware.
    ///
    /// Idempotent; every accessor calls this lazily.  A racing second
    /// initializer at worst repeats the safe-state write.
    pub fn init(&self) -> Result<(), I2C::BusError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        self.out1.write_port(0xff)?;
        self.out2.write_port(0xff)?;
        self.initialized.store(true, Ordering::Release);
        log::info!("discrete I/O initialized, outputs driven to safe state");
        Ok(())
    }

    /// Sample all 16 inputs, active-high.
    pub fn read_inputs(&self) -> Result<u16, I2C::BusError> {
        self.init()?;
        let low = !self.in1.read_port()?;
        let high = !self.in2.read_port()?;
        Ok(u16::from(high) << 8 | u16::from(low))
    }

    /// Drive all 16 outputs from an active-high word.
    pub fn write_outputs(&self, word: u16) -> Result<(), I2C::BusError> {
        self.init()?;
        self.out1.write_port(!(word as u8))?;
        self.out2.write_port(!((word >> 8) as u8))?;
        Ok(())
    }

    /// Read the output word back from the hardware, active-high.
    ///
    /// Output pins read back their driven level, so this reflects what the
    /// banks actually latch, not a shadow copy.
    pub fn outputs(&self) -> Result<u16, I2C::BusError> {
        self.init()?;
        let low = !self.out1.read_port()?;
        let high = !self.out2.read_port()?;
        Ok(u16::from(high) << 8 | u16::from(low))
    }

    /// Set or clear a single output bit, leaving the remaining 15 untouched.
    ///
    /// Read-modify-write; see the type-level note on concurrent writers.
    pub fn set_output_bit(&self, bit: u8, state: bool) -> Result<(), I2C::BusError> {
        assert!(bit < 16);
        let mut word = self.outputs()?;
        if state {
            word |= 1 << bit;
        } else {
            word &= !(1 << bit);
        }
        self.write_outputs(word)
    }

    /// Sample a single input bit.
    pub fn input_bit(&self, bit: u8) -> Result<bool, I2C::BusError> {
        assert!(bit < 16);
        Ok(self.read_inputs()? & (1 << bit) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::FakeBus;

    use core::cell::RefCell;

    const IN1: u8 = 0x22;
    const IN2: u8 = 0x21;
    const OUT1: u8 = 0x24;
    const OUT2: u8 = 0x25;

    fn composer(bus: &FakeBus) -> DiscreteIo<RefCell<Driver<FakeBus>>> {
        DiscreteIo::new(
            Pcf8574::new(bus.clone(), false, true, false), // 0x22
            Pcf8574::new(bus.clone(), true, false, false), // 0x21
            Pcf8574::new(bus.clone(), false, false, true), // 0x24
            Pcf8574::new(bus.clone(), true, false, true),  // 0x25
        )
    }

    #[test]
    fn init_drives_outputs_to_safe_state() {
        let bus = FakeBus::new();
        bus.store(OUT1, 0x00);
        bus.store(OUT2, 0x00);

        let dio = composer(&bus);
        dio.init().unwrap();

        assert_eq!(bus.stored(OUT1), 0xff);
        assert_eq!(bus.stored(OUT2), 0xff);
    }

    #[test]
    fn output_word_roundtrip() {
        let bus = FakeBus::new();
        let dio = composer(&bus);

        dio.write_outputs(0xabcd).unwrap();

        // Active-low bytes on the wire, low bank first.
        assert_eq!(bus.stored(OUT1), !0xcd);
        assert_eq!(bus.stored(OUT2), !0xab);
        assert_eq!(dio.outputs().unwrap(), 0xabcd);
    }

    #[test]
    fn input_word_inverts_and_concatenates() {
        let bus = FakeBus::new();
        let dio = composer(&bus);

        bus.store(IN1, !0x34);
        bus.store(IN2, !0x12);

        assert_eq!(dio.read_inputs().unwrap(), 0x1234);
    }

    #[test]
    fn no_inputs_active_reads_zero() {
        let bus = FakeBus::new();
        let dio = composer(&bus);

        // Idle active-low banks sit at all-ones.
        assert_eq!(dio.read_inputs().unwrap(), 0x0000);
    }

    #[test]
    fn set_single_output_bit() {
        let bus = FakeBus::new();
        let dio = composer(&bus);

        dio.write_outputs(0x0000).unwrap();
        dio.set_output_bit(3, true).unwrap();

        assert_eq!(dio.outputs().unwrap(), 0x0008);

        dio.set_output_bit(3, false).unwrap();
        assert_eq!(dio.outputs().unwrap(), 0x0000);
    }

    #[test]
    fn bit_set_in_high_bank_leaves_low_bank_alone() {
        let bus = FakeBus::new();
        let dio = composer(&bus);

        dio.write_outputs(0x00f0).unwrap();
        dio.set_output_bit(12, true).unwrap();

        assert_eq!(dio.outputs().unwrap(), 0x10f0);
    }

    #[test]
    fn get_single_input_bit() {
        let bus = FakeBus::new();
        let dio = composer(&bus);

        bus.store(IN1, !0x08);
        assert!(dio.input_bit(3).unwrap());
        assert!(!dio.input_bit(4).unwrap());

        bus.store(IN2, !0x01);
        assert!(dio.input_bit(8).unwrap());
    }
}
