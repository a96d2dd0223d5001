//! Support for the `DS18B20` 1-Wire digital thermometer, as the single drop
//! on a dedicated GPIO line.
//!
//! The 1-Wire protocol is bit-banged: the master opens every time slot by
//! pulling the line low and the sensor (or the pull-up resistor) determines
//! what happens for the rest of the slot.  The pin is used in open-drain
//! fashion — `set_high` must *release* the line, never drive it high.
//!
//! The microsecond timings below are a hardware contract.  The delay provider
//! has to busy-wait: a preemptible sleep that overshoots a 6 µs slot by a
//! scheduler tick corrupts the bit stream.  Platforms without a non-yielding
//! microsecond delay cannot drive this device.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

// Reset / presence-detect slot.
const RESET_LOW_US: u32 = 480;
const RESET_SAMPLE_US: u32 = 70;
const RESET_TAIL_US: u32 = 410;

// Write slots, ~70 µs total each.
const WRITE_1_LOW_US: u32 = 6;
const WRITE_1_RELEASE_US: u32 = 64;
const WRITE_0_LOW_US: u32 = 60;
const WRITE_0_RELEASE_US: u32 = 10;

// Read slots, ~60 µs total each.  The sensor's output is only valid within
// the first 15 µs of the slot, so sample early.
const READ_INIT_US: u32 = 2;
const READ_SAMPLE_US: u32 = 10;
const READ_TAIL_US: u32 = 48;

// Worst-case 12-bit conversion time.
const CONVERSION_WAIT_MS: u32 = 1000;

const CMD_SKIP_ROM: u8 = 0xcc;
const CMD_CONVERT_T: u8 = 0x44;
const CMD_READ_SCRATCHPAD: u8 = 0xbe;

/// Length of the scratchpad register block, including the trailing CRC byte.
pub const SCRATCHPAD_LEN: usize = 9;

#[derive(Debug)]
pub enum Ds18b20Error<E> {
    /// GPIO access failed.
    Pin(E),
    /// No device answered the reset pulse with a presence pulse.
    NoPresence,
    /// The scratchpad CRC did not match its payload.
    CrcMismatch,
}

impl<E> From<E> for Ds18b20Error<E> {
    fn from(err: E) -> Self {
        Ds18b20Error::Pin(err)
    }
}

/// Driver for a single `DS18B20` on a dedicated line.
///
/// Addressing uses "skip ROM" throughout, so there must not be other devices
/// on the same line.
pub struct Ds18b20<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> Ds18b20<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }

    /// Send a reset pulse and report whether a device answered with a
    /// presence pulse.
    pub fn reset(&mut self) -> Result<bool, Ds18b20Error<P::Error>> {
        self.pin.set_low()?;
        self.delay.delay_us(RESET_LOW_US);

        self.pin.set_high()?;
        self.delay.delay_us(RESET_SAMPLE_US);

        // A present device holds the released line low.
        let present = self.pin.is_low()?;
        self.delay.delay_us(RESET_TAIL_US);

        Ok(present)
    }

    /// Run one full measurement: start a conversion, wait it out, read back
    /// the scratchpad and return the temperature in °C.
    pub fn read_temperature(&mut self) -> Result<f32, Ds18b20Error<P::Error>> {
        if !self.reset()? {
            return Err(Ds18b20Error::NoPresence);
        }
        self.write_byte(CMD_SKIP_ROM)?;
        self.write_byte(CMD_CONVERT_T)?;

        self.delay.delay_ms(CONVERSION_WAIT_MS);

        if !self.reset()? {
            return Err(Ds18b20Error::NoPresence);
        }
        self.write_byte(CMD_SKIP_ROM)?;
        self.write_byte(CMD_READ_SCRATCHPAD)?;

        let scratchpad = self.read_scratchpad()?;
        if crc8(&scratchpad[..SCRATCHPAD_LEN - 1]) != scratchpad[SCRATCHPAD_LEN - 1] {
            return Err(Ds18b20Error::CrcMismatch);
        }

        Ok(raw_to_celsius(scratchpad[0], scratchpad[1]))
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), Ds18b20Error<P::Error>> {
        self.pin.set_low()?;
        if bit {
            self.delay.delay_us(WRITE_1_LOW_US);
            self.pin.set_high()?;
            self.delay.delay_us(WRITE_1_RELEASE_US);
        } else {
            self.delay.delay_us(WRITE_0_LOW_US);
            self.pin.set_high()?;
            self.delay.delay_us(WRITE_0_RELEASE_US);
        }
        Ok(())
    }

    fn read_bit(&mut self) -> Result<bool, Ds18b20Error<P::Error>> {
        self.pin.set_low()?;
        self.delay.delay_us(READ_INIT_US);

        // Release before sampling, the sensor owns the rest of the slot.
        self.pin.set_high()?;
        self.delay.delay_us(READ_SAMPLE_US);

        let bit = self.pin.is_high()?;
        self.delay.delay_us(READ_TAIL_US);

        Ok(bit)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Ds18b20Error<P::Error>> {
        // LSB first.
        for i in 0..8 {
            self.write_bit((byte >> i) & 1 != 0)?;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, Ds18b20Error<P::Error>> {
        let mut byte = 0;
        // LSB first.
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }

    fn read_scratchpad(&mut self) -> Result<[u8; SCRATCHPAD_LEN], Ds18b20Error<P::Error>> {
        let mut data = [0u8; SCRATCHPAD_LEN];
        for b in &mut data {
            *b = self.read_byte()?;
        }
        Ok(data)
    }
}

impl<P, D> crate::TemperatureSensor for Ds18b20<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    type Error = Ds18b20Error<P::Error>;

    fn read_celsius(&mut self) -> Result<f32, Self::Error> {
        self.read_temperature()
    }
}

/// Dallas/Maxim CRC-8 (polynomial feedback `0x8C`, LSB first), as used for
/// the scratchpad checksum.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8c;
            }
            b >>= 1;
        }
    }
    crc
}

/// Scratchpad bytes 0/1 are the temperature as a little-endian `i16` in
/// units of 1/16 °C.
fn raw_to_celsius(lo: u8, hi: u8) -> f32 {
    i16::from_le_bytes([lo, hi]) as f32 / 16.0
}
