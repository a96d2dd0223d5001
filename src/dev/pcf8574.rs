//! Support for the `PCF8574` "Remote 8-bit I/O expander for I2C-bus with interrupt"
use crate::I2cExt;

/// `PCF8574` "Remote 8-bit I/O expander for I2C-bus with interrupt"
///
/// The chip has no register file: a one-byte write latches all eight
/// quasi-bidirectional pins, a one-byte read samples them.  Pins used as
/// inputs must be kept latched HIGH (the power-on state) so the external
/// signal can pull them low.
pub struct Pcf8574<M>(M);

impl<I2C> Pcf8574<core::cell::RefCell<Driver<I2C>>>
where
    I2C: crate::I2cBus,
{
    pub fn new(i2c: I2C, a0: bool, a1: bool, a2: bool) -> Self {
        Self::with_mutex(i2c, a0, a1, a2)
    }
}

impl<I2C, M> Pcf8574<M>
where
    I2C: crate::I2cBus,
    M: crate::PortMutex<Port = Driver<I2C>>,
{
    pub fn with_mutex(i2c: I2C, a0: bool, a1: bool, a2: bool) -> Self {
        Self(crate::PortMutex::create(Driver::new(i2c, a0, a1, a2)))
    }

    /// Split this device into its eight quasi-bidirectional pins.
    pub fn split(&mut self) -> Parts<'_, I2C, M> {
        Parts {
            p0: crate::Pin::new(0, &self.0),
            p1: crate::Pin::new(1, &self.0),
            p2: crate::Pin::new(2, &self.0),
            p3: crate::Pin::new(3, &self.0),
            p4: crate::Pin::new(4, &self.0),
            p5: crate::Pin::new(5, &self.0),
            p6: crate::Pin::new(6, &self.0),
            p7: crate::Pin::new(7, &self.0),
        }
    }

    /// Sample all eight pins in a single bus transaction.
    pub fn read_port(&self) -> Result<u8, I2C::BusError> {
        self.0.lock(|drv| drv.read_port())
    }

    /// Latch all eight pins from `value` in a single bus transaction.
    ///
    /// Bits of pins used as inputs must be 1 or the pin is actively driven
    /// low and the external signal can no longer be read.
    pub fn write_port(&self, value: u8) -> Result<(), I2C::BusError> {
        self.0.lock(|drv| drv.write_port(value))
    }
}

pub struct Parts<'a, I2C, M = core::cell::RefCell<Driver<I2C>>>
where
    I2C: crate::I2cBus,
    M: crate::PortMutex<Port = Driver<I2C>>,
{
    pub p0: crate::Pin<'a, crate::mode::QuasiBidirectional, M>,
    pub p1: crate::Pin<'a, crate::mode::QuasiBidirectional, M>,
    pub p2: crate::Pin<'a, crate::mode::QuasiBidirectional, M>,
    pub p3: crate::Pin<'a, crate::mode::QuasiBidirectional, M>,
    pub p4: crate::Pin<'a, crate::mode::QuasiBidirectional, M>,
    pub p5: crate::Pin<'a, crate::mode::QuasiBidirectional, M>,
    pub p6: crate::Pin<'a, crate::mode::QuasiBidirectional, M>,
    pub p7: crate::Pin<'a, crate::mode::QuasiBidirectional, M>,
}

/// Driver state is just the device identity; pin values live on the bus.
/// Masked operations are read-modify-write bus transactions, like the
/// original quasi-bidirectional port intends.
pub struct Driver<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C> Driver<I2C> {
    pub fn new(i2c: I2C, a0: bool, a1: bool, a2: bool) -> Self {
        let addr = 0x20 | ((a2 as u8) << 2) | ((a1 as u8) << 1) | (a0 as u8);
        Self { i2c, addr }
    }
}

impl<I2C: crate::I2cBus> Driver<I2C> {
    fn read_port(&mut self) -> Result<u8, I2C::BusError> {
        self.i2c.read_byte(self.addr)
    }

    fn write_port(&mut self, value: u8) -> Result<(), I2C::BusError> {
        self.i2c.write_byte(self.addr, value)
    }
}

impl<I2C: crate::I2cBus> crate::PortDriver for Driver<I2C> {
    type Error = I2C::BusError;

    fn set(&mut self, mask_high: u32, mask_low: u32) -> Result<(), Self::Error> {
        let current = self.i2c.read_byte(self.addr)?;
        let value = (current | mask_high as u8) & !mask_low as u8;
        self.i2c.write_byte(self.addr, value)
    }

    fn is_set(&mut self, mask_high: u32, mask_low: u32) -> Result<u32, Self::Error> {
        // Output pins read back their driven level.
        self.get(mask_high, mask_low)
    }

    fn get(&mut self, mask_high: u32, mask_low: u32) -> Result<u32, Self::Error> {
        let in_ = self.i2c.read_byte(self.addr)? as u32;
        Ok((in_ & mask_high) | (!in_ & mask_low))
    }

    fn toggle(&mut self, mask: u32) -> Result<(), Self::Error> {
        let current = self.i2c.read_byte(self.addr)?;
        self.i2c.write_byte(self.addr, current ^ mask as u8)
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    #[test]
    fn pcf8574_pins() {
        let expectations = [
            // set_high(p2): read-modify-write
            mock_i2c::Transaction::read(0x21, vec![0b11111111]),
            mock_i2c::Transaction::write(0x21, vec![0b11111111]),
            // set_low(p2)
            mock_i2c::Transaction::read(0x21, vec![0b11111111]),
            mock_i2c::Transaction::write(0x21, vec![0b11111011]),
            // toggle(p0)
            mock_i2c::Transaction::read(0x21, vec![0b11111011]),
            mock_i2c::Transaction::write(0x21, vec![0b11111010]),
            // is_high(p6) / is_low(p6)
            mock_i2c::Transaction::read(0x21, vec![0b01000000]),
            mock_i2c::Transaction::read(0x21, vec![0b10111111]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut pcf = super::Pcf8574::new(bus.clone(), true, false, false);
        let mut pcf_pins = pcf.split();

        pcf_pins.p2.set_high().unwrap();
        pcf_pins.p2.set_low().unwrap();
        pcf_pins.p0.toggle().unwrap();

        assert!(pcf_pins.p6.is_high().unwrap());
        assert!(pcf_pins.p6.is_low().unwrap());

        bus.done();
    }

    #[test]
    fn pcf8574_port_wide_access() {
        let expectations = [
            mock_i2c::Transaction::write(0x25, vec![0x5a]),
            mock_i2c::Transaction::read(0x25, vec![0x5a]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let pcf = super::Pcf8574::new(bus.clone(), true, false, true);
        pcf.write_port(0x5a).unwrap();
        assert_eq!(pcf.read_port().unwrap(), 0x5a);

        bus.done();
    }

    #[test]
    fn pcf8574_address_from_pin_straps() {
        let expectations = [
            mock_i2c::Transaction::write(0x20, vec![0xff]),
            mock_i2c::Transaction::write(0x27, vec![0xff]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        super::Pcf8574::new(bus.clone(), false, false, false)
            .write_port(0xff)
            .unwrap();
        super::Pcf8574::new(bus.clone(), true, true, true)
            .write_port(0xff)
            .unwrap();

        bus.done();
    }
}
