/// Blanket trait for I2C buses the drivers in this crate can run on.
pub trait I2cBus: embedded_hal::i2c::I2c {
    type BusError: From<Self::Error>;
}

impl<T> I2cBus for T
where
    T: embedded_hal::i2c::I2c,
{
    type BusError = T::Error;
}

/// Raw single-byte transfers.
///
/// The PCF8574 has no register file; a one-byte read returns the pin states
/// and a one-byte write latches the outputs.  These helpers are the entire
/// wire protocol.
pub(crate) trait I2cExt {
    type Error;

    fn write_byte(&mut self, addr: u8, value: u8) -> Result<(), Self::Error>;
    fn read_byte(&mut self, addr: u8) -> Result<u8, Self::Error>;
}

impl<I2C: I2cBus> I2cExt for I2C {
    type Error = I2C::BusError;

    fn write_byte(&mut self, addr: u8, value: u8) -> Result<(), Self::Error> {
        self.write(addr, &[value])?;
        Ok(())
    }

    fn read_byte(&mut self, addr: u8) -> Result<u8, Self::Error> {
        let mut buf = [0x00];
        self.read(addr, &mut buf)?;
        Ok(buf[0])
    }
}
