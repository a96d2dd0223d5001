use core::marker::PhantomData;
use embedded_hal::digital;

/// Representation of a port-expander pin.
///
/// `Pin` is not constructed directly, this type is created by instanciating a
/// port-expander and then getting access to all its pins using the `.split()`
/// method.
///
/// Every accessor goes through the expander's [`PortMutex`](crate::PortMutex),
/// so a set/clear is a read-modify-write against the shared driver state.
pub struct Pin<'a, MODE, MUTEX> {
    pin_mask: u32,
    port_driver: &'a MUTEX,
    _m: PhantomData<MODE>,
}

impl<'a, MODE, MUTEX, PD> Pin<'a, MODE, MUTEX>
where
    PD: crate::PortDriver,
    MUTEX: crate::PortMutex<Port = PD>,
{
    pub(crate) fn new(pin_number: u8, port_driver: &'a MUTEX) -> Self {
        assert!(pin_number < 32);
        Self {
            pin_mask: 1 << pin_number,
            port_driver,
            _m: PhantomData,
        }
    }
}

impl<MODE: crate::mode::HasInput, MUTEX, PD> Pin<'_, MODE, MUTEX>
where
    PD: crate::PortDriver,
    MUTEX: crate::PortMutex<Port = PD>,
{
    /// Read the physical level of this pin.
    pub fn is_high(&self) -> Result<bool, PD::Error> {
        self.port_driver
            .lock(|drv| Ok(drv.get(self.pin_mask, 0)? == self.pin_mask))
    }

    pub fn is_low(&self) -> Result<bool, PD::Error> {
        self.port_driver
            .lock(|drv| Ok(drv.get(0, self.pin_mask)? == self.pin_mask))
    }
}

impl<MODE: crate::mode::HasOutput, MUTEX, PD> Pin<'_, MODE, MUTEX>
where
    PD: crate::PortDriver,
    MUTEX: crate::PortMutex<Port = PD>,
{
    pub fn set_high(&mut self) -> Result<(), PD::Error> {
        self.port_driver.lock(|drv| drv.set(self.pin_mask, 0))
    }

    pub fn set_low(&mut self) -> Result<(), PD::Error> {
        self.port_driver.lock(|drv| drv.set(0, self.pin_mask))
    }

    /// Check whether the driver reports this pin as set HIGH.
    pub fn is_set_high(&self) -> Result<bool, PD::Error> {
        self.port_driver
            .lock(|drv| Ok(drv.is_set(self.pin_mask, 0)? == self.pin_mask))
    }

    pub fn is_set_low(&self) -> Result<bool, PD::Error> {
        self.port_driver
            .lock(|drv| Ok(drv.is_set(0, self.pin_mask)? == self.pin_mask))
    }

    pub fn toggle(&mut self) -> Result<(), PD::Error> {
        self.port_driver.lock(|drv| drv.toggle(self.pin_mask))
    }
}

/// Wrapper for driver errors, to satisfy the `embedded_hal::digital` error
/// contract on the trait implementations below.
#[derive(Debug)]
pub struct PinError<E>(E);

impl<E> PinError<E> {
    /// The underlying bus/driver error.
    pub fn into_inner(self) -> E {
        self.0
    }
}

impl<E: core::fmt::Debug> digital::Error for PinError<E> {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

impl<E> From<E> for PinError<E> {
    fn from(err: E) -> Self {
        Self(err)
    }
}

impl<MODE, MUTEX, PD> digital::ErrorType for Pin<'_, MODE, MUTEX>
where
    PD: crate::PortDriver,
    PD::Error: core::fmt::Debug,
    MUTEX: crate::PortMutex<Port = PD>,
{
    type Error = PinError<PD::Error>;
}

impl<MODE: crate::mode::HasInput, MUTEX, PD> digital::InputPin for Pin<'_, MODE, MUTEX>
where
    PD: crate::PortDriver,
    PD::Error: core::fmt::Debug,
    MUTEX: crate::PortMutex<Port = PD>,
{
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_high(self)?)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_low(self)?)
    }
}

impl<MODE: crate::mode::HasOutput, MUTEX, PD> digital::OutputPin for Pin<'_, MODE, MUTEX>
where
    PD: crate::PortDriver,
    PD::Error: core::fmt::Debug,
    MUTEX: crate::PortMutex<Port = PD>,
{
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(Pin::set_low(self)?)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(Pin::set_high(self)?)
    }
}

impl<MODE: crate::mode::HasOutput, MUTEX, PD> digital::StatefulOutputPin for Pin<'_, MODE, MUTEX>
where
    PD: crate::PortDriver,
    PD::Error: core::fmt::Debug,
    MUTEX: crate::PortMutex<Port = PD>,
{
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_set_high(self)?)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_set_low(self)?)
    }

    fn toggle(&mut self) -> Result<(), Self::Error> {
        Ok(Pin::toggle(self)?)
    }
}
