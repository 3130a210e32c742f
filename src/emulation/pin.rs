use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use super::register::I2CDevice;
use super::wire::BusState;
use crate::bit_layer::{Direction, Line, PinType};

/// Master side of one simulated wire.
pub struct SimLine<T> {
    bus: Rc<RefCell<BusState<T>>>,
    pin_type: PinType,
}

impl<T> SimLine<T> {
    pub(super) fn new(bus: Rc<RefCell<BusState<T>>>, pin_type: PinType) -> Self {
        SimLine { bus, pin_type }
    }

    pub fn pin_type(&self) -> PinType {
        self.pin_type
    }
}

impl<T> Line for SimLine<T>
where
    T: I2CDevice,
{
    type Error = Infallible;

    fn set_direction(&mut self, direction: Direction) -> Result<(), Infallible> {
        self.bus.borrow_mut().set_direction(self.pin_type, direction);
        Ok(())
    }

    fn drive_low(&mut self) -> Result<(), Infallible> {
        self.bus.borrow_mut().set_latch(self.pin_type, true);
        Ok(())
    }

    fn release(&mut self) -> Result<(), Infallible> {
        self.bus.borrow_mut().set_latch(self.pin_type, false);
        Ok(())
    }

    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.bus.borrow_mut().sample(self.pin_type))
    }
}
