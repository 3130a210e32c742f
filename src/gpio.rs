//! Raspberry Pi GPIO backend.

use std::convert;
use std::error;
use std::fmt;

use rppal::gpio::{self, Gpio, IoPin, Mode};

use crate::bit_layer::{Direction, Line};

#[derive(Debug)]
pub struct PinError {
    msg: String,
}

impl error::Error for PinError {}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.msg.fmt(f)
    }
}

impl convert::From<gpio::Error> for PinError {
    fn from(error: gpio::Error) -> Self {
        PinError {
            msg: error.to_string(),
        }
    }
}

/// A GPIO pin emulating an open-drain output.
///
/// Released means the pin is an input and the external pull-up holds the
/// wire high; driven means output low. The pin is never configured as an
/// output with a high level.
///
/// rppal's `IoPin` mode and level setters cannot fail, so the `Line` methods
/// always return `Ok`. `PinError` only comes from claiming the pins in
/// [`GpioLine::new`] and [`GpioLine::pair`].
pub struct GpioLine {
    pin: IoPin,
    direction: Direction,
    latch_low: bool,
}

impl GpioLine {
    pub fn new(gpio: &Gpio, pin_number: u8) -> Result<Self, PinError> {
        let pin = gpio.get(pin_number)?.into_io(Mode::Input);

        Ok(GpioLine {
            pin,
            direction: Direction::Input,
            latch_low: false,
        })
    }

    /// Opens the GPIO peripheral and claims both bus pins.
    pub fn pair(scl: u8, sda: u8) -> Result<(GpioLine, GpioLine), PinError> {
        let gpio = Gpio::new()?;
        Ok((GpioLine::new(&gpio, scl)?, GpioLine::new(&gpio, sda)?))
    }

    pub fn pin_number(&self) -> u8 {
        self.pin.pin()
    }

    fn apply(&mut self) {
        if self.direction == Direction::Output && self.latch_low {
            self.pin.set_low();
            self.pin.set_mode(Mode::Output);
        } else {
            self.pin.set_mode(Mode::Input);
        }
    }
}

impl Line for GpioLine {
    type Error = PinError;

    fn set_direction(&mut self, direction: Direction) -> Result<(), PinError> {
        self.direction = direction;
        self.apply();
        Ok(())
    }

    fn drive_low(&mut self) -> Result<(), PinError> {
        self.latch_low = true;
        self.apply();
        Ok(())
    }

    fn release(&mut self) -> Result<(), PinError> {
        self.latch_low = false;
        self.apply();
        Ok(())
    }

    fn is_high(&mut self) -> Result<bool, PinError> {
        Ok(self.pin.is_high())
    }
}
