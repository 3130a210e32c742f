mod bit_layer;
mod config;
mod delay;
mod error;
mod hal;
mod rw_bit;
mod shift;

use std::fmt;

pub use self::bit_layer::{Ack, Phase, UsiMaster};
pub use self::config::{Config, ConfigBuilder, StretchLimit};
pub use self::delay::{NoDelay, StdDelay};
pub use self::error::{Error, Operation};
pub use self::rw_bit::{address_byte, is_reserved_7b, RWBit};
pub use self::shift::ShiftRegister;

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            PinType::Sda => "sda",
            PinType::Scl => "scl",
        })
    }
}

/// The two wires of the bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PinType {
    Sda,
    Scl,
}

/// Direction of a bus line as seen from the master.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Output,
    Input,
}

/// One open-drain bus line.
///
/// A line has an output latch (`drive_low` / `release`) and a direction. The
/// latch only reaches the wire while the direction is `Output`; in `Input`
/// the pin floats and the external pull-up (or another device) decides the
/// level. No method ever drives the wire high.
pub trait Line {
    type Error: fmt::Debug;

    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error>;

    /// Latches a low level.
    fn drive_low(&mut self) -> Result<(), Self::Error>;

    /// Latches the released (high via pull-up) level.
    fn release(&mut self) -> Result<(), Self::Error>;

    /// Samples the level actually present on the wire.
    fn is_high(&mut self) -> Result<bool, Self::Error>;
}
