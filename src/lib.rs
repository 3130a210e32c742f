//! Polled software I2C master.
//!
//! Bytes are clocked through a software model of a USI shift register and
//! bit counter over two open-drain lines. The [`bit_layer`] owns the
//! protocol, [`gpio`] drives real Raspberry Pi pins and [`emulation`] is a
//! simulated bus with a cooperative target for tests.

#[macro_use]
extern crate log;
extern crate embedded_hal;
extern crate rppal;

pub mod bit_layer;
pub mod emulation;
pub mod gpio;

pub use bit_layer::{Ack, Config, Error, Line, Phase, StretchLimit, UsiMaster};
