//! Simulated I2C bus for exercising the master without hardware.
//!
//! ```
//! use usi_i2c::bit_layer::{Config, NoDelay, UsiMaster};
//! use usi_i2c::emulation::{RegisterDevice, SimBus};
//!
//! let bus = SimBus::new(RegisterDevice::new(0x50, vec![0; 16]));
//! let (scl, sda) = bus.lines();
//! let mut master = UsiMaster::new(scl, sda, NoDelay, Config::default());
//!
//! master.init().unwrap();
//! master.start().unwrap();
//! assert!(master.write_byte(0xA0).unwrap().is_ack());
//! master.stop().unwrap();
//!
//! assert_eq!(bus.transcript(), "S 10100000 A P");
//! ```

mod pin;
mod register;
mod target;
mod wire;

pub use self::pin::SimLine;
pub use self::register::{I2CDevice, RegisterDevice};
pub use self::target::{Levels, Target};
pub use self::wire::{Event, Pulse, SimBus, Stretch};
