use std::fmt;
use std::hint;
use std::time::Instant;

use embedded_hal::delay::DelayNs;

use super::{Config, Direction, Error, Line, Operation, PinType, ShiftRegister, StretchLimit};
use super::{address_byte, RWBit};

/// Where the handle is in the start / transfer / stop sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// `init` has not run yet.
    Uninitialized,
    /// Both lines released, no transaction open.
    Idle,
    /// Between `start` and `stop`; the master owns the bus.
    Active,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Phase::Uninitialized => "uninitialized",
            Phase::Idle => "idle",
            Phase::Active => "active",
        })
    }
}

/// Answer of the receiver in the ninth clock pulse.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Ack {
    Ack,
    Nack,
}

impl Ack {
    /// A released (high) line is a NACK.
    pub fn from_level(high: bool) -> Self {
        if high {
            Ack::Nack
        } else {
            Ack::Ack
        }
    }

    pub fn is_ack(self) -> bool {
        self == Ack::Ack
    }
}

impl From<Ack> for u8 {
    fn from(ack: Ack) -> u8 {
        match ack {
            Ack::Ack => 0x00,
            Ack::Nack => 0xFF,
        }
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Ack::Ack => "ACK",
            Ack::Nack => "NACK",
        })
    }
}

/// Polled I2C master that shifts bytes through a USI-style shift register.
///
/// The handle owns both lines and every piece of bus state, so each
/// physical bus has exactly one `UsiMaster`. All operations block until the
/// bus sequence is complete. The type is not reentrant: sharing it between
/// threads or interleaved tasks needs external mutual exclusion.
pub struct UsiMaster<L, D> {
    scl: L,
    sda: L,
    delay: D,
    config: Config,
    shift: ShiftRegister,
    phase: Phase,
}

impl<L, D> UsiMaster<L, D>
where
    L: Line,
    D: DelayNs,
{
    /// Takes ownership of the lines. Nothing touches the pins until `init`.
    pub fn new(scl: L, sda: L, delay: D, config: Config) -> Self {
        UsiMaster {
            scl,
            sda,
            delay,
            config,
            shift: ShiftRegister::new(),
            phase: Phase::Uninitialized,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shift_register(&self) -> &ShiftRegister {
        &self.shift
    }

    /// Gives the lines and the delay back.
    pub fn free(self) -> (L, L, D) {
        (self.scl, self.sda, self.delay)
    }

    /// Puts both lines into the released output state and resets the shift
    /// engine. Safe to call again at any time, e.g. after a bus timeout.
    pub fn init(&mut self) -> Result<(), Error<L::Error>> {
        trace!("Initializing bus");

        self.shift.reset();
        // latches first so switching to output never pulls a line low
        self.scl.release().map_err(Error::Line)?;
        self.sda.release().map_err(Error::Line)?;
        self.scl
            .set_direction(Direction::Output)
            .map_err(Error::Line)?;
        self.sda
            .set_direction(Direction::Output)
            .map_err(Error::Line)?;

        self.phase = Phase::Idle;
        Ok(())
    }

    /// Issues a start condition. While a transaction is already open this is
    /// a repeated start.
    pub fn start(&mut self) -> Result<(), Error<L::Error>> {
        match self.phase {
            Phase::Uninitialized => return Err(self.refuse(Operation::Start)),
            Phase::Active => debug!("Repeated start"),
            Phase::Idle => debug!("Start"),
        }

        self.scl.release().map_err(Error::Line)?;
        self.wait_clock_high()?;
        self.half_period();
        self.sda.drive_low().map_err(Error::Line)?;
        self.half_period();
        self.scl.drive_low().map_err(Error::Line)?;
        self.sda.release().map_err(Error::Line)?;

        self.phase = Phase::Active;
        Ok(())
    }

    /// Shifts `byte` out MSB first and returns the receiver's answer. A NACK
    /// is reported, never acted on.
    pub fn write_byte(&mut self, byte: u8) -> Result<Ack, Error<L::Error>> {
        self.expect_active(Operation::WriteByte)?;
        trace!("Writing byte {:#04x}", byte);

        self.scl.drive_low().map_err(Error::Line)?;
        self.shift.load(byte);
        self.present()?;
        self.transfer(8)?;

        self.half_period();
        self.shift.load(ShiftRegister::IDLE);
        self.present()?;
        self.set_sda_direction(Direction::Input)?;
        self.transfer(1)?;

        let ack = Ack::from_level(self.shift.data() & 0x01 != 0);
        self.shift.load(ShiftRegister::IDLE);
        self.set_sda_direction(Direction::Output)?;
        self.present()?;

        trace!("Byte {:#04x} answered with {}", byte, ack);
        Ok(ack)
    }

    /// Shifts one byte in, then answers ACK, or NACK when `last` is set.
    pub fn read_byte(&mut self, last: bool) -> Result<u8, Error<L::Error>> {
        self.expect_active(Operation::ReadByte)?;

        self.scl.drive_low().map_err(Error::Line)?;
        self.shift.load(ShiftRegister::IDLE);
        self.present()?;
        self.set_sda_direction(Direction::Input)?;
        self.transfer(8)?;
        let byte = self.shift.data();

        self.shift.load(ShiftRegister::IDLE);
        self.set_sda_direction(Direction::Output)?;
        if !last {
            self.shift.load(0x00);
        }
        self.present()?;
        self.transfer(1)?;

        self.shift.load(ShiftRegister::IDLE);
        self.present()?;

        trace!(
            "Read byte {:#04x}, answered {}",
            byte,
            if last { Ack::Nack } else { Ack::Ack }
        );
        Ok(byte)
    }

    /// Issues a stop condition and leaves the bus idle.
    pub fn stop(&mut self) -> Result<(), Error<L::Error>> {
        self.expect_active(Operation::Stop)?;
        debug!("Stop");

        self.sda.drive_low().map_err(Error::Line)?;
        self.scl.release().map_err(Error::Line)?;
        self.wait_clock_high()?;
        self.half_period();
        self.sda.release().map_err(Error::Line)?;
        self.half_period();

        self.phase = Phase::Idle;
        Ok(())
    }

    /// Addresses `address` for writing and reports whether anyone answered.
    pub fn probe(&mut self, address: u8) -> Result<bool, Error<L::Error>> {
        if address > 0x7F {
            return Err(Error::InvalidAddress(address));
        }

        self.start()?;
        let ack = self.write_byte(address_byte(address, RWBit::Write))?;
        self.stop()?;

        Ok(ack.is_ack())
    }

    /// Clocks the armed number of bits. Every pulse: release SCL, wait for
    /// it to rise, sample, pull it low, shift. The counter overflow ends the
    /// loop, not an iteration count.
    fn transfer(&mut self, bits: u8) -> Result<(), Error<L::Error>> {
        self.shift.arm(bits);

        loop {
            self.half_period();
            self.scl.release().map_err(Error::Line)?;
            self.wait_clock_high()?;
            let level = self.sda.is_high().map_err(Error::Line)?;
            self.shift.rising_edge(level);

            self.half_period();
            self.scl.drive_low().map_err(Error::Line)?;
            self.shift.falling_edge();

            if self.shift.overflowed() {
                return Ok(());
            }
            self.present()?;
        }
    }

    /// Puts bit 7 of the shift register on the DATA latch.
    fn present(&mut self) -> Result<(), Error<L::Error>> {
        if self.shift.output() {
            self.sda.release().map_err(Error::Line)
        } else {
            self.sda.drive_low().map_err(Error::Line)
        }
    }

    fn set_sda_direction(&mut self, direction: Direction) -> Result<(), Error<L::Error>> {
        trace!("Setting {} to {:?}", PinType::Sda, direction);
        self.sda.set_direction(direction).map_err(Error::Line)
    }

    /// Spins until SCL reads high, honouring clock stretching within the
    /// configured bound.
    fn wait_clock_high(&mut self) -> Result<(), Error<L::Error>> {
        let started = Instant::now();
        let mut polls = 0u32;

        loop {
            if self.scl.is_high().map_err(Error::Line)? {
                if polls > 0 {
                    trace!("Clock stretched for {} polls", polls);
                }
                return Ok(());
            }
            polls = polls.saturating_add(1);

            let expired = match self.config.clock_stretch {
                StretchLimit::Unbounded => false,
                StretchLimit::Polls(max) => polls >= max,
                StretchLimit::Deadline(deadline) => started.elapsed() >= deadline,
            };
            if expired {
                warn!(
                    "{} still low after {} polls, giving up",
                    PinType::Scl,
                    polls
                );
                return Err(Error::BusTimeout {
                    line: PinType::Scl,
                    polls,
                });
            }

            hint::spin_loop();
        }
    }

    fn half_period(&mut self) {
        let ns = self.config.half_period_ns();
        self.delay.delay_ns(ns);
    }

    fn expect_active(&self, operation: Operation) -> Result<(), Error<L::Error>> {
        if self.phase == Phase::Active {
            Ok(())
        } else {
            Err(self.refuse(operation))
        }
    }

    fn refuse(&self, operation: Operation) -> Error<L::Error> {
        warn!("Refusing {} while bus is {}", operation, self.phase);
        Error::InvalidState {
            operation,
            phase: self.phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_as_byte() {
        assert_eq!(u8::from(Ack::Ack), 0x00);
        assert_eq!(u8::from(Ack::Nack), 0xFF);
        assert_eq!(Ack::from_level(false), Ack::Ack);
        assert_eq!(Ack::from_level(true), Ack::Nack);
    }
}
