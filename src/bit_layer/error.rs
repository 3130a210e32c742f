use std::{error, fmt};

use embedded_hal::i2c::{self, ErrorKind, NoAcknowledgeSource};

use super::{Phase, PinType};

/// Bus primitive that was refused or failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Start,
    WriteByte,
    ReadByte,
    Stop,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Operation::Start => "start",
            Operation::WriteByte => "write byte",
            Operation::ReadByte => "read byte",
            Operation::Stop => "stop",
        })
    }
}

#[derive(Debug)]
pub enum Error<E> {
    /// The pin backend failed.
    Line(E),
    /// A target held the line low for longer than the configured bound.
    BusTimeout { line: PinType, polls: u32 },
    /// The call does not fit the current transaction phase.
    InvalidState { operation: Operation, phase: Phase },
    /// Address or data byte was not acknowledged.
    Nack(NoAcknowledgeSource),
    /// Only 7 bit addresses are supported.
    InvalidAddress(u8),
}

impl<E> Error<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(*self, Error::BusTimeout { .. })
    }
}

impl<E> fmt::Display for Error<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Line(ref e) => write!(f, "PinError: {}", e),
            Error::BusTimeout { line, polls } => {
                write!(f, "{} held low, gave up after {} polls", line, polls)
            }
            Error::InvalidState { operation, phase } => {
                write!(f, "cannot {} while bus is {}", operation, phase)
            }
            Error::Nack(source) => write!(f, "no acknowledge: {}", source),
            Error::InvalidAddress(address) => {
                write!(f, "address {:#04x} does not fit in 7 bits", address)
            }
        }
    }
}

impl<E> error::Error for Error<E>
where
    E: error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Line(ref e) => Some(e),
            _ => None,
        }
    }
}

impl<E> i2c::Error for Error<E>
where
    E: fmt::Debug,
{
    fn kind(&self) -> ErrorKind {
        match *self {
            Error::BusTimeout { .. } => ErrorKind::Bus,
            Error::Nack(source) => ErrorKind::NoAcknowledge(source),
            Error::Line(_) | Error::InvalidState { .. } | Error::InvalidAddress(_) => {
                ErrorKind::Other
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::Error as _;
    use std::convert::Infallible;

    #[test]
    fn maps_to_embedded_hal_kinds() {
        let timeout: Error<Infallible> = Error::BusTimeout {
            line: PinType::Scl,
            polls: 3,
        };
        assert_eq!(timeout.kind(), ErrorKind::Bus);
        assert!(timeout.is_timeout());

        let nack: Error<Infallible> = Error::Nack(NoAcknowledgeSource::Address);
        assert_eq!(
            nack.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
    }

    #[test]
    fn describes_misuse() {
        let error: Error<Infallible> = Error::InvalidState {
            operation: Operation::WriteByte,
            phase: Phase::Idle,
        };
        assert_eq!(error.to_string(), "cannot write byte while bus is idle");
    }
}
