use std::convert;
use std::fmt;

impl fmt::Display for RWBit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RWBit::Read => f.write_str("Read"),
            RWBit::Write => f.write_str("Write"),
        }
    }
}

/// Direction bit appended to a 7 bit address, seen from the master.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RWBit {
    Write = 0,
    Read = 1,
}

impl convert::From<u8> for RWBit {
    fn from(value: u8) -> Self {
        match value {
            0 => RWBit::Write,
            1 => RWBit::Read,
            _ => {
                error!("Unexpected value {:b} for rw bit, assuming 1", value);
                RWBit::Read
            }
        }
    }
}

/// First byte of a transfer: `address` shifted left with the rw bit below it.
pub fn address_byte(address: u8, rw: RWBit) -> u8 {
    (address << 1) | rw as u8
}

/// 0x00..=0x07 and 0x78..=0x7F are reserved by the bus specification.
pub fn is_reserved_7b(address: u8) -> bool {
    matches!(address, 0x00..=0x07 | 0x78..=0x7F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_address_bytes() {
        assert_eq!(address_byte(0x50, RWBit::Write), 0xA0);
        assert_eq!(address_byte(0x68, RWBit::Read), 0xD1);
        assert_eq!(address_byte(0x27, RWBit::Write), 0x4E);
    }

    #[test]
    fn decodes_rw_bit() {
        assert_eq!(RWBit::from(0xD1 & 1), RWBit::Read);
        assert_eq!(RWBit::from(0xA0 & 1), RWBit::Write);
        assert_eq!(RWBit::from(7), RWBit::Read);
    }

    #[test]
    fn reserved_ranges() {
        assert!(is_reserved_7b(0x00));
        assert!(is_reserved_7b(0x07));
        assert!(!is_reserved_7b(0x08));
        assert!(!is_reserved_7b(0x77));
        assert!(is_reserved_7b(0x78));
        assert!(is_reserved_7b(0x7F));
    }
}
