use super::register::I2CDevice;
use crate::bit_layer::RWBit;

/// Wire levels, `true` is high.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Levels {
    pub scl: bool,
    pub sda: bool,
}

impl Levels {
    pub const IDLE: Levels = Levels {
        scl: true,
        sda: true,
    };
}

/// What the target does once the current byte has been acknowledged.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum After {
    // master writes; target reads
    Receive,
    // target writes; master reads
    Transmit,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum I2CState {
    Idle,
    Receive { bits: u8, value: u8, address: bool },
    SendAck { ack: bool, then: After },
    Transmit { bits: u8, value: u8 },
    ReceiveAck,
    // not addressed, or the transfer was ended with a NACK
    Ignore,
}

/// Bit level target state machine driven by wire edges.
///
/// `on_change` returns `Some(true)` when the target wants to hold SDA low,
/// `Some(false)` to release it and `None` to leave it as it is. SDA is only
/// ever changed while SCL is low.
pub struct Target<T> {
    device: T,
    state: I2CState,
    selected: bool,
    master_acked: bool,
}

impl<T> Target<T>
where
    T: I2CDevice,
{
    pub fn new(device: T) -> Self {
        Target {
            device,
            state: I2CState::Idle,
            selected: false,
            master_acked: false,
        }
    }

    pub fn device(&self) -> &T {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut T {
        &mut self.device
    }

    pub fn on_change(&mut self, before: Levels, now: Levels) -> Option<bool> {
        match (before.scl, now.scl) {
            (true, true) if before.sda && !now.sda => self.on_start(),
            (true, true) if !before.sda && now.sda => self.on_stop(),
            (false, true) => {
                self.on_rising(now.sda);
                None
            }
            (true, false) => self.on_falling(),
            _ => None,
        }
    }

    fn on_start(&mut self) -> Option<bool> {
        trace!("Target saw start");
        self.state = I2CState::Receive {
            bits: 0,
            value: 0,
            address: true,
        };
        Some(false)
    }

    fn on_stop(&mut self) -> Option<bool> {
        trace!("Target saw stop");
        if self.selected {
            self.device.on_stop();
            self.selected = false;
        }
        self.state = I2CState::Idle;
        Some(false)
    }

    fn on_rising(&mut self, sda: bool) {
        match self.state {
            I2CState::Receive {
                bits,
                value,
                address,
            } if bits < 8 => {
                self.state = I2CState::Receive {
                    bits: bits + 1,
                    value: (value << 1) | sda as u8,
                    address,
                };
            }
            I2CState::ReceiveAck => self.master_acked = !sda,
            _ => {}
        }
    }

    fn on_falling(&mut self) -> Option<bool> {
        match self.state {
            I2CState::Receive {
                bits: 8,
                value,
                address: true,
            } => self.on_address(value),
            I2CState::Receive {
                bits: 8,
                value,
                address: false,
            } => {
                let ack = self.device.write(value);
                trace!("Target received {:#04x}, ack: {}", value, ack);
                self.state = I2CState::SendAck {
                    ack,
                    then: After::Receive,
                };
                Some(ack)
            }
            I2CState::SendAck { ack: false, .. } => {
                self.state = I2CState::Ignore;
                Some(false)
            }
            I2CState::SendAck { then, .. } => match then {
                After::Receive => {
                    self.state = I2CState::Receive {
                        bits: 0,
                        value: 0,
                        address: false,
                    };
                    Some(false)
                }
                After::Transmit => self.load_next(),
            },
            I2CState::Transmit { bits, value } => {
                let bits = bits + 1;
                if bits == 8 {
                    self.state = I2CState::ReceiveAck;
                    Some(false)
                } else {
                    self.state = I2CState::Transmit { bits, value };
                    Some((value & (0x80 >> bits)) == 0)
                }
            }
            I2CState::ReceiveAck => {
                if self.master_acked {
                    self.load_next()
                } else {
                    trace!("Master ended the read");
                    self.state = I2CState::Ignore;
                    Some(false)
                }
            }
            _ => None,
        }
    }

    fn on_address(&mut self, value: u8) -> Option<bool> {
        let address = value >> 1;
        let rw = RWBit::from(value & 0x1);

        if !self.device.check_address(address) {
            trace!("Address {:#04x} did not match", address);
            self.state = I2CState::Ignore;
            return None;
        }

        trace!("Address {:#04x} matched, {}", address, rw);
        self.selected = true;
        self.device.on_start();
        self.state = I2CState::SendAck {
            ack: true,
            then: match rw {
                RWBit::Read => After::Transmit,
                RWBit::Write => After::Receive,
            },
        };
        Some(true)
    }

    fn load_next(&mut self) -> Option<bool> {
        let value = self.device.read();
        trace!("Target sending {:#04x}", value);
        self.state = I2CState::Transmit { bits: 0, value };
        Some((value & 0x80) == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::RegisterDevice;

    fn levels(scl: bool, sda: bool) -> Levels {
        Levels { scl, sda }
    }

    /// Drives one pulse with the given master SDA level, merged with the
    /// target's own drive. Returns the wire level seen at the rising edge.
    fn pulse(target: &mut Target<RegisterDevice>, master_sda: bool, target_low: &mut bool) -> bool {
        let sda = master_sda && !*target_low;
        target.on_change(levels(false, sda), levels(true, sda));
        if let Some(low) = target.on_change(levels(true, sda), levels(false, sda)) {
            *target_low = low;
        }
        sda
    }

    fn send_byte(target: &mut Target<RegisterDevice>, byte: u8, target_low: &mut bool) -> bool {
        for bit in (0..8).rev() {
            pulse(target, byte & (1 << bit) != 0, target_low);
        }
        // ninth pulse, master released
        !pulse(target, true, target_low)
    }

    fn start(target: &mut Target<RegisterDevice>) {
        target.on_change(levels(true, true), levels(true, false));
    }

    #[test]
    fn acknowledges_own_address_only() {
        let mut target = Target::new(RegisterDevice::new(0x50, vec![0; 4]));
        let mut low = false;

        start(&mut target);
        assert!(send_byte(&mut target, 0xA0, &mut low));

        let mut other = Target::new(RegisterDevice::new(0x51, vec![0; 4]));
        let mut low = false;
        start(&mut other);
        assert!(!send_byte(&mut other, 0xA0, &mut low));
    }

    #[test]
    fn stores_written_bytes() {
        let mut target = Target::new(RegisterDevice::new(0x50, vec![0; 4]));
        let mut low = false;

        start(&mut target);
        assert!(send_byte(&mut target, 0xA0, &mut low));
        assert!(send_byte(&mut target, 0x01, &mut low));
        assert!(send_byte(&mut target, 0x5A, &mut low));
        target.on_change(levels(true, false), levels(true, true));

        assert_eq!(target.device().registers(), &[0, 0x5A, 0, 0]);
    }
}
