/// Behaviour of a simulated bus target, called once per byte.
pub trait I2CDevice {
    /// Checks if the received address is our address.
    /// Only 7 bit addressing is supported, the R/W bit is already stripped.
    fn check_address(&self, address: u8) -> bool;

    /// A byte written by the master. Returns whether to acknowledge it.
    fn write(&mut self, data: u8) -> bool;

    /// Next byte to send to the master.
    fn read(&mut self) -> u8;

    /// Start or repeated start addressed to this device.
    fn on_start(&mut self) {}

    fn on_stop(&mut self) {}
}

/// Register file with an auto-incrementing pointer, the way most small
/// sensors, clocks and EEPROMs behave.
///
/// The first byte of a write transaction selects the register; further bytes
/// are stored from there on. Reads continue at the current pointer.
pub struct RegisterDevice {
    address: u8,
    registers: Vec<u8>,
    current_register: usize,
    pointer_pending: bool,
    received: Vec<u8>,
}

impl RegisterDevice {
    pub fn new(address: u8, registers: Vec<u8>) -> Self {
        RegisterDevice {
            address,
            registers,
            current_register: 0,
            pointer_pending: false,
            received: Vec::new(),
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    pub fn current_register(&self) -> usize {
        self.current_register
    }

    /// Every byte the master wrote, pointer bytes included.
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    fn advance(&mut self) {
        self.current_register = (self.current_register + 1) % self.registers.len().max(1);
    }
}

impl I2CDevice for RegisterDevice {
    fn check_address(&self, address: u8) -> bool {
        self.address == address
    }

    fn write(&mut self, data: u8) -> bool {
        self.received.push(data);

        if self.pointer_pending {
            self.pointer_pending = false;
            if usize::from(data) >= self.registers.len() {
                warn!("Register {:#04x} not found", data);
                return false;
            }
            self.current_register = usize::from(data);
            return true;
        }

        match self.registers.get_mut(self.current_register) {
            Some(register) => {
                *register = data;
                self.advance();
                true
            }
            None => false,
        }
    }

    fn read(&mut self) -> u8 {
        let value = self
            .registers
            .get(self.current_register)
            .copied()
            .unwrap_or(0xFF);
        self.advance();
        value
    }

    fn on_start(&mut self) {
        self.pointer_pending = true;
    }

    fn on_stop(&mut self) {
        self.pointer_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_write_selects_register() {
        let mut device = RegisterDevice::new(0x68, vec![0; 4]);
        device.on_start();
        assert!(device.write(0x02));
        assert!(device.write(0xAA));
        assert!(device.write(0xBB));
        device.on_stop();

        assert_eq!(device.registers(), &[0, 0, 0xAA, 0xBB]);
        assert_eq!(device.current_register(), 0);
        assert_eq!(device.received(), &[0x02, 0xAA, 0xBB]);
    }

    #[test]
    fn writes_wrap_around() {
        let mut device = RegisterDevice::new(0x68, vec![0; 4]);
        device.on_start();
        assert!(device.write(0x02));
        assert!(device.write(0xAA));
        assert!(device.write(0xBB));
        assert!(device.write(0xCC));
        device.on_stop();

        assert_eq!(device.registers(), &[0xCC, 0, 0xAA, 0xBB]);
        assert_eq!(device.current_register(), 1);
    }

    #[test]
    fn rejects_unknown_register() {
        let mut device = RegisterDevice::new(0x68, vec![0; 4]);
        device.on_start();
        assert!(!device.write(0x10));
    }

    #[test]
    fn reads_wrap_around() {
        let mut device = RegisterDevice::new(0x68, vec![1, 2]);
        assert_eq!(device.read(), 1);
        assert_eq!(device.read(), 2);
        assert_eq!(device.read(), 1);
    }
}
