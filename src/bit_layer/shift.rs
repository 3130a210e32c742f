/// Edges counted by the 4 bit counter before it wraps.
const COUNTER_SPAN: u8 = 16;

/// Software model of the USI data register and its 4 bit clock counter.
///
/// The counter advances on every clock edge, so a full pulse is two ticks.
/// Arming for `n` bits loads `16 - 2n`; after `n` pulses the counter wraps to
/// zero and the overflow flag reports the transfer complete.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShiftRegister {
    data: u8,
    latch: bool,
    counter: u8,
    overflow: bool,
}

impl Default for ShiftRegister {
    fn default() -> Self {
        Self::new()
    }
}

impl ShiftRegister {
    /// All ones: bit 7 high keeps DATA released.
    pub const IDLE: u8 = 0xFF;

    pub const fn new() -> Self {
        ShiftRegister {
            data: Self::IDLE,
            latch: true,
            counter: 0,
            overflow: false,
        }
    }

    /// Back to the idle pattern with a cleared counter and flag.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn load(&mut self, data: u8) {
        self.data = data;
    }

    pub fn data(&self) -> u8 {
        self.data
    }

    /// Level presented on DATA: bit 7 of the register.
    pub fn output(&self) -> bool {
        self.data & 0x80 != 0
    }

    /// Starts the counter so that it overflows after `bits` clock pulses.
    pub fn arm(&mut self, bits: u8) {
        debug_assert!((1..=8).contains(&bits), "cannot arm for {} bits", bits);
        self.counter = COUNTER_SPAN - 2 * bits;
        self.overflow = false;
    }

    pub fn counter(&self) -> u8 {
        self.counter
    }

    pub fn overflowed(&self) -> bool {
        self.overflow
    }

    /// SCL went high: latch the sampled DATA level.
    pub fn rising_edge(&mut self, level: bool) {
        self.latch = level;
        self.tick();
    }

    /// SCL went low: shift left, the latched sample enters at bit 0.
    pub fn falling_edge(&mut self) {
        self.data = (self.data << 1) | self.latch as u8;
        self.tick();
    }

    fn tick(&mut self) {
        self.counter = (self.counter + 1) % COUNTER_SPAN;
        if self.counter == 0 {
            self.overflow = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse(shift: &mut ShiftRegister, level: bool) {
        shift.rising_edge(level);
        shift.falling_edge();
    }

    #[test]
    fn arming_matches_hardware_preload() {
        let mut shift = ShiftRegister::new();
        shift.arm(8);
        assert_eq!(shift.counter(), 0x0);
        shift.arm(1);
        assert_eq!(shift.counter(), 0xE);
    }

    #[test]
    fn overflows_after_eight_pulses() {
        let mut shift = ShiftRegister::new();
        shift.load(0b1011_0010);
        shift.arm(8);

        for i in 0..8 {
            assert!(!shift.overflowed(), "overflow before pulse {}", i);
            let bit = shift.output();
            pulse(&mut shift, bit);
        }

        assert!(shift.overflowed());
        assert_eq!(shift.data(), 0b1011_0010);
    }

    #[test]
    fn single_bit_shifts_sample_into_lsb() {
        let mut shift = ShiftRegister::new();
        shift.arm(1);
        shift.rising_edge(false);
        assert!(!shift.overflowed());
        shift.falling_edge();

        assert!(shift.overflowed());
        assert_eq!(shift.data(), 0xFE);
    }

    #[test]
    fn shifts_in_sampled_levels_msb_first() {
        let mut shift = ShiftRegister::new();
        shift.arm(8);
        for &level in &[false, false, true, true, true, true, false, false] {
            pulse(&mut shift, level);
        }

        assert_eq!(shift.data(), 0x3C);
    }

    #[test]
    fn reset_restores_idle_pattern() {
        let mut shift = ShiftRegister::new();
        shift.load(0x12);
        shift.arm(3);
        shift.rising_edge(true);
        shift.reset();

        assert_eq!(shift, ShiftRegister::new());
        assert!(shift.output());
    }
}
