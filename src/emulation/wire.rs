use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::pin::SimLine;
use super::register::I2CDevice;
use super::target::{Levels, Target};
use crate::bit_layer::{Direction, PinType};

/// How the simulated target answers the master releasing SCL.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stretch {
    None,
    /// Hold SCL low for this many master polls after every release.
    Polls(u32),
    /// Never let go of SCL again.
    Forever,
}

/// One clock pulse as seen on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pulse {
    /// SDA level while SCL was high.
    pub sda: bool,
    /// Direction of the master's SDA pin at the rising edge.
    pub data_direction: Direction,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Start,
    Stop,
    Clock(Pulse),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Event::Start => f.write_str("S"),
            Event::Stop => f.write_str("P"),
            Event::Clock(pulse) => f.write_str(if pulse.sda { "1" } else { "0" }),
        }
    }
}

fn index(pin: PinType) -> usize {
    match pin {
        PinType::Scl => 0,
        PinType::Sda => 1,
    }
}

/// Shared state of the two wires: master pins, target drivers and the
/// recorded trace.
pub struct BusState<T> {
    master_latch_low: [bool; 2],
    master_direction: [Direction; 2],
    target_scl_low: bool,
    target_sda_low: bool,
    stretch: Stretch,
    stretch_left: Option<u32>,
    stretches: usize,
    levels: Levels,
    pending: Option<Pulse>,
    events: Vec<Event>,
    target: Target<T>,
}

impl<T> BusState<T>
where
    T: I2CDevice,
{
    fn new(device: T) -> Self {
        BusState {
            master_latch_low: [false; 2],
            master_direction: [Direction::Input; 2],
            target_scl_low: false,
            target_sda_low: false,
            stretch: Stretch::None,
            stretch_left: None,
            stretches: 0,
            levels: Levels::IDLE,
            pending: None,
            events: Vec::new(),
            target: Target::new(device),
        }
    }

    fn master_drives_low(&self, pin: PinType) -> bool {
        let i = index(pin);
        self.master_direction[i] == Direction::Output && self.master_latch_low[i]
    }

    fn level(&self, pin: PinType) -> bool {
        let target_low = match pin {
            PinType::Scl => self.target_scl_low,
            PinType::Sda => self.target_sda_low,
        };
        !(self.master_drives_low(pin) || target_low)
    }

    pub fn set_latch(&mut self, pin: PinType, low: bool) {
        self.update(pin, |state| state.master_latch_low[index(pin)] = low);
    }

    pub fn set_direction(&mut self, pin: PinType, direction: Direction) {
        self.update(pin, |state| state.master_direction[index(pin)] = direction);
    }

    /// Samples a wire for the master. Polling a stretched SCL counts down
    /// the stretch.
    pub fn sample(&mut self, pin: PinType) -> bool {
        if pin == PinType::Scl && self.target_scl_low {
            match self.stretch_left {
                Some(0) => {
                    self.target_scl_low = false;
                    self.settle();
                }
                Some(left) => self.stretch_left = Some(left - 1),
                None => {}
            }
        }
        self.level(pin)
    }

    pub fn set_stretch(&mut self, stretch: Stretch) {
        self.stretch = stretch;
        if stretch == Stretch::None && self.target_scl_low {
            self.target_scl_low = false;
            self.settle();
        }
    }

    fn update<F>(&mut self, pin: PinType, change: F)
    where
        F: FnOnce(&mut Self),
    {
        let was_low = self.master_drives_low(pin);
        change(self);
        if pin == PinType::Scl && was_low && !self.master_drives_low(pin) {
            self.begin_stretch();
        }
        self.settle();
    }

    fn begin_stretch(&mut self) {
        self.stretch_left = match self.stretch {
            Stretch::None => return,
            Stretch::Polls(polls) => Some(polls),
            Stretch::Forever => None,
        };
        self.target_scl_low = true;
        self.stretches += 1;
    }

    /// Propagates a level change to the target until the wires are stable.
    fn settle(&mut self) {
        loop {
            let now = Levels {
                scl: self.level(PinType::Scl),
                sda: self.level(PinType::Sda),
            };
            let before = self.levels;
            if now == before {
                return;
            }

            self.levels = now;
            self.record(before, now);
            if let Some(low) = self.target.on_change(before, now) {
                self.target_sda_low = low;
            }
        }
    }

    fn record(&mut self, before: Levels, now: Levels) {
        if !before.scl && now.scl {
            self.pending = Some(Pulse {
                sda: now.sda,
                data_direction: self.master_direction[index(PinType::Sda)],
            });
        } else if before.scl && !now.scl {
            if let Some(pulse) = self.pending.take() {
                self.events.push(Event::Clock(pulse));
            }
        } else if before.scl && now.scl && before.sda != now.sda {
            // a condition, not a data bit
            self.pending = None;
            self.events.push(if now.sda { Event::Stop } else { Event::Start });
        }
    }
}

/// Simulated two-wire bus with one target device on it.
///
/// Both wires are wired-AND: low if the master or the target pulls them
/// low. Every start, stop and completed clock pulse is recorded. The bus is
/// single threaded (`Rc`), cloning it yields another handle to the same
/// wires.
pub struct SimBus<T> {
    state: Rc<RefCell<BusState<T>>>,
}

impl<T> Clone for SimBus<T> {
    fn clone(&self) -> Self {
        SimBus {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> SimBus<T>
where
    T: I2CDevice,
{
    pub fn new(device: T) -> Self {
        SimBus {
            state: Rc::new(RefCell::new(BusState::new(device))),
        }
    }

    /// The master's pins, `(scl, sda)`.
    pub fn lines(&self) -> (SimLine<T>, SimLine<T>) {
        (
            SimLine::new(Rc::clone(&self.state), PinType::Scl),
            SimLine::new(Rc::clone(&self.state), PinType::Sda),
        )
    }

    /// Applies from the next SCL release on. `Stretch::None` also lets go
    /// of a clock that is currently held.
    pub fn stretch_clock(&self, stretch: Stretch) {
        self.state.borrow_mut().set_stretch(stretch);
    }

    /// How many times the target has held SCL low.
    pub fn stretches(&self) -> usize {
        self.state.borrow().stretches
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    pub fn pulses(&self) -> Vec<Pulse> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|event| match *event {
                Event::Clock(pulse) => Some(pulse),
                _ => None,
            })
            .collect()
    }

    pub fn pulse_count(&self) -> usize {
        self.pulses().len()
    }

    /// Current `(scl, sda)` levels.
    pub fn levels(&self) -> (bool, bool) {
        let state = self.state.borrow();
        (state.levels.scl, state.levels.sda)
    }

    /// Both wires high.
    pub fn is_idle(&self) -> bool {
        self.levels() == (true, true)
    }

    pub fn master_direction(&self, pin: PinType) -> Direction {
        self.state.borrow().master_direction[index(pin)]
    }

    pub fn with_device<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        f(self.state.borrow_mut().target.device_mut())
    }

    /// Renders the trace as `S 10100000 A ... P`: conditions, data bits
    /// grouped per byte and the ninth bit as `A` or `N`.
    pub fn transcript(&self) -> String {
        let mut words: Vec<String> = Vec::new();
        let mut bits = String::new();
        let mut count = 0;

        for event in self.state.borrow().events.iter() {
            match *event {
                Event::Start | Event::Stop => {
                    if !bits.is_empty() {
                        words.push(bits.clone());
                        bits.clear();
                    }
                    count = 0;
                    words.push(event.to_string());
                }
                Event::Clock(pulse) if count == 8 => {
                    words.push(String::from(if pulse.sda { "N" } else { "A" }));
                    count = 0;
                }
                Event::Clock(_) => {
                    bits.push_str(&event.to_string());
                    count += 1;
                    if count == 8 {
                        words.push(bits.clone());
                        bits.clear();
                    }
                }
            }
        }
        if !bits.is_empty() {
            words.push(bits);
        }

        words.join(" ")
    }
}
