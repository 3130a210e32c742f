use std::hint;
use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

/// Below this a sleep would overshoot by far more than the wait itself.
const SPIN_THRESHOLD: Duration = Duration::from_millis(1);

/// Wall-clock delay for running on a host with real pins.
#[derive(Copy, Clone, Debug, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        let duration = Duration::from_nanos(u64::from(ns));
        if duration >= SPIN_THRESHOLD {
            thread::sleep(duration);
            return;
        }

        let started = Instant::now();
        while started.elapsed() < duration {
            hint::spin_loop();
        }
    }
}

/// Skips every wait. For the simulated bus, where timing is irrelevant.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
